use eframe::egui::{Align, Layout, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Route table (central panel)
// ---------------------------------------------------------------------------

/// Render the filtered rows in the central panel.
pub fn routes_table(ui: &mut Ui, state: &AppState) {
    let (Some(dataset), Some(filtered)) = (&state.dataset, &state.filtered) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a bus routes file to start  (File → Open…)");
        });
        return;
    };

    ui.heading("Filtered Bus Routes");

    if filtered.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("No matching rows.");
        });
        return;
    }

    let columns = dataset.columns();

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .cell_layout(Layout::left_to_right(Align::Center))
        .columns(Column::auto().at_least(60.0).clip(true), columns.len())
        .min_scrolled_height(0.0)
        .header(22.0, |mut header| {
            for name in columns {
                header.col(|ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(20.0, filtered.len(), |mut row| {
                let source_row = filtered.indices[row.index()];
                for name in columns {
                    row.col(|ui| {
                        ui.label(dataset.value(source_row, name).to_string());
                    });
                }
            });
        });
}
