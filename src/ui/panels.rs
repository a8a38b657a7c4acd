use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use bus_route_viewer::data::filter::{FilterStep, Gate, StepKind, StepOutcome};
use bus_route_viewer::data::model::CellValue;

use crate::state::AppState;

/// A selection change collected while drawing, applied once drawing is done.
enum Action {
    Value(String, Option<CellValue>),
    Range(String, f64, f64),
    Reset,
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel, one widget per step in chain order.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filter Options");
    ui.separator();

    let Some(filtered) = &state.filtered else {
        ui.label("No dataset loaded.");
        return;
    };

    let mut action: Option<Action> = None;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (step, outcome) in state.chain.steps().iter().zip(&filtered.steps) {
                if let Some(a) = step_widget(ui, step, outcome) {
                    action = Some(a);
                }
            }

            ui.add_space(8.0);
            if ui.button("Reset filters").clicked() {
                action = Some(Action::Reset);
            }
        });

    match action {
        Some(Action::Value(column, value)) => state.select_value(&column, value),
        Some(Action::Range(column, lo, hi)) => state.select_range(&column, lo, hi),
        Some(Action::Reset) => state.reset_filters(),
        None => {}
    }
}

fn step_widget(ui: &mut Ui, step: &FilterStep, outcome: &StepOutcome) -> Option<Action> {
    let column = step.column();
    let mut action = None;

    match (step.kind(), outcome) {
        (StepKind::Exact(selected), StepOutcome::Values(candidates)) => {
            let label = if matches!(step.gate(), Gate::Always) {
                format!("Filter by {column}")
            } else {
                format!("Filter by {column} (optional)")
            };
            ui.strong(label);

            let current = selected
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "All".to_string());

            egui::ComboBox::from_id_salt(column)
                .selected_text(current)
                .width(ui.available_width())
                .show_ui(ui, |ui: &mut Ui| {
                    if ui.selectable_label(selected.is_none(), "All").clicked() {
                        action = Some(Action::Value(column.to_string(), None));
                    }
                    for value in candidates {
                        let is_selected = selected.as_ref() == Some(value);
                        if ui.selectable_label(is_selected, value.to_string()).clicked() {
                            action = Some(Action::Value(column.to_string(), Some(value.clone())));
                        }
                    }
                });
            ui.add_space(4.0);
        }
        (StepKind::Range(selected), StepOutcome::Range { min, max }) => {
            ui.strong(format!("Filter by {column}"));

            let (mut lo, mut hi) = selected.unwrap_or((*min, *max));
            lo = lo.clamp(*min, *max);
            hi = hi.clamp(*min, *max);

            let lo_changed = ui
                .add(egui::Slider::new(&mut lo, *min..=*max).text("min"))
                .changed();
            let hi_changed = ui
                .add(egui::Slider::new(&mut hi, *min..=*max).text("max"))
                .changed();
            if lo_changed || hi_changed {
                action = Some(Action::Range(column.to_string(), lo, hi));
            }
            ui.add_space(4.0);
        }
        (StepKind::Range(_), StepOutcome::Fixed(value)) => {
            ui.label(format!("All records have the same {column}: {value}"));
            ui.add_space(4.0);
        }
        // Hidden steps and numeric columns without data are not drawn.
        _ => {}
    }

    action
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.filtered.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export filtered CSV…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} routes loaded, {} shown",
                ds.len(),
                state.visible_count()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open bus routes")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file_name = state
        .config
        .export_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("filtered_bus_routes.csv")
        .to_string();

    let file = rfd::FileDialog::new()
        .set_title("Export filtered rows")
        .set_file_name(file_name)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        state.export(&path);
    }
}
