use std::path::Path;
use std::sync::Arc;

use bus_route_viewer::config::ViewerConfig;
use bus_route_viewer::data::export::export_csv;
use bus_route_viewer::data::filter::{apply, FilterChain, Filtered};
use bus_route_viewer::data::loader::{DataSource, FileSource};
use bus_route_viewer::data::model::{CellValue, Dataset};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded table (None until a file is loaded). Shared read-only.
    pub dataset: Option<Arc<Dataset>>,

    /// Filter selections of this session.
    pub chain: FilterChain,

    /// Result of the last full re-apply of `chain`.
    pub filtered: Option<Filtered>,

    /// Start-up settings.
    pub config: ViewerConfig,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            dataset: None,
            chain: FilterChain::bus_routes(),
            filtered: None,
            config,
            status_message: None,
        }
    }

    /// Load a table through `source`, replacing the current one.
    pub fn load(&mut self, source: &dyn DataSource) {
        match source.load() {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Failed to load data: {e}");
                self.status_message = Some(format!("No data found: {e}"));
            }
        }
    }

    pub fn load_path(&mut self, path: &Path) {
        self.load(&FileSource::new(path));
    }

    /// Ingest a newly loaded dataset and reset filters.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.dataset = Some(Arc::new(dataset));
        self.chain = FilterChain::bus_routes();
        self.status_message = None;
        self.refilter();
    }

    /// Re-apply the whole chain after any selection change. Selections an
    /// upstream change made stale are cleared or clipped first, so what the
    /// panels show is what was applied.
    pub fn refilter(&mut self) {
        let Some(ds) = self.dataset.clone() else {
            return;
        };
        loop {
            match apply(&ds, &self.chain) {
                Ok(filtered) => {
                    let changed = self.chain.clear_stale(&filtered.steps);
                    if changed.is_empty() {
                        self.filtered = Some(filtered);
                        return;
                    }
                    log::debug!("Adjusted stale selections: {}", changed.join(", "));
                }
                Err(e) => {
                    log::error!("Filtering failed: {e}");
                    self.filtered = None;
                    self.status_message = Some(format!("Error: {e}"));
                    return;
                }
            }
        }
    }

    pub fn select_value(&mut self, column: &str, value: Option<CellValue>) {
        match value {
            Some(v) => {
                self.chain.select_value(column, v);
            }
            None => self.chain.clear(column),
        }
        self.refilter();
    }

    pub fn select_range(&mut self, column: &str, lo: f64, hi: f64) {
        self.chain.select_range(column, lo, hi);
        self.refilter();
    }

    pub fn reset_filters(&mut self) {
        self.chain.clear_all();
        self.refilter();
    }

    /// Number of rows currently shown.
    pub fn visible_count(&self) -> usize {
        self.filtered.as_ref().map_or(0, Filtered::len)
    }

    /// Write the currently shown rows to `path`.
    pub fn export(&mut self, path: &Path) {
        let (Some(ds), Some(filtered)) = (&self.dataset, &self.filtered) else {
            return;
        };
        match export_csv(ds, &filtered.indices, path) {
            Ok(()) => {
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Export failed: {e:#}");
                self.status_message = Some(format!("Export failed: {e:#}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bus_route_viewer::data::filter::{StepKind, StepOutcome};

    use super::*;

    fn bus(state: &str, bustype: &str, price: f64) -> Vec<(&'static str, CellValue)> {
        vec![
            ("state", CellValue::from(state)),
            ("route_name", CellValue::from("Kochi to Bangalore")),
            ("route_url", CellValue::from("https://www.redbus.in/")),
            ("busname", CellValue::from("Swift")),
            ("bustype", CellValue::from(bustype)),
            ("departing_time", CellValue::from("21:00")),
            ("departure_location", CellValue::from("Kochi")),
            ("reaching_time", CellValue::from("06:00")),
            ("arrival_location", CellValue::from("Bangalore")),
            ("star_rating", CellValue::Float(4.0)),
            ("price", CellValue::Float(price)),
            ("seats_available", CellValue::Integer(20)),
        ]
    }

    fn loaded() -> AppState {
        let mut state = AppState::new(ViewerConfig::default());
        state.set_dataset(Dataset::from_records(vec![
            bus("APSRTC", "AC Sleeper", 320.0),
            bus("APSRTC", "AC Sleeper", 650.0),
            bus("APSRTC", "Non-AC Seater", 540.0),
            bus("KERALA RTC", "Non-AC Seater", 780.0),
            bus("KERALA RTC", "Non-AC Seater", 1200.0),
        ]));
        state
    }

    fn step_kind<'a>(state: &'a AppState, column: &str) -> &'a StepKind {
        state
            .chain
            .steps()
            .iter()
            .find(|s| s.column() == column)
            .map(|s| s.kind())
            .unwrap()
    }

    #[test]
    fn price_outside_the_new_state_is_cleared() {
        let mut state = loaded();
        state.select_range("price", 500.0, 700.0);
        assert_eq!(state.visible_count(), 2);

        state.select_value("state", Some(CellValue::from("KERALA RTC")));
        assert_eq!(step_kind(&state, "price"), &StepKind::Range(None));
        assert_eq!(state.visible_count(), 2);
        let filtered = state.filtered.as_ref().unwrap();
        assert_eq!(filtered.indices, vec![3, 4]);
        assert_eq!(filtered.steps[9], StepOutcome::Range { min: 780.0, max: 1200.0 });
    }

    #[test]
    fn price_overlapping_the_new_state_is_clipped() {
        let mut state = loaded();
        state.select_range("price", 500.0, 900.0);
        assert_eq!(state.visible_count(), 3);

        state.select_value("state", Some(CellValue::from("APSRTC")));
        assert_eq!(step_kind(&state, "price"), &StepKind::Range(Some((500.0, 650.0))));
        assert_eq!(state.filtered.as_ref().unwrap().indices, vec![1, 2]);
    }

    #[test]
    fn bustype_missing_from_the_new_state_is_cleared() {
        let mut state = loaded();
        state.select_value("bustype", Some(CellValue::from("AC Sleeper")));
        assert_eq!(state.visible_count(), 2);

        state.select_value("state", Some(CellValue::from("KERALA RTC")));
        assert_eq!(step_kind(&state, "bustype"), &StepKind::Exact(None));
        assert_eq!(state.filtered.as_ref().unwrap().indices, vec![3, 4]);
    }
}
