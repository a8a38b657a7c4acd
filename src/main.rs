mod app;
mod state;
mod ui;

use app::BusRouteApp;
use bus_route_viewer::config::ViewerConfig;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = ViewerConfig::from_env();
    log::debug!("Starting with {config:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    let mut state = AppState::new(config);
    if let Some(path) = state.config.data_path.clone() {
        state.load_path(&path);
    }

    eframe::run_native(
        "Bus Routes Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(BusRouteApp::new(state)))),
    )
}
