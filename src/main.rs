mod app;
mod backend;
mod config;
mod error;
mod event;
mod input;
mod session;
mod state;
mod status;
mod stream;
mod theme;
mod transcript;
mod upload;

use app::ParlorApp;
use backend::BackendClient;
use clap::Parser;
use config::Config;
use eframe::egui;
use std::sync::mpsc;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing();
    tracing::info!(base_url = %config.base_url, mode = ?config.mode, "starting parlor");

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("parlor-runtime")
        .build()?;

    let mode = config.mode;
    let backend = runtime.block_on(async { BackendClient::new(config, tx) })?;
    let app = ParlorApp::new(rx, backend, mode);
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([720.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Parlor",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )?;

    Ok(())
}
