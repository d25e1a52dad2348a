// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
use anyhow::Context;
use eframe::egui;
use microspec::gui::MicrospecApp;
use microspec::SessionConfig;
// 入口函数
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = match std::env::args_os().nth(1) {
        Some(path) => SessionConfig::load(path.as_ref())
            .with_context(|| format!("reading settings from {}", path.to_string_lossy()))?,
        None => SessionConfig::load_or_default().context("reading microspec.json")?,
    };
    log::info!("starting with {config:?}");
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1400.0, 900.0])
        .with_min_inner_size([1100.0, 700.0])
        .with_title("UV-Vis Microspectrometer");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "microspec",
        options,
        Box::new(|_cc| Box::new(MicrospecApp::new(config))),
    )
    .map_err(|e| anyhow::anyhow!("GUI failed: {e}"))
}
