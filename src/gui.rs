// src/gui.rs
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use ndarray::Array1;
use crate::config::SessionConfig;
use crate::drivers::{
    CancelToken, Comparison, MonitorMode, MonitorSettings, SpectrumLabel, SpectrumSummary,
    TIMESTAMP_FORMAT,
};
use crate::engine;
use crate::types::*;
#[derive(PartialEq, Clone, Copy, Debug)]
enum PlotView {
    Counts,
    Absorbance,
    Monitor,
}
type Points = Vec<[f64; 2]>;
fn to_points(wavelengths: &Array1<f64>, values: &Array1<f64>) -> Points {
    wavelengths
        .iter()
        .zip(values.iter())
        .filter(|(_, y)| y.is_finite())
        .map(|(x, y)| [*x, *y])
        .collect()
}
pub struct MicrospecApp {
    // 系统状态
    is_connected: bool,
    is_monitoring: bool,
    connection_mode: ConnectionMode,
    sample_inserted: bool,
    // acquisition form
    integration_time_us: f64,
    scans: usize,
    label: SpectrumLabel,
    comments: String,
    store: bool,
    save: bool,
    // monitor form
    monitor_mode: MonitorMode,
    compare_reference: bool,
    compare_index: isize,
    update_interval_secs: f64,
    monitor_save: bool,
    // files
    load_path: String,
    experiment_dir: String,
    // curves
    dark: Option<Points>,
    reference: Option<Points>,
    current: Option<Points>,
    absorbance: Option<Points>,
    live: Option<(Points, Points, MonitorMode, usize)>,
    view: PlotView,
    history: Vec<SpectrumSummary>,
    log_messages: Vec<String>,
    // 通讯管道
    rx: Receiver<SpectroMessage>,
    tx_cmd: Sender<GuiCommand>,
    cancel: CancelToken,
}
impl MicrospecApp {
    pub fn new(config: SessionConfig) -> Self {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let cancel = CancelToken::new();
        let form = config.clone();
        engine::spawn_thread(config, tx, rx_cmd, cancel.clone());
        Self {
            is_connected: false,
            is_monitoring: false,
            connection_mode: ConnectionMode::Simulation,
            sample_inserted: false,
            integration_time_us: form.integration_time_us,
            scans: form.scans,
            label: SpectrumLabel::Current,
            comments: String::new(),
            store: true,
            save: false,
            monitor_mode: MonitorMode::Absorbance,
            compare_reference: false,
            compare_index: -1,
            update_interval_secs: form.update_interval_secs,
            monitor_save: false,
            load_path: String::new(),
            experiment_dir: String::new(),
            dark: None,
            reference: None,
            current: None,
            absorbance: None,
            live: None,
            view: PlotView::Counts,
            history: Vec::new(),
            log_messages: vec!["Microspectrometer ready.".to_owned()],
            rx,
            tx_cmd,
            cancel,
        }
    }
    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 200 {
            self.log_messages.remove(0);
        }
    }
    fn send(&mut self, cmd: GuiCommand) {
        if self.tx_cmd.send(cmd).is_err() {
            self.log("acquisition engine has stopped");
        }
    }
    fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                SpectroMessage::Log(s) => self.log(&s),
                SpectroMessage::Status(b) => self.is_connected = b,
                SpectroMessage::Monitoring(b) => {
                    self.is_monitoring = b;
                    if b {
                        self.view = PlotView::Monitor;
                    }
                }
                SpectroMessage::Curve {
                    label,
                    wavelengths,
                    values,
                } => {
                    let points = Some(to_points(&wavelengths, &values));
                    match label {
                        SpectrumLabel::Dark => self.dark = points,
                        SpectrumLabel::Reference => self.reference = points,
                        SpectrumLabel::Current => self.current = points,
                    }
                }
                SpectroMessage::Absorbance {
                    wavelengths,
                    values,
                } => self.absorbance = Some(to_points(&wavelengths, &values)),
                SpectroMessage::Frame(frame) => {
                    self.live = Some((
                        to_points(&frame.wavelengths, &frame.live),
                        to_points(&frame.wavelengths, &frame.comparison),
                        frame.mode,
                        frame.iteration,
                    ));
                }
                SpectroMessage::History(h) => self.history = h,
            }
        }
    }
    fn acquisition_panel(&mut self, ui: &mut egui::Ui) {
        ui.label("ACQUISITION");
        ui.horizontal(|ui| {
            ui.label("Integration (us)");
            ui.add(
                egui::DragValue::new(&mut self.integration_time_us)
                    .speed(100.0)
                    .clamp_range(1.0..=6.0e7),
            );
            if ui.button("Apply").clicked() {
                let us = self.integration_time_us;
                self.send(GuiCommand::SetIntegrationTime(us));
            }
        });
        ui.horizontal(|ui| {
            ui.label("Scans");
            ui.add(egui::DragValue::new(&mut self.scans).clamp_range(1..=1000));
            egui::ComboBox::from_id_source("label")
                .selected_text(self.label.as_str())
                .show_ui(ui, |ui| {
                    for label in SpectrumLabel::ALL {
                        ui.selectable_value(&mut self.label, label, label.as_str());
                    }
                });
        });
        ui.horizontal(|ui| {
            ui.label("Comment");
            ui.text_edit_singleline(&mut self.comments);
        });
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.store, "Keep in history");
            ui.checkbox(&mut self.save, "Save to disk");
        });
        if ui
            .add_enabled(self.is_connected && !self.is_monitoring, egui::Button::new("MEASURE"))
            .clicked()
        {
            let req = MeasureRequest {
                label: self.label,
                scans: self.scans,
                store: self.store,
                save: self.save,
                comments: self.comments.clone(),
            };
            self.send(GuiCommand::Measure(req));
        }
        if self.connection_mode == ConnectionMode::Simulation && self.is_connected {
            if ui.checkbox(&mut self.sample_inserted, "Sample in beam").changed() {
                let inserted = self.sample_inserted;
                self.send(GuiCommand::InsertSample(inserted));
            }
        }
    }
    fn monitor_panel(&mut self, ui: &mut egui::Ui) {
        ui.label("CONTINUOUS MONITOR");
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.monitor_mode, MonitorMode::Absorbance, "Absorbance");
            ui.selectable_value(&mut self.monitor_mode, MonitorMode::Transmission, "Counts");
        });
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.compare_reference, "Compare to reference");
            ui.add_enabled(
                !self.compare_reference,
                egui::DragValue::new(&mut self.compare_index).prefix("scan "),
            );
        });
        ui.horizontal(|ui| {
            ui.label("Every (s)");
            ui.add(
                egui::DragValue::new(&mut self.update_interval_secs)
                    .speed(0.05)
                    .clamp_range(0.0..=60.0),
            );
            ui.checkbox(&mut self.monitor_save, "Save each");
        });
        let btn_txt = if self.is_monitoring { "⏹ STOP" } else { "▶ START" };
        if ui
            .add_enabled(self.is_connected, egui::Button::new(btn_txt))
            .clicked()
        {
            if self.is_monitoring {
                self.cancel.cancel();
            } else {
                let settings = MonitorSettings {
                    mode: self.monitor_mode,
                    comparison: if self.compare_reference {
                        Comparison::Reference
                    } else {
                        Comparison::History(self.compare_index)
                    },
                    update_interval: std::time::Duration::from_secs_f64(
                        self.update_interval_secs.max(0.0),
                    ),
                    scans: self.scans,
                    save: self.monitor_save,
                };
                self.send(GuiCommand::StartMonitor(settings));
            }
        }
    }
    fn files_panel(&mut self, ui: &mut egui::Ui) {
        ui.label("FILES");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.experiment_dir);
            if ui.button("New experiment").clicked() {
                let dir = Some(self.experiment_dir.trim().to_string()).filter(|d| !d.is_empty());
                self.send(GuiCommand::StartExperiment(dir));
            }
        });
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.load_path);
            let path = PathBuf::from(self.load_path.trim());
            if ui.button("Load dark").clicked() {
                self.send(GuiCommand::LoadBaseline(SpectrumLabel::Dark, path.clone()));
            }
            if ui.button("Load ref").clicked() {
                self.send(GuiCommand::LoadBaseline(SpectrumLabel::Reference, path));
            }
        });
        let idle = !self.is_monitoring;
        ui.horizontal(|ui| {
            if ui.add_enabled(idle, egui::Button::new("Save all")).clicked() {
                self.send(GuiCommand::SaveAll);
            }
            if ui.add_enabled(idle, egui::Button::new("Save absorbance")).clicked() {
                let comments = self.comments.clone();
                self.send(GuiCommand::SaveAbsorbance(comments));
            }
            if ui.add_enabled(idle, egui::Button::new("PNG")).clicked() {
                self.send(GuiCommand::SaveAbsorbancePlot);
            }
        });
    }
    fn history_panel(&mut self, ui: &mut egui::Ui) {
        ui.label("HISTORY");
        let mut chosen: Option<(SpectrumLabel, isize)> = None;
        egui::ScrollArea::vertical().max_height(180.0).id_source("history").show(ui, |ui| {
            egui::Grid::new("history_grid").striped(true).show(ui, |ui| {
                ui.label("Scan");
                ui.label("Time");
                ui.label("Type");
                ui.label("Comment");
                ui.label("");
                ui.end_row();
                for s in &self.history {
                    ui.label(s.scan_number.to_string());
                    ui.label(s.measured_at.format(TIMESTAMP_FORMAT).to_string());
                    ui.label(s.label.as_str());
                    ui.label(s.comments.as_str());
                    ui.horizontal(|ui| {
                        if ui.small_button("→ dark").clicked() {
                            chosen = Some((SpectrumLabel::Dark, s.scan_number as isize));
                        }
                        if ui.small_button("→ ref").clicked() {
                            chosen = Some((SpectrumLabel::Reference, s.scan_number as isize));
                        }
                    });
                    ui.end_row();
                }
            });
        });
        if let Some((label, index)) = chosen {
            self.send(GuiCommand::SetBaselineFromHistory(label, index));
        }
    }
    fn plot(&self, ui: &mut egui::Ui) {
        let y_label = match self.view {
            PlotView::Counts => "Counts",
            PlotView::Absorbance => "Absorbance",
            PlotView::Monitor => match self.live.as_ref().map(|l| l.2) {
                Some(MonitorMode::Transmission) => "Counts",
                _ => "Absorbance",
            },
        };
        Plot::new("spectrum_plot")
            .legend(Legend::default())
            .x_axis_label("Wavelength (nm)")
            .y_axis_label(y_label)
            .show(ui, |plot_ui| {
                let mut line = |points: &Option<Points>, name: &str, col: Color32| {
                    if let Some(points) = points {
                        plot_ui.line(Line::new(PlotPoints::new(points.clone())).name(name).color(col));
                    }
                };
                match self.view {
                    PlotView::Counts => {
                        line(&self.dark, "Dark", Color32::GRAY);
                        line(&self.reference, "Reference", Color32::from_rgb(0, 255, 255));
                        line(&self.current, "Current", Color32::YELLOW);
                    }
                    PlotView::Absorbance => {
                        line(&self.absorbance, "Absorbance", Color32::from_rgb(255, 0, 255));
                    }
                    PlotView::Monitor => {
                        if let Some((live, start, _, _)) = &self.live {
                            line(&Some(live.clone()), "Current Spectrum", Color32::RED);
                            line(&Some(start.clone()), "Starting Spectrum", Color32::WHITE);
                        }
                    }
                }
            });
    }
}
impl eframe::App for MicrospecApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_messages();
        if self.is_monitoring {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(200));
        }
        egui::SidePanel::left("L").min_width(340.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("UV-Vis Microspectrometer");
            ui.separator();
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.connection_mode, ConnectionMode::Simulation, "SIM");
                ui.selectable_value(&mut self.connection_mode, ConnectionMode::Hardware, "REAL");
            });
            let btn_txt = if self.is_connected { "DISCONNECT" } else { "CONNECT" };
            if ui
                .add_enabled(!self.is_monitoring, egui::Button::new(btn_txt))
                .clicked()
            {
                if self.is_connected {
                    self.send(GuiCommand::Disconnect);
                } else {
                    let mode = self.connection_mode;
                    self.send(GuiCommand::Connect(mode));
                }
            }
            ui.separator();
            self.acquisition_panel(ui);
            ui.separator();
            self.monitor_panel(ui);
            ui.separator();
            self.files_panel(ui);
            ui.separator();
            egui::ScrollArea::vertical()
                .id_source("log")
                .max_height(120.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for m in &self.log_messages {
                        ui.monospace(m);
                    }
                });
        });
        egui::TopBottomPanel::bottom("history_panel").show(ctx, |ui| {
            self.history_panel(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.view, PlotView::Counts, "Baselines");
                ui.selectable_value(&mut self.view, PlotView::Absorbance, "Absorbance");
                ui.selectable_value(&mut self.view, PlotView::Monitor, "Monitor");
                if let Some((_, _, _, iteration)) = &self.live {
                    ui.label(format!("frame {iteration}"));
                }
                if !self.is_connected {
                    ui.label("Connect first.");
                }
            });
            self.plot(ui);
        });
    }
}
