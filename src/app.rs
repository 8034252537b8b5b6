use crate::event::AppEvent;
use crate::generator::GeneratorClient;
use crate::session::builder::GenerationOutcome;
use crate::session::store::{self, SessionSummary};
use crate::theme::{StatusTone, Theme};
use crate::ui::form::GenerateForm;
use crate::ui::preview_panel::PreviewPanel;
use crate::ui::USAGE_GUIDE;
use chrono::Local;
use eframe::egui::{self, RichText, ScrollArea};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Generate,
    Preview,
}

pub struct MultiTalkApp {
    rx: Receiver<AppEvent>,
    client: GeneratorClient,
    theme: Theme,
    tab: Tab,
    form: GenerateForm,
    preview: PreviewPanel,
    sessions: Vec<SessionSummary>,
    status: String,
    status_tone: StatusTone,
    output_video: Option<PathBuf>,
    is_running: bool,
    diagnostics_log: Vec<String>,
}

impl MultiTalkApp {
    pub fn new(rx: Receiver<AppEvent>, client: GeneratorClient, theme: Theme) -> Self {
        let mut app = Self {
            rx,
            client,
            theme,
            tab: Tab::Generate,
            form: GenerateForm::default(),
            preview: PreviewPanel::default(),
            sessions: Vec::new(),
            status: String::new(),
            status_tone: StatusTone::Idle,
            output_video: None,
            is_running: false,
            diagnostics_log: Vec::new(),
        };
        app.refresh_sessions();
        app
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log.push(format!(
            "[{}] {}",
            Local::now().format("%H:%M:%S"),
            message.into()
        ));
    }

    fn refresh_sessions(&mut self) {
        let (sessions, warnings) =
            store::load_recent(self.client.data_root(), self.client.output_extensions());
        self.sessions = sessions;
        for warning in warnings {
            warn!("session load warning: {warning}");
            self.log_diagnostic(format!("session load warning: {warning}"));
        }
    }

    fn submit(&mut self) {
        let request = self.form.to_request();
        if !self.client.submit(request) {
            self.log_diagnostic("a generation is already running");
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::GenerationStarted => {
                self.is_running = true;
                self.output_video = None;
                self.status = "Generating video, this can take a while...".to_string();
                self.status_tone = StatusTone::Running;
                self.log_diagnostic("generation started");
            }
            AppEvent::GenerationFinished(outcome) => {
                self.is_running = false;
                self.show_outcome(outcome);
                self.refresh_sessions();
            }
        }
    }

    fn show_outcome(&mut self, outcome: GenerationOutcome) {
        match outcome {
            Ok(success) => {
                self.status = success.message();
                self.status_tone = StatusTone::Success;
                self.log_diagnostic(format!("session {} finished", success.session_id));
                self.output_video = Some(success.video_path);
            }
            Err(err) => {
                self.status = format!("Error: {err}");
                self.status_tone = StatusTone::Error;
                let kind = if err.is_input_error() { "input" } else { "generation" };
                self.log_diagnostic(format!("{kind} error: {err}"));
                self.output_video = None;
            }
        }
    }

    fn open_output_video(&mut self, video: &Path) {
        match open_video(video) {
            Ok(()) => self.log_diagnostic(format!("opened {}", video.display())),
            Err(err) => {
                warn!(path = %video.display(), "failed to open video: {err}");
                self.log_diagnostic(format!("failed to open {}: {err}", video.display()));
            }
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("MultiTalk Studio");
                ui.separator();
                ui.selectable_value(&mut self.tab, Tab::Generate, "Generate");
                ui.selectable_value(&mut self.tab, Tab::Preview, "Bounding box preview");
                ui.separator();
                if self.is_running {
                    ui.spinner();
                    ui.label(RichText::new("Running").color(self.theme.warning));
                } else {
                    ui.label(RichText::new("Idle").color(self.theme.text_muted));
                }
            });
        });
    }

    fn render_left_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("sessions_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Recent sessions");
                ui.label(
                    RichText::new(self.client.data_root().display().to_string())
                        .small()
                        .color(self.theme.text_muted),
                );
                if ui.button("Refresh").clicked() {
                    self.refresh_sessions();
                }
                ui.separator();

                let mut clicked: Option<usize> = None;
                ScrollArea::vertical().id_salt("recent_sessions").show(ui, |ui| {
                    if self.sessions.is_empty() {
                        ui.label(RichText::new("No sessions yet").color(self.theme.text_muted));
                    }
                    for (index, session) in self.sessions.iter().enumerate() {
                        if ui.button(session.title()).clicked() {
                            clicked = Some(index);
                        }
                    }
                });

                if let Some(session) = clicked.and_then(|index| self.sessions.get(index)) {
                    self.status = session.details();
                    self.status_tone = StatusTone::Idle;
                    self.output_video = session.video.clone();
                    self.tab = Tab::Generate;
                }
            });
    }

    fn render_generate_tab(&mut self, ui: &mut egui::Ui) {
        ui.columns(2, |columns| {
            let enabled = !self.is_running;
            if self.form.render(&mut columns[0], &self.theme, enabled) && enabled {
                self.submit();
            }

            let ui = &mut columns[1];
            self.theme.card_frame().show(ui, |ui| {
                ui.label(RichText::new("Status").strong());
                let mut status = self.status.as_str();
                ui.add(
                    egui::TextEdit::multiline(&mut status)
                        .desired_rows(10)
                        .desired_width(f32::INFINITY)
                        .text_color(self.theme.status_color(self.status_tone)),
                );
            });

            ui.add_space(self.theme.spacing_8);
            self.theme.card_frame().show(ui, |ui| {
                ui.label(RichText::new("Result video").strong());
                let mut open_requested = None;
                match &self.output_video {
                    Some(video) => {
                        let path = video.display().to_string();
                        ui.label(RichText::new(&path).monospace());
                        ui.horizontal(|ui| {
                            if ui.button("Open video").clicked() {
                                open_requested = Some(video.clone());
                            }
                            if ui.button("Copy path").clicked() {
                                ui.ctx().copy_text(path);
                            }
                        });
                    }
                    None => {
                        ui.label(RichText::new("No video yet").color(self.theme.text_muted));
                    }
                }
                if let Some(video) = open_requested {
                    self.open_output_video(&video);
                }
            });
        });

        ui.add_space(self.theme.spacing_12);
        egui::CollapsingHeader::new("Usage guide")
            .default_open(false)
            .show(ui, |ui| {
                ui.label(USAGE_GUIDE);
            });
    }

    fn render_center_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical().id_salt("main_scroll").show(ui, |ui| {
                match self.tab {
                    Tab::Generate => self.render_generate_tab(ui),
                    Tab::Preview => self.preview.render(ui, &self.theme),
                }

                ui.separator();
                egui::CollapsingHeader::new("Diagnostics")
                    .default_open(false)
                    .show(ui, |ui| {
                        ScrollArea::vertical()
                            .id_salt("diagnostics_log")
                            .max_height(120.0)
                            .stick_to_bottom(true)
                            .show(ui, |ui| {
                                for entry in &self.diagnostics_log {
                                    ui.label(RichText::new(entry).small().monospace());
                                }
                            });
                    });
            });
        });
    }
}

impl eframe::App for MultiTalkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        if self.is_running || self.client.is_busy() {
            // Results arrive from the runtime thread; keep polling while a job runs.
            ctx.request_repaint_after(Duration::from_millis(250));
        }

        self.render_top_bar(ctx);
        self.render_left_panel(ctx);
        self.render_center_panel(ctx);
    }
}

// Playback is handed to the system's default player.
fn open_video(path: &Path) -> io::Result<()> {
    if !path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("video file {} no longer exists", path.display()),
        ));
    }
    open::that(path)
}
