use crate::backend::BackendClient;
use crate::config::Mode;
use crate::error::{ClientError, ClientResult};
use crate::event::{AppEvent, Command};
use crate::input::{key_action, KeyAction, QuickAction};
use crate::session::directory::Confirmation;
use crate::session::Role;
use crate::state::ClientState;
use crate::status::Connection;
use crate::theme::Theme;
use crate::transcript::{display_lines, Entry};
use crate::upload::{human_size, FileCandidate, ALLOWED_EXTENSIONS};
use chrono::Local;
use eframe::egui::{self, Key, Modifiers, RichText, ScrollArea};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

/// Session-panel clicks, applied after the list has been drawn.
enum SessionAction {
    Select(String),
    Clear(String),
    Delete(String),
}

pub struct ParlorApp {
    rx: Receiver<AppEvent>,
    backend: BackendClient,
    state: ClientState,
    theme: Theme,
    theme_applied: bool,
    new_session_name: String,
    show_diagnostics: bool,
}

impl ParlorApp {
    pub fn new(rx: Receiver<AppEvent>, backend: BackendClient, mode: Mode) -> Self {
        let mut state = ClientState::new(mode);
        backend.dispatch_all(state.startup());
        if mode == Mode::Streaming {
            backend.start_stream();
        }

        Self {
            rx,
            backend,
            state,
            theme: Theme::default(),
            theme_applied: false,
            new_session_name: String::new(),
            show_diagnostics: false,
        }
    }

    fn run(&mut self, result: ClientResult<Vec<Command>>) {
        match result {
            Ok(commands) => self.backend.dispatch_all(commands),
            Err(error) => self.state.report(&error),
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    let commands = self.state.handle(event);
                    self.backend.dispatch_all(commands);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::error!("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn accept_file(&mut self, path: PathBuf) {
        let result = match std::fs::metadata(&path) {
            Ok(metadata) => self.state.select_file(FileCandidate {
                path,
                size: metadata.len(),
            }),
            Err(err) => Err(ClientError::Validation(format!(
                "Could not read {}: {err}",
                path.display()
            ))),
        };
        self.run(result);
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        if self.state.mode() != Mode::Request {
            return;
        }
        let dropped = ctx.input(|input| {
            input
                .raw
                .dropped_files
                .first()
                .and_then(|file| file.path.clone())
        });
        if let Some(path) = dropped {
            self.accept_file(path);
        }
    }

    fn pick_file(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Documents and images", &ALLOWED_EXTENSIONS[..])
            .pick_file();
        if let Some(path) = picked {
            self.accept_file(path);
        }
    }

    fn submit(&mut self) {
        let result = self.state.submit();
        self.run(result);
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let (label, color) = match self.state.status.connection() {
            Connection::Connected => (self.state.status.label(), self.theme.success),
            Connection::Checking => (self.state.status.label(), self.theme.warning),
            Connection::Disconnected(_) => (self.state.status.label(), self.theme.danger),
        };

        let mut commands = Vec::new();
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Parlor");
                ui.separator();
                ui.label(RichText::new(format!("● {label}")).color(color));
                if let Some(model) = self.state.status.model_name() {
                    ui.label(RichText::new(model).color(self.theme.text_muted));
                }
                if let Some(seconds) = self.state.last_response_time() {
                    ui.label(
                        RichText::new(format!("last response {seconds:.2}s"))
                            .color(self.theme.text_muted),
                    );
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("System status").clicked() {
                        commands.extend(self.state.open_system_status());
                    }
                    if ui.button("Recheck").clicked() {
                        commands.extend(self.state.recheck_status());
                    }
                    if self.state.mode() == Mode::Request && ui.button("New chat").clicked() {
                        commands.extend(self.state.new_conversation());
                    }
                    ui.toggle_value(&mut self.show_diagnostics, "Diagnostics");
                });
            });

            if let Connection::Disconnected(diagnostic) = self.state.status.connection() {
                ui.label(RichText::new(diagnostic.message()).color(self.theme.danger));
            }
            if let Some(notice) = self.state.reconnect_notice() {
                ui.label(RichText::new(notice).color(self.theme.warning));
            }
        });
        self.backend.dispatch_all(commands);
    }

    fn render_session_panel(&mut self, ctx: &egui::Context) {
        let mut action: Option<SessionAction> = None;
        let mut create = false;

        egui::SidePanel::left("session_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.heading("Sessions");
                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut self.new_session_name)
                            .desired_width(140.0)
                            .hint_text("New session name"),
                    );
                    create = ui.button("New").clicked();
                });
                ui.separator();

                ScrollArea::vertical().id_salt("session_list").show(ui, |ui| {
                    for session in self.state.directory.sessions() {
                        let active = self.state.directory.is_active(&session.session_id);
                        let label = format!("{} ({})", session.name, session.message_count);
                        ui.horizontal(|ui| {
                            if ui.selectable_label(active, label).clicked() {
                                action = Some(SessionAction::Select(session.session_id.clone()));
                            }
                            if ui.small_button("Clear").clicked() {
                                action = Some(SessionAction::Clear(session.session_id.clone()));
                            }
                            if ui.small_button("Delete").clicked() {
                                action = Some(SessionAction::Delete(session.session_id.clone()));
                            }
                        });
                        if !session.created_at.is_empty() {
                            ui.label(
                                RichText::new(&session.created_at)
                                    .small()
                                    .color(self.theme.text_muted),
                            );
                        }
                    }
                });
            });

        if create {
            let name = std::mem::take(&mut self.new_session_name);
            let commands = self.state.create_session(&name, Local::now());
            self.backend.dispatch_all(commands);
        }

        match action {
            Some(SessionAction::Select(session_id)) => {
                let commands = self.state.select_session(&session_id);
                self.backend.dispatch_all(commands);
            }
            Some(SessionAction::Clear(session_id)) => self.state.request_clear(&session_id),
            Some(SessionAction::Delete(session_id)) => {
                if let Err(error) = self.state.request_delete(&session_id) {
                    self.state.report(&error);
                }
            }
            None => {}
        }
    }

    fn render_transcript(&mut self, ui: &mut egui::Ui, height: f32) {
        let scroll = self.state.transcript.take_scroll_request();
        let mut quick_action = None;

        ScrollArea::vertical()
            .id_salt("chat_transcript")
            .max_height(height)
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if self.state.transcript.is_empty() {
                    ui.add_space(self.theme.spacing_12);
                    ui.heading("How can I help you today?");
                    ui.label(
                        RichText::new("Ask anything, or start from one of these:")
                            .color(self.theme.text_muted),
                    );
                    ui.horizontal_wrapped(|ui| {
                        for action in QuickAction::ALL {
                            if ui.button(action.label()).clicked() {
                                quick_action = Some(action);
                            }
                        }
                    });
                }

                for entry in self.state.transcript.entries() {
                    match entry {
                        Entry::Message(message) => {
                            let (who, fill) = match message.role {
                                Role::User => ("You", self.theme.user_bubble),
                                Role::Assistant => ("Assistant", self.theme.surface_2),
                            };
                            self.theme.bubble_frame(fill).show(ui, |ui| {
                                ui.set_width(ui.available_width());
                                ui.horizontal(|ui| {
                                    ui.strong(who);
                                    if let Some(timestamp) = message.timestamp {
                                        ui.label(
                                            RichText::new(timestamp.format("%H:%M:%S").to_string())
                                                .small()
                                                .color(self.theme.text_muted),
                                        );
                                    }
                                });
                                for line in display_lines(&message.content) {
                                    ui.label(line);
                                }
                            });
                        }
                        Entry::Notice { text, is_error } => {
                            let color = if *is_error {
                                self.theme.danger
                            } else {
                                self.theme.text_muted
                            };
                            let prefix = if *is_error { "⚠ " } else { "" };
                            ui.label(RichText::new(format!("{prefix}{text}")).color(color));
                        }
                    }
                }

                for working in self.state.working() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(RichText::new(working).color(self.theme.text_muted));
                    });
                }

                if scroll {
                    ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                }
            });

        if let Some(action) = quick_action {
            self.state.quick_action(action);
        }
    }

    fn render_composer(&mut self, ui: &mut egui::Ui) {
        let composer_id = egui::Id::new("composer_input");
        let focused = ui.ctx().memory(|memory| memory.has_focus(composer_id));
        let enter = ui.ctx().input(|input| {
            input
                .key_pressed(Key::Enter)
                .then_some(input.modifiers.shift)
        });

        let mut send_now = false;
        if focused {
            if let Some(shift) = enter {
                if key_action(shift) == KeyAction::Send {
                    ui.ctx()
                        .input_mut(|input| input.consume_key(Modifiers::NONE, Key::Enter));
                    send_now = true;
                }
            }
        }

        let mut pick = false;
        let mut remove = false;
        let request_mode = self.state.mode() == Mode::Request;
        let busy = self.state.input.is_busy();

        self.theme.composer_frame().show(ui, |ui| {
            if let Some(attachment) = self.state.input.attachment() {
                ui.horizontal(|ui| {
                    ui.label(format!(
                        "📎 {} ({})",
                        attachment.name,
                        human_size(attachment.file_size)
                    ));
                    remove = ui.small_button("✕").clicked();
                });
            }

            let hint = if busy {
                "Waiting for response..."
            } else {
                "Type a message... (Shift+Enter for a new line)"
            };
            ui.add_enabled(
                !busy,
                egui::TextEdit::multiline(&mut self.state.input.buffer)
                    .id(composer_id)
                    .desired_rows(2)
                    .desired_width(f32::INFINITY)
                    .hint_text(hint),
            );

            ui.horizontal(|ui| {
                if request_mode {
                    pick = ui.add_enabled(!busy, egui::Button::new("Attach file")).clicked();
                }
                let clicked = ui
                    .add_enabled(self.state.input.can_send(), egui::Button::new("Send"))
                    .clicked();
                send_now |= clicked;
            });
        });

        if remove {
            self.state.remove_attachment();
        }
        if pick {
            self.pick_file();
        }
        if send_now {
            self.submit();
        }
    }

    fn render_center_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let composer_height = if self.show_diagnostics { 280.0 } else { 150.0 };
            let transcript_height = (ui.available_height() - composer_height).max(120.0);
            self.render_transcript(ui, transcript_height);

            if self.show_diagnostics {
                ui.separator();
                ScrollArea::vertical()
                    .id_salt("diagnostics_log")
                    .max_height(110.0)
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for entry in self.state.diagnostics() {
                            ui.label(RichText::new(entry).small().monospace());
                        }
                    });
            }

            ui.separator();
            self.render_composer(ui);
        });
    }

    fn render_confirmation(&mut self, ctx: &egui::Context) {
        let Some(confirmation) = self.state.pending_confirmation().cloned() else {
            return;
        };
        let title = match confirmation {
            Confirmation::DeleteSession { .. } => "Delete session",
            Confirmation::ClearHistory { .. } => "Clear history",
        };

        let mut confirmed = false;
        let mut cancelled = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(confirmation.prompt());
                ui.horizontal(|ui| {
                    confirmed = ui.button("Confirm").clicked();
                    cancelled = ui.button("Cancel").clicked();
                });
            });

        if confirmed {
            let commands = self.state.confirm();
            self.backend.dispatch_all(commands);
        } else if cancelled {
            self.state.cancel_confirmation();
        }
    }

    fn render_system_status(&mut self, ctx: &egui::Context) {
        if !self.state.system_status_open() {
            return;
        }

        let mut open = true;
        egui::Window::new("System status")
            .open(&mut open)
            .collapsible(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| match self.state.status.components() {
                None => {
                    ui.spinner();
                }
                Some(Err(message)) => {
                    ui.label(RichText::new(message).color(self.theme.danger));
                }
                Some(Ok(components)) => {
                    egui::Grid::new("system_status_grid")
                        .num_columns(2)
                        .striped(true)
                        .show(ui, |ui| {
                            for component in components {
                                ui.strong(&component.label);
                                ui.label(
                                    RichText::new(&component.status)
                                        .color(self.theme.level_color(component.level)),
                                );
                                ui.end_row();
                            }
                        });
                }
            });

        if !open {
            self.state.close_system_status();
        }
    }
}

impl eframe::App for ParlorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            self.theme.apply_visuals(ctx);
            self.theme_applied = true;
        }

        self.drain_events();
        self.handle_dropped_files(ctx);
        self.render_top_bar(ctx);
        if self.state.mode() == Mode::Streaming {
            self.render_session_panel(ctx);
        }
        self.render_center_panel(ctx);
        self.render_confirmation(ctx);
        self.render_system_status(ctx);

        // Network results arrive on a channel egui cannot see.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
