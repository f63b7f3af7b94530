//! egui renderer for the application UI.
use crate::catalog::PLACEHOLDER;
use crate::egui_app::controller::EguiController;
use crate::session::SessionState;
use eframe::egui::{self, Color32, Frame, RichText, Ui};

/// Minimum window size that keeps the selector and value text readable.
pub const MIN_VIEWPORT_SIZE: egui::Vec2 = egui::vec2(720.0, 480.0);

/// Renders the egui UI using the shared controller state.
pub struct EguiApp {
    controller: EguiController,
    visuals_set: bool,
}

impl EguiApp {
    /// Create a new egui app, loading persisted configuration.
    pub fn new() -> Result<Self, String> {
        let mut controller = EguiController::from_configuration()
            .map_err(|err| format!("Failed to load config: {err}"))?;
        controller.restore_last_session();
        Ok(Self {
            controller,
            visuals_set: false,
        })
    }

    fn apply_visuals(&mut self, ctx: &egui::Context) {
        if self.visuals_set {
            return;
        }
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = Color32::from_rgb(12, 12, 12);
        visuals.panel_fill = Color32::from_rgb(16, 16, 16);
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(16, 16, 16);
        ctx.set_visuals(visuals);
        self.visuals_set = true;
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .find_map(|file| file.path.clone())
        });
        if let Some(path) = dropped {
            self.controller.open_dataset(&path);
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar")
            .frame(
                Frame::new()
                    .fill(Color32::from_rgb(24, 24, 24))
                    .inner_margin(egui::Margin::same(6)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Coder ID").color(Color32::WHITE));
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.controller.ui.coder_input)
                            .desired_width(140.0)
                            .hint_text("e.g. AB"),
                    );
                    if response.lost_focus() {
                        self.controller.apply_coder_input();
                    }
                    ui.separator();
                    if ui.button("Open dataset…").clicked() {
                        self.controller.open_dataset_via_dialog();
                    }
                    if let Some(label) = self.controller.dataset_label() {
                        ui.label(RichText::new(label).color(Color32::LIGHT_GRAY));
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Export merged…").clicked() {
                            self.controller.export_merged_via_dialog();
                        }
                        if ui.button("Export progress…").clicked() {
                            self.controller.export_progress_via_dialog();
                        }
                    });
                });
            });
    }

    fn render_status(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .frame(Frame::new().fill(Color32::from_rgb(0, 0, 0)))
            .show(ctx, |ui| {
                let status = &self.controller.ui.status;
                ui.horizontal(|ui| {
                    ui.add_space(8.0);
                    ui.painter().circle_filled(
                        ui.cursor().min + egui::vec2(9.0, 11.0),
                        9.0,
                        status.badge_color,
                    );
                    ui.add_space(22.0);
                    ui.label(RichText::new(&status.badge_label).color(Color32::WHITE));
                    ui.separator();
                    ui.label(RichText::new(&status.text).color(Color32::WHITE));
                });
            });
    }

    fn render_progress(&mut self, ui: &mut Ui) {
        let Some(counter) = self.controller.counter() else {
            return;
        };
        ui.add(
            egui::ProgressBar::new(counter.fraction())
                .text(format!("{counter} labeled"))
                .desired_width(ui.available_width()),
        );
        ui.add_space(12.0);
    }

    fn render_presenting(&mut self, ui: &mut Ui) {
        let Some(row) = self.controller.current_row() else {
            return;
        };
        let heading = format!(
            "Response {} ({}, item {})",
            row.response_id, row.kind, row.item
        );
        let value = row.value.clone();
        ui.heading(RichText::new(heading).color(Color32::WHITE));
        ui.add_space(8.0);
        egui::ScrollArea::vertical()
            .id_salt("value_scroll")
            .max_height(ui.available_height() * 0.6)
            .show(ui, |ui| {
                ui.label(RichText::new(value).size(16.0).color(Color32::WHITE));
            });
        ui.add_space(12.0);

        let choices = match self.controller.current_choices() {
            Ok(choices) => choices.to_vec(),
            Err(err) => {
                ui.colored_label(Color32::from_rgb(192, 57, 43), err.to_string());
                return;
            }
        };
        ui.horizontal(|ui| {
            let selected = &mut self.controller.ui.selected_category;
            let selected_text = selected.as_deref().unwrap_or(PLACEHOLDER).to_string();
            egui::ComboBox::from_id_salt("category_select")
                .selected_text(selected_text)
                .width(ui.available_width() * 0.7)
                .show_ui(ui, |ui| {
                    ui.selectable_value(selected, None, PLACEHOLDER);
                    for choice in &choices {
                        ui.selectable_value(selected, Some(choice.clone()), choice.as_str());
                    }
                });
            if ui.button("Submit").clicked() {
                self.controller.submit_selected();
            }
        });
    }

    fn render_central(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_progress(ui);
            match self.controller.state() {
                SessionState::AwaitingInput => {
                    ui.vertical_centered(|ui| {
                        ui.add_space(40.0);
                        ui.label(
                            RichText::new("Enter your coder ID and open a dataset to start labeling.")
                                .color(Color32::LIGHT_GRAY),
                        );
                    });
                }
                SessionState::Presenting(_) => self.render_presenting(ui),
                SessionState::Complete => {
                    ui.vertical_centered(|ui| {
                        ui.add_space(40.0);
                        ui.heading(
                            RichText::new("All responses have been labeled.")
                                .color(Color32::WHITE),
                        );
                        ui.label("Export your progress or open another dataset.");
                    });
                }
            }
        });
    }
}

impl eframe::App for EguiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_visuals(ctx);
        self.handle_dropped_files(ctx);
        self.render_top_bar(ctx);
        self.render_status(ctx);
        self.render_central(ctx);
    }
}
