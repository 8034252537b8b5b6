use crate::preview::draw_bounding_box;
use crate::theme::{StatusTone, Theme};
use eframe::egui::{self, load::SizedTexture, ColorImage, RichText, TextureHandle, TextureOptions};
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Default)]
pub struct PreviewPanel {
    image_path: String,
    coords: String,
    source: Option<DynamicImage>,
    annotated: Option<RgbaImage>,
    status: String,
    tone: Option<StatusTone>,
    source_texture: Option<TextureHandle>,
    annotated_texture: Option<TextureHandle>,
}

impl PreviewPanel {
    pub fn load_image(&mut self, path: &Path) {
        match image::open(path) {
            Ok(image) => {
                debug!(path = %path.display(), width = image.width(), height = image.height(), "preview image loaded");
                self.image_path = path.display().to_string();
                self.status = format!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
                self.tone = Some(StatusTone::Idle);
                self.source = Some(image);
                self.annotated = None;
                self.source_texture = None;
                self.annotated_texture = None;
            }
            Err(err) => {
                warn!(path = %path.display(), "failed to load preview image: {err}");
                self.status = format!("Failed to load {}: {err}", path.display());
                self.tone = Some(StatusTone::Error);
            }
        }
    }

    pub fn draw(&mut self) {
        let Some(source) = &self.source else {
            self.status = "Load an image first".to_string();
            self.tone = Some(StatusTone::Error);
            return;
        };

        self.annotated_texture = None;
        match draw_bounding_box(source, &self.coords) {
            Ok(annotated) => {
                debug!(bbox = %annotated.bbox, "bounding box drawn");
                self.status = annotated.message;
                self.tone = Some(StatusTone::Success);
                self.annotated = Some(annotated.image);
            }
            Err(err) => {
                self.status = err.to_string();
                self.tone = Some(StatusTone::Error);
                self.annotated = None;
            }
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn render(&mut self, ui: &mut egui::Ui, theme: &Theme) {
        let dropped = ui.ctx().input(|input| {
            input
                .raw
                .dropped_files
                .iter()
                .find_map(|file| file.path.clone())
        });
        if let Some(path) = dropped {
            self.load_image(&path);
        }

        theme.card_frame().show(ui, |ui| {
            ui.label(RichText::new("Image + bounding box").strong());
            ui.label(
                RichText::new("Drop an image onto the window or enter its path")
                    .small()
                    .color(theme.text_muted),
            );
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.image_path)
                        .desired_width(ui.available_width() - 70.0)
                        .hint_text("/path/to/image.jpg"),
                );
                if ui.button("Load").clicked() {
                    let path = self.image_path.trim().to_string();
                    self.load_image(Path::new(&path));
                }
            });

            ui.label("Bounding box (x, y, w, h)");
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.coords)
                        .desired_width(ui.available_width() - 140.0)
                        .hint_text("e.g. 50, 30, 120, 160"),
                );
                let submitted =
                    response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
                if ui.button("Draw bounding box").clicked() || submitted {
                    self.draw();
                }
            });

            if let Some(tone) = self.tone {
                ui.label(RichText::new(self.status()).color(theme.status_color(tone)));
            }
        });

        ui.add_space(theme.spacing_8);
        ui.columns(2, |columns| {
            columns[0].label(RichText::new("Input image").color(theme.text_muted));
            if let Some(source) = &self.source {
                let texture = self.source_texture.get_or_insert_with(|| {
                    to_texture(columns[0].ctx(), "preview-source", &source.to_rgba8())
                });
                show_texture(&mut columns[0], texture);
            }

            columns[1].label(RichText::new("With bounding box").color(theme.text_muted));
            if let Some(annotated) = &self.annotated {
                let texture = self.annotated_texture.get_or_insert_with(|| {
                    to_texture(columns[1].ctx(), "preview-annotated", annotated)
                });
                show_texture(&mut columns[1], texture);
            }
        });
    }
}

fn to_texture(ctx: &egui::Context, name: &str, image: &RgbaImage) -> TextureHandle {
    let size = [image.width() as usize, image.height() as usize];
    let color_image = ColorImage::from_rgba_unmultiplied(size, image.as_raw());
    ctx.load_texture(name, color_image, TextureOptions::LINEAR)
}

fn show_texture(ui: &mut egui::Ui, texture: &TextureHandle) {
    let max_width = ui.available_width();
    ui.add(
        egui::Image::from_texture(SizedTexture::from_handle(texture))
            .max_width(max_width)
            .maintain_aspect_ratio(true),
    );
}
