use crate::session::builder::GenerationRequest;
use crate::session::BoundingBox;
use crate::theme::Theme;
use eframe::egui::{self, RichText};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateForm {
    pub prompt: String,
    pub image_path: String,
    pub audio1_path: String,
    pub two_speakers: bool,
    pub audio2_path: String,
    pub bbox1: String,
    pub bbox2: String,
}

impl GenerateForm {
    pub fn to_request(&self) -> GenerationRequest {
        let bbox = |text: &str| Some(text.trim().to_string()).filter(|text| !text.is_empty());
        let path = |text: &str| PathBuf::from(text.trim());

        let mut request = GenerationRequest {
            prompt: self.prompt.clone(),
            image_path: path(&self.image_path),
            audio1_path: path(&self.audio1_path),
            two_speakers: self.two_speakers,
            ..GenerationRequest::default()
        };
        if self.two_speakers {
            request.audio2_path = Some(path(&self.audio2_path)).filter(|p| !p.as_os_str().is_empty());
            request.bbox1 = bbox(&self.bbox1);
            request.bbox2 = bbox(&self.bbox2);
        }
        request
    }

    pub fn render(&mut self, ui: &mut egui::Ui, theme: &Theme, enabled: bool) -> bool {
        let mut clicked = false;
        theme.card_frame().show(ui, |ui| {
            ui.label(RichText::new("Inputs").strong());
            ui.add_space(theme.spacing_4);

            labeled(ui, theme, "Prompt", "Optional description of the scene");
            ui.add(
                egui::TextEdit::multiline(&mut self.prompt)
                    .desired_rows(2)
                    .desired_width(f32::INFINITY)
                    .hint_text("Describe the video (may be left empty)"),
            );

            labeled(ui, theme, "Image path", "Condition image for the video");
            single_line(ui, &mut self.image_path, "/path/to/image.jpg");

            labeled(ui, theme, "Person 1 audio path", "Audio track for the first speaker");
            single_line(ui, &mut self.audio1_path, "/path/to/audio1.wav");

            ui.checkbox(&mut self.two_speakers, "Two speakers (two audio tracks)");

            if self.two_speakers {
                labeled(ui, theme, "Person 2 audio path", "Audio track for the second speaker");
                single_line(ui, &mut self.audio2_path, "/path/to/audio2.wav");

                labeled(ui, theme, "Person 1 bbox (x,y,w,h)", "4 comma separated integers");
                single_line(ui, &mut self.bbox1, &bbox_hint(BoundingBox::PERSON1_DEFAULT));

                labeled(ui, theme, "Person 2 bbox (x,y,w,h)", "4 comma separated integers");
                single_line(ui, &mut self.bbox2, &bbox_hint(BoundingBox::PERSON2_DEFAULT));
            }

            ui.add_space(theme.spacing_8);
            let label = if enabled { "Generate video" } else { "Generating..." };
            clicked = ui
                .add_enabled(enabled, egui::Button::new(RichText::new(label).strong()))
                .clicked();
        });
        clicked
    }
}

fn labeled(ui: &mut egui::Ui, theme: &Theme, label: &str, info: &str) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.label(RichText::new(info).small().color(theme.text_muted));
    });
}

fn single_line(ui: &mut egui::Ui, value: &mut String, hint: &str) {
    ui.add(
        egui::TextEdit::singleline(value)
            .desired_width(f32::INFINITY)
            .hint_text(hint),
    );
}

fn bbox_hint(bbox: BoundingBox) -> String {
    let [x, y, w, h]: [i32; 4] = bbox.into();
    format!("{x},{y},{w},{h}")
}
