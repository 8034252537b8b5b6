use crate::session::builder::GenerationOutcome;

#[derive(Debug)]
pub enum AppEvent {
    GenerationStarted,
    GenerationFinished(GenerationOutcome),
}
