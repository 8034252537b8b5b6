use crate::session::Person;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    // Input errors, the user has to fix the form
    #[error("image file not found: {}", .0.display())]
    MissingImage(PathBuf),

    #[error("audio file for {person} not found: {}", .path.display())]
    MissingAudio { person: Person, path: PathBuf },

    #[error("bbox for {person} must have 4 numbers (x,y,w,h), got {count}")]
    BboxArity { person: Person, count: usize },

    #[error("bbox coordinates must be integers ({person}: {token:?})")]
    BboxNotInteger { person: Person, token: String },

    #[error("bbox coordinate {token} for {person} is out of range")]
    BboxOutOfRange { person: Person, token: String },

    // Generator errors
    #[error("generator failed ({status}):\nSTDOUT: {stdout}\nSTDERR: {stderr}")]
    GeneratorFailed {
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("output video not found with name {base_name}")]
    OutputNotFound { base_name: String },

    #[error("failed to launch generator `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    // Infra
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize generation config: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }

    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingImage(_)
                | Self::MissingAudio { .. }
                | Self::BboxArity { .. }
                | Self::BboxNotInteger { .. }
                | Self::BboxOutOfRange { .. }
        )
    }
}
