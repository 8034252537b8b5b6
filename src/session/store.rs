use crate::session::{config_path, GenerationConfig, Session, SessionError, StagedKind, OUTPUT_PREFIX};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub token: String,
    pub timestamp: String,
    pub dir: PathBuf,
    pub config: GenerationConfig,
    pub video: Option<PathBuf>,
}

impl SessionSummary {
    pub fn title(&self) -> String {
        let speakers = if self.config.is_two_speaker() { 2 } else { 1 };
        let marker = if self.video.is_some() { "video" } else { "no video" };
        format!("{} · {speakers}p · {marker}", self.token)
    }

    pub fn details(&self) -> String {
        let mut lines = vec![
            format!("Session ID: {}", self.token),
            format!("Created: {}", self.timestamp),
            format!("Directory: {}", self.dir.display()),
            format!("Prompt: {}", self.config.prompt),
            format!("Image: {}", self.config.cond_image),
        ];
        for (person, audio) in &self.config.cond_audio {
            lines.push(format!("Audio {person}: {audio}"));
        }
        if let Some(boxes) = &self.config.bbox {
            for (person, bbox) in boxes {
                lines.push(format!("Bbox {person}: {bbox}"));
            }
        }
        match &self.video {
            Some(video) => lines.push(format!("Video: {}", video.display())),
            None => lines.push("Video: none".to_string()),
        }
        lines.join("\n")
    }
}

pub fn stage_file(session: &Session, kind: StagedKind, source: &Path) -> Result<PathBuf, SessionError> {
    let dest = session.staged_path(kind, source);
    fs::copy(source, &dest).map_err(SessionError::io("copy", source))?;
    debug!(source = %source.display(), dest = %dest.display(), "staged input file");
    Ok(dest)
}

pub fn stage_output(session: &Session, video: &Path) -> Result<PathBuf, SessionError> {
    let file_name = video
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(session.output_base_name()));
    let dest = session.dir.join(file_name);
    fs::copy(video, &dest).map_err(SessionError::io("copy", video))?;
    Ok(dest)
}

pub fn write_config(session: &Session, config: &GenerationConfig) -> Result<PathBuf, SessionError> {
    let final_path = session.config_path();
    let tmp_path = session.dir.join(format!("config_{}.json.tmp", session.token));
    let bytes = serde_json::to_vec_pretty(config)?;

    fs::write(&tmp_path, bytes).map_err(SessionError::io("write", &tmp_path))?;
    fs::rename(&tmp_path, &final_path).map_err(SessionError::io("rename", &tmp_path))?;
    Ok(final_path)
}

pub fn read_config_file(path: &Path) -> Result<GenerationConfig, String> {
    let data = fs::read(path).map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    serde_json::from_slice(&data).map_err(|err| format!("failed to parse {}: {err}", path.display()))
}

pub fn find_video(dir: &Path, base_name: &str, extensions: &[String]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| dir.join(format!("{base_name}{ext}")))
        .find(|candidate| candidate.is_file())
}

pub fn load_recent(data_root: &Path, extensions: &[String]) -> (Vec<SessionSummary>, Vec<String>) {
    let mut sessions = Vec::new();
    let mut warnings = Vec::new();

    let entries = match fs::read_dir(data_root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return (sessions, warnings),
        Err(err) => {
            warnings.push(format!(
                "failed to read data directory {}: {err}",
                data_root.display()
            ));
            return (sessions, warnings);
        }
    };

    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(name) = dir.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let Some((timestamp, token)) = name.rsplit_once('_') else {
            continue;
        };

        let config_file = config_path(&dir, token);
        if !config_file.is_file() {
            continue;
        }

        match read_config_file(&config_file) {
            Ok(config) => {
                let video = find_video(&dir, &format!("{OUTPUT_PREFIX}_{token}"), extensions);
                sessions.push(SessionSummary {
                    token: token.to_string(),
                    timestamp: timestamp.to_string(),
                    dir,
                    config,
                    video,
                });
            }
            Err(err) => warnings.push(err),
        }
    }

    sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    (sessions, warnings)
}
