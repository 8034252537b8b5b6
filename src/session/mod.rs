use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub mod bbox;
pub mod builder;
pub mod error;
pub mod store;

pub use bbox::BoundingBox;
pub use error::SessionError;

pub const AUDIO_TYPE_ADD: &str = "add";
pub const OUTPUT_PREFIX: &str = "multiperson";
const TOKEN_LEN: usize = 8;
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Person {
    Person1,
    Person2,
}

impl Person {
    pub fn label(self) -> &'static str {
        match self {
            Self::Person1 => "person1",
            Self::Person2 => "person2",
        }
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedKind {
    Image,
    Audio(Person),
}

impl StagedKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio(Person::Person1) => "audio1",
            Self::Audio(Person::Person2) => "audio2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub prompt: String,
    pub cond_image: String,
    pub cond_audio: BTreeMap<Person, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BTreeMap<Person, BoundingBox>>,
}

impl GenerationConfig {
    pub fn single(prompt: &str, image: &Path, audio1: &Path) -> Self {
        Self {
            prompt: prompt.to_string(),
            cond_image: path_string(image),
            cond_audio: BTreeMap::from([(Person::Person1, path_string(audio1))]),
            audio_type: None,
            bbox: None,
        }
    }

    pub fn add_second_speaker(&mut self, audio2: &Path, bbox1: BoundingBox, bbox2: BoundingBox) {
        self.audio_type = Some(AUDIO_TYPE_ADD.to_string());
        self.cond_audio.insert(Person::Person2, path_string(audio2));
        self.bbox = Some(BTreeMap::from([
            (Person::Person1, bbox1),
            (Person::Person2, bbox2),
        ]));
    }

    pub fn is_two_speaker(&self) -> bool {
        self.cond_audio.contains_key(&Person::Person2)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub timestamp: String,
    pub dir: PathBuf,
}

impl Session {
    pub fn create(data_root: &Path) -> Result<Self, SessionError> {
        let token = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(TOKEN_LEN)
            .collect::<String>();
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::create_with(data_root, token, timestamp)
    }

    pub(crate) fn create_with(
        data_root: &Path,
        token: String,
        timestamp: String,
    ) -> Result<Self, SessionError> {
        let dir = data_root.join(format!("{timestamp}_{token}"));
        fs::create_dir_all(&dir).map_err(SessionError::io("create session directory", &dir))?;
        // The generator runs in its own working directory, so hand it absolute paths.
        let dir = fs::canonicalize(&dir).unwrap_or(dir);
        Ok(Self {
            token,
            timestamp,
            dir,
        })
    }

    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.timestamp, self.token)
    }

    pub fn staged_path(&self, kind: StagedKind, source: &Path) -> PathBuf {
        let stem = format!("{}_{}", kind.prefix(), self.token);
        let file_name = match staged_extension(source) {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem,
        };
        self.dir.join(file_name)
    }

    pub fn config_path(&self) -> PathBuf {
        config_path(&self.dir, &self.token)
    }

    pub fn output_base_name(&self) -> String {
        format!("{OUTPUT_PREFIX}_{}", self.token)
    }
}

pub(crate) fn config_path(dir: &Path, token: &str) -> PathBuf {
    dir.join(format!("config_{token}.json"))
}

// Dotfiles such as `.png` have no `Path::extension`, keep the part after the dot.
fn staged_extension(source: &Path) -> Option<String> {
    if let Some(ext) = source.extension() {
        return Some(ext.to_string_lossy().to_string());
    }
    let name = source.file_name()?.to_string_lossy();
    name.strip_prefix('.')
        .and_then(|rest| rest.rsplit('.').next())
        .filter(|ext| !ext.is_empty())
        .map(str::to_string)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
