use crate::generator::{CommandRunner, GeneratorSettings};
use crate::session::store::{self, find_video};
use crate::session::{
    BoundingBox, GenerationConfig, Person, Session, SessionError, StagedKind,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image_path: PathBuf,
    pub audio1_path: PathBuf,
    pub two_speakers: bool,
    pub audio2_path: Option<PathBuf>,
    pub bbox1: Option<String>,
    pub bbox2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSuccess {
    pub session_id: String,
    pub session_dir: PathBuf,
    pub config_path: PathBuf,
    pub video_path: PathBuf,
}

impl GenerationSuccess {
    pub fn message(&self) -> String {
        format!(
            "Video generated successfully!\nSession ID: {}\nDirectory: {}\nConfig JSON: {}",
            self.session_id,
            self.session_dir.display(),
            self.config_path.display()
        )
    }
}

pub type GenerationOutcome = Result<GenerationSuccess, SessionError>;

pub struct SessionBuilder<R> {
    data_root: PathBuf,
    settings: GeneratorSettings,
    runner: R,
}

impl<R: CommandRunner> SessionBuilder<R> {
    pub fn new(data_root: PathBuf, settings: GeneratorSettings, runner: R) -> Self {
        Self {
            data_root,
            settings,
            runner,
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Stages inputs, writes the config and runs the generator once.
    ///
    /// Files copied before a failure stay in the session directory.
    pub async fn run(&self, request: &GenerationRequest) -> GenerationOutcome {
        let session = Session::create(&self.data_root)?;
        info!(session = %session.dir_name(), dir = %session.dir.display(), "session created");

        if !request.image_path.is_file() {
            return Err(SessionError::MissingImage(request.image_path.clone()));
        }
        let image = store::stage_file(&session, StagedKind::Image, &request.image_path)?;

        let audio1 = stage_audio(&session, Person::Person1, &request.audio1_path)?;
        let mut config = GenerationConfig::single(&request.prompt, &image, &audio1);

        if request.two_speakers {
            let audio2_source = request.audio2_path.clone().unwrap_or_default();
            let audio2 = stage_audio(&session, Person::Person2, &audio2_source)?;
            let bbox1 = BoundingBox::resolve(Person::Person1, request.bbox1.as_deref())?;
            let bbox2 = BoundingBox::resolve(Person::Person2, request.bbox2.as_deref())?;
            debug!(%bbox1, %bbox2, "two-speaker boxes resolved");
            config.add_second_speaker(&audio2, bbox1, bbox2);
        }

        let config_path = store::write_config(&session, &config)?;
        info!(config = %config_path.display(), "generation config written");

        let output_name = session.output_base_name();
        let invocation = self.settings.invocation(&config_path, &output_name);
        info!(command = %invocation, cwd = %invocation.working_dir.display(), "running generator");

        let output = self
            .runner
            .run(&invocation)
            .await
            .map_err(|source| SessionError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        if !output.success() {
            warn!(session = %session.token, status = %output.status_label(), "generator failed");
            return Err(SessionError::GeneratorFailed {
                status: output.status_label(),
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        let Some(video) = find_video(
            &invocation.working_dir,
            &output_name,
            &self.settings.output_extensions,
        ) else {
            warn!(session = %session.token, base_name = %output_name, "generator produced no video");
            return Err(SessionError::OutputNotFound {
                base_name: output_name,
            });
        };

        let video_path = store::stage_output(&session, &video)?;
        info!(session = %session.token, video = %video_path.display(), "video staged");

        Ok(GenerationSuccess {
            session_id: session.token.clone(),
            session_dir: session.dir.clone(),
            config_path,
            video_path,
        })
    }
}

fn stage_audio(session: &Session, person: Person, source: &Path) -> Result<PathBuf, SessionError> {
    if !source.is_file() {
        return Err(SessionError::MissingAudio {
            person,
            path: source.to_path_buf(),
        });
    }
    store::stage_file(session, StagedKind::Audio(person), source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{Invocation, ProcessOutput};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::fs;
    use std::io;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Stands in for the generator: records invocations and optionally
    /// writes `<save_file><ext>` into the working directory.
    struct FakeRunner {
        code: Option<i32>,
        stdout: &'static str,
        stderr: &'static str,
        produce: Option<&'static str>,
        calls: Mutex<Vec<Invocation>>,
    }

    impl FakeRunner {
        fn succeeding(ext: &'static str) -> Self {
            Self {
                code: Some(0),
                stdout: "done",
                stderr: "",
                produce: Some(ext),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn exiting(code: i32, stderr: &'static str) -> Self {
            Self {
                code: Some(code),
                stdout: "loading weights",
                stderr,
                produce: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().expect("calls lock").len()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput> {
            self.calls.lock().expect("calls lock").push(invocation.clone());
            if let Some(ext) = self.produce {
                let args = invocation.arg_strings();
                let save_file = args.last().cloned().unwrap_or_default();
                fs::write(invocation.working_dir.join(format!("{save_file}{ext}")), b"video")?;
            }
            Ok(ProcessOutput {
                code: self.code,
                stdout: self.stdout.to_string(),
                stderr: self.stderr.to_string(),
            })
        }
    }

    struct Fixture {
        _scratch: TempDir,
        inputs: PathBuf,
        data_root: PathBuf,
        work: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let scratch = tempfile::tempdir().expect("tempdir");
            let inputs = scratch.path().join("inputs");
            let work = scratch.path().join("work");
            fs::create_dir_all(&inputs).expect("inputs dir");
            fs::create_dir_all(&work).expect("work dir");
            fs::write(inputs.join("face.jpg"), b"jpeg").expect("image");
            fs::write(inputs.join("voice1.wav"), b"wav1").expect("audio1");
            fs::write(inputs.join("voice2.mp3"), b"mp3").expect("audio2");
            Self {
                data_root: scratch.path().join("multitalk_data"),
                inputs,
                work,
                _scratch: scratch,
            }
        }

        fn builder<R: CommandRunner>(&self, runner: R) -> SessionBuilder<R> {
            let settings = GeneratorSettings {
                working_dir: self.work.clone(),
                ..GeneratorSettings::default()
            };
            SessionBuilder::new(self.data_root.clone(), settings, runner)
        }

        fn single_request(&self) -> GenerationRequest {
            GenerationRequest {
                prompt: "two friends chatting".to_string(),
                image_path: self.inputs.join("face.jpg"),
                audio1_path: self.inputs.join("voice1.wav"),
                ..GenerationRequest::default()
            }
        }

        fn two_speaker_request(&self) -> GenerationRequest {
            GenerationRequest {
                two_speakers: true,
                audio2_path: Some(self.inputs.join("voice2.mp3")),
                ..self.single_request()
            }
        }

        fn session_dirs(&self) -> Vec<PathBuf> {
            fs::read_dir(&self.data_root)
                .map(|entries| entries.flatten().map(|entry| entry.path()).collect())
                .unwrap_or_default()
        }

        fn only_session_dir(&self) -> PathBuf {
            let dirs = self.session_dirs();
            assert_eq!(dirs.len(), 1, "expected exactly one session dir");
            dirs.into_iter().next().expect("session dir")
        }
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_slice(&fs::read(path).expect("config readable")).expect("valid json")
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("dir readable")
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn single_speaker_run_stages_files_and_video() {
        let fixture = Fixture::new();
        let builder = fixture.builder(FakeRunner::succeeding(".mp4"));

        let success = builder
            .run(&fixture.single_request())
            .await
            .expect("generation should succeed");

        let token = success.session_id.clone();
        assert_eq!(token.len(), 8);
        assert_eq!(
            file_names(&success.session_dir),
            [
                format!("audio1_{token}.wav"),
                format!("config_{token}.json"),
                format!("image_{token}.jpg"),
                format!("multiperson_{token}.mp4"),
            ]
        );
        assert_eq!(success.video_path, success.session_dir.join(format!("multiperson_{token}.mp4")));

        let message = success.message();
        assert!(message.contains(&token));
        assert!(message.contains(&success.session_dir.display().to_string()));
        assert!(message.contains(&success.config_path.display().to_string()));

        let config = read_json(&success.config_path);
        assert_eq!(config["prompt"], "two friends chatting");
        assert_eq!(
            config["cond_audio"].as_object().map(|audio| audio.len()),
            Some(1)
        );
        assert!(config["cond_audio"]["person1"]
            .as_str()
            .is_some_and(|path| path.ends_with(&format!("audio1_{token}.wav"))));
        assert!(config.get("audio_type").is_none());
        assert!(config.get("bbox").is_none());
    }

    #[tokio::test]
    async fn invocation_names_config_and_output_base() {
        let fixture = Fixture::new();
        let builder = fixture.builder(FakeRunner::succeeding(".mp4"));
        let success = builder.run(&fixture.single_request()).await.expect("success");

        let calls = builder.runner.calls.lock().expect("calls lock");
        let args = calls[0].arg_strings();
        let json_at = args.iter().position(|arg| arg == "--input_json").expect("--input_json");
        assert_eq!(args[json_at + 1], success.config_path.display().to_string());
        assert!(success.config_path.is_absolute());
        let save_at = args.iter().position(|arg| arg == "--save_file").expect("--save_file");
        assert_eq!(args[save_at + 1], format!("multiperson_{}", success.session_id));
        assert_eq!(calls[0].working_dir, fixture.work);
    }

    #[tokio::test]
    async fn two_speakers_without_boxes_use_defaults() {
        let fixture = Fixture::new();
        let builder = fixture.builder(FakeRunner::succeeding(".mkv"));

        let success = builder
            .run(&fixture.two_speaker_request())
            .await
            .expect("generation should succeed");

        let config = read_json(&success.config_path);
        assert_eq!(config["audio_type"], "add");
        assert!(config["cond_audio"]["person2"]
            .as_str()
            .is_some_and(|path| path.ends_with(&format!("audio2_{}.mp3", success.session_id))));
        assert_eq!(config["bbox"]["person1"], json!([350, 600, 220, 400]));
        assert_eq!(config["bbox"]["person2"], json!([300, 300, 280, 300]));
        assert!(success.video_path.extension().is_some_and(|ext| ext == "mkv"));
    }

    #[tokio::test]
    async fn supplied_boxes_are_written() {
        let fixture = Fixture::new();
        let builder = fixture.builder(FakeRunner::succeeding(".mp4"));
        let request = GenerationRequest {
            bbox1: Some("10, 20, 30, 40".to_string()),
            bbox2: Some("".to_string()),
            ..fixture.two_speaker_request()
        };

        let success = builder.run(&request).await.expect("success");
        let config = read_json(&success.config_path);
        assert_eq!(config["bbox"]["person1"], json!([10, 20, 30, 40]));
        assert_eq!(config["bbox"]["person2"], json!([300, 300, 280, 300]));
    }

    #[tokio::test]
    async fn boxes_are_ignored_in_single_speaker_mode() {
        let fixture = Fixture::new();
        let builder = fixture.builder(FakeRunner::succeeding(".mp4"));
        let request = GenerationRequest {
            audio2_path: Some(fixture.inputs.join("voice2.mp3")),
            bbox1: Some("garbage".to_string()),
            ..fixture.single_request()
        };

        let success = builder.run(&request).await.expect("success");
        let config = read_json(&success.config_path);
        assert!(config.get("bbox").is_none());
        assert!(config["cond_audio"].get("person2").is_none());
    }

    #[tokio::test]
    async fn missing_image_copies_nothing() {
        let fixture = Fixture::new();
        let runner = FakeRunner::succeeding(".mp4");
        let builder = fixture.builder(runner);
        let request = GenerationRequest {
            image_path: fixture.inputs.join("nope.png"),
            ..fixture.single_request()
        };

        let err = builder.run(&request).await.expect_err("missing image");
        assert!(matches!(err, SessionError::MissingImage(_)));
        assert!(err.to_string().contains("image"));
        assert!(err.is_input_error());
        assert!(file_names(&fixture.only_session_dir()).is_empty());
        assert_eq!(builder.runner.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_second_audio_fails_in_two_speaker_mode() {
        let fixture = Fixture::new();
        let builder = fixture.builder(FakeRunner::succeeding(".mp4"));
        let request = GenerationRequest {
            audio2_path: None,
            ..fixture.two_speaker_request()
        };

        let err = builder.run(&request).await.expect_err("missing audio2");
        assert!(matches!(
            err,
            SessionError::MissingAudio {
                person: Person::Person2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn non_integer_box_writes_no_config() {
        let fixture = Fixture::new();
        let builder = fixture.builder(FakeRunner::succeeding(".mp4"));
        let request = GenerationRequest {
            bbox1: Some("10,20,thirty,40".to_string()),
            ..fixture.two_speaker_request()
        };

        let err = builder.run(&request).await.expect_err("bad bbox");
        assert!(matches!(err, SessionError::BboxNotInteger { .. }));
        assert!(err.to_string().contains("integers"));

        let names = file_names(&fixture.only_session_dir());
        assert!(names.iter().all(|name| !name.starts_with("config_")));
        // Partial copies are left in place.
        assert_eq!(names.len(), 3);
        assert_eq!(builder.runner.call_count(), 0);
    }

    #[tokio::test]
    async fn wrong_box_count_names_the_person() {
        let fixture = Fixture::new();
        let builder = fixture.builder(FakeRunner::succeeding(".mp4"));
        let request = GenerationRequest {
            bbox2: Some("1,2,3".to_string()),
            ..fixture.two_speaker_request()
        };

        let err = builder.run(&request).await.expect_err("arity");
        assert!(err.to_string().contains("person2"));
        assert!(err.to_string().contains("4 numbers"));
    }

    #[tokio::test]
    async fn generator_failure_surfaces_captured_streams() {
        let fixture = Fixture::new();
        let builder = fixture.builder(FakeRunner::exiting(1, "CUDA out of memory"));

        let err = builder
            .run(&fixture.single_request())
            .await
            .expect_err("generator failure");

        assert!(matches!(err, SessionError::GeneratorFailed { .. }));
        let message = err.to_string();
        assert!(message.contains("CUDA out of memory"));
        assert!(message.contains("loading weights"));
        assert!(!err.is_input_error());
        let dir = fixture.only_session_dir();
        assert!(file_names(&dir).iter().any(|name| name.starts_with("config_")));
    }

    #[tokio::test]
    async fn missing_output_is_not_found() {
        let fixture = Fixture::new();
        let runner = FakeRunner {
            produce: Some(".webm"),
            ..FakeRunner::succeeding(".mp4")
        };
        let builder = fixture.builder(runner);

        let err = builder
            .run(&fixture.single_request())
            .await
            .expect_err("no output");

        match err {
            SessionError::OutputNotFound { base_name } => {
                assert!(base_name.starts_with("multiperson_"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unlaunchable_generator_is_a_spawn_error() {
        let fixture = Fixture::new();
        let settings = GeneratorSettings {
            program: "definitely-not-a-real-generator-binary".to_string(),
            working_dir: fixture.work.clone(),
            ..GeneratorSettings::default()
        };
        let builder = SessionBuilder::new(
            fixture.data_root.clone(),
            settings,
            crate::generator::TokioRunner,
        );

        let err = builder
            .run(&fixture.single_request())
            .await
            .expect_err("spawn failure");
        assert!(matches!(err, SessionError::Spawn { .. }));
        assert!(err.to_string().contains("definitely-not-a-real-generator-binary"));
    }
}
