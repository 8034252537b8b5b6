use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

pub mod client;

pub use client::GeneratorClient;

pub const VIDEO_EXTENSIONS: [&str; 4] = [".mp4", ".avi", ".mov", ".mkv"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub program: String,
    pub script: PathBuf,
    pub ckpt_dir: PathBuf,
    pub wav2vec_dir: PathBuf,
    pub sample_steps: u32,
    pub num_persistent_param_in_dit: u64,
    pub mode: String,
    pub use_teacache: bool,
    pub teacache_thresh: f64,
    pub sample_shift: f64,
    pub use_apg: bool,
    pub apg_momentum: f64,
    pub apg_norm_threshold: f64,
    pub size: String,
    pub motion_frame: u32,
    pub sample_text_guide_scale: f64,
    pub sample_audio_guide_scale: f64,
    pub working_dir: PathBuf,
    pub output_extensions: Vec<String>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            program: "python3".into(),
            script: "generate_multitalk.py".into(),
            ckpt_dir: "weights/Wan2.1-I2V-14B-480P".into(),
            wav2vec_dir: "weights/chinese-wav2vec2-base".into(),
            sample_steps: 15,
            num_persistent_param_in_dit: 11_000_000_000,
            mode: "streaming".into(),
            use_teacache: true,
            teacache_thresh: 0.2,
            sample_shift: 9.0,
            use_apg: true,
            apg_momentum: -0.74,
            apg_norm_threshold: 52.0,
            size: "multitalk-480".into(),
            motion_frame: 25,
            sample_text_guide_scale: 7.0,
            sample_audio_guide_scale: 4.0,
            working_dir: ".".into(),
            output_extensions: VIDEO_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

impl GeneratorSettings {
    pub fn invocation(&self, input_json: &Path, save_file: &str) -> Invocation {
        let mut args: Vec<OsString> = vec![self.script.clone().into()];
        push_flag(&mut args, "ckpt_dir", &self.ckpt_dir);
        push_flag(&mut args, "wav2vec_dir", &self.wav2vec_dir);
        push_flag(&mut args, "input_json", input_json);
        push_flag(&mut args, "sample_steps", self.sample_steps.to_string());
        push_flag(
            &mut args,
            "num_persistent_param_in_dit",
            self.num_persistent_param_in_dit.to_string(),
        );
        push_flag(&mut args, "mode", &self.mode);
        if self.use_teacache {
            args.push("--use_teacache".into());
        }
        push_flag(&mut args, "sample_shift", self.sample_shift.to_string());
        if self.use_apg {
            args.push("--use_apg".into());
            push_flag(&mut args, "apg_momentum", self.apg_momentum.to_string());
            push_flag(&mut args, "apg_norm_threshold", self.apg_norm_threshold.to_string());
        }
        if self.use_teacache {
            push_flag(&mut args, "teacache_thresh", self.teacache_thresh.to_string());
        }
        push_flag(&mut args, "size", &self.size);
        push_flag(&mut args, "motion_frame", self.motion_frame.to_string());
        push_flag(
            &mut args,
            "sample_text_guide_scale",
            self.sample_text_guide_scale.to_string(),
        );
        push_flag(
            &mut args,
            "sample_audio_guide_scale",
            self.sample_audio_guide_scale.to_string(),
        );
        push_flag(&mut args, "save_file", save_file);

        Invocation {
            program: self.program.clone(),
            args,
            working_dir: self.working_dir.clone(),
        }
    }
}

fn push_flag(args: &mut Vec<OsString>, name: &str, value: impl AsRef<OsStr>) {
    args.push(format!("--{name}").into());
    args.push(value.as_ref().to_os_string());
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
}

impl Invocation {
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.program, self.arg_strings().join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

#[async_trait]
impl CommandRunner for TokioRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
