mod app;
mod config;
mod event;
mod generator;
mod logger;
mod preview;
mod session;
mod theme;
mod ui;

use anyhow::Context;
use app::MultiTalkApp;
use clap::Parser;
use config::AppConfig;
use eframe::egui;
use generator::{GeneratorClient, TokioRunner};
use session::builder::SessionBuilder;
use std::path::PathBuf;
use std::sync::mpsc;
use theme::Theme;
use tracing::info;

#[derive(Parser)]
#[command(name = "multitalk-studio")]
#[command(about = "Desktop front-end for the MultiTalk video generator", long_about = None)]
struct Cli {
    /// TOML file with data root, log level and generator settings
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory that receives one folder per session
    #[arg(long)]
    data_root: Option<PathBuf>,
    /// Directory the generator runs in
    #[arg(long)]
    working_dir: Option<PathBuf>,
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(data_root) = &cli.data_root {
        config.data_root = data_root.clone();
    }
    if let Some(working_dir) = &cli.working_dir {
        config.generator.working_dir = working_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logger::init_logging(&config.log_level);

    std::fs::create_dir_all(&config.data_root).with_context(|| {
        format!("failed to create data root {}", config.data_root.display())
    })?;
    info!(
        data_root = %config.data_root.display(),
        working_dir = %config.generator.working_dir.display(),
        "starting multitalk-studio"
    );

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("multitalk-runtime")
        .build()?;

    let builder = SessionBuilder::new(config.data_root.clone(), config.generator.clone(), TokioRunner);
    let client = GeneratorClient::new(runtime.handle().clone(), tx, builder);
    let theme = Theme::default();
    let app = MultiTalkApp::new(rx, client, theme.clone());
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("MultiTalk Studio")
            .with_inner_size([1200.0, 780.0])
            .with_min_inner_size([900.0, 600.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "MultiTalk Studio",
        native_options,
        Box::new(move |creation_context| {
            theme.apply_visuals(&creation_context.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed to run UI: {err}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("multitalk.toml");
        std::fs::write(
            &path,
            "data_root = \"/from/file\"\nlog_level = \"warn\"\n[generator]\nworking_dir = \"/file/work\"\n",
        )
        .expect("config should write");

        let cli = Cli::parse_from([
            "multitalk-studio",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--data-root",
            "/from/cli",
        ]);
        let config = load_config(&cli).expect("config should load");
        assert_eq!(config.data_root, PathBuf::from("/from/cli"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.generator.working_dir, PathBuf::from("/file/work"));
    }

    #[test]
    fn no_flags_uses_defaults() {
        let cli = Cli::parse_from(["multitalk-studio"]);
        let config = load_config(&cli).expect("defaults");
        assert_eq!(config, AppConfig::default());
    }
}
