use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tracing::Level;

use term_gloss::app::{self, GlossApp};
use term_gloss::drivers::OutputDriver;
use term_gloss::drivers::console::{ConsoleInputDriver, ConsoleOutputDriver};
use term_gloss::settings::{Provider, Settings};
use term_gloss::{tracing_sub, translate};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Parser)]
#[command(
    name = "term-gloss",
    version,
    about = "Page through text and translate selections in a floating tooltip"
)]
struct Cli {
    /// File to page through. Reads stdin when omitted or `-`.
    file: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Translation provider.
    #[arg(long, value_enum)]
    provider: Option<Provider>,

    /// Command line for the `command` provider.
    #[arg(long)]
    command: Option<String>,

    /// Model name handed to the provider.
    #[arg(long)]
    model: Option<String>,

    /// API key handed to the provider.
    #[arg(long)]
    api_key: Option<String>,

    /// Language to translate into.
    #[arg(long)]
    target_language: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    log_level: Option<Level>,

    /// Write logs to this file; logs are discarded otherwise.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Save the effective settings to the settings file and exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(provider) = self.provider {
            settings.provider = provider;
        }
        if let Some(command) = &self.command {
            settings.command = Some(command.clone());
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(api_key) = &self.api_key {
            settings.api_key = api_key.clone();
        }
        if let Some(language) = &self.target_language {
            settings.target_language = language.clone();
        }
        if let Some(level) = self.log_level {
            settings.log_level = level;
        }
    }
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).map_err(io::Error::other)?;
    cli.apply(&mut settings);
    tracing_sub::init(settings.log_level, cli.log_file.as_deref())?;

    if cli.write_config {
        let path = cli
            .config
            .clone()
            .or_else(Settings::default_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no config directory"))?;
        settings.save(&path).map_err(io::Error::other)?;
        println!("settings written to {}", path.display());
        return Ok(());
    }

    let (text, source_name) = read_source(cli.file.as_deref())?;
    tracing::info!(
        source = %source_name,
        lines = text.lines().count(),
        provider = ?settings.provider,
        "starting term-gloss"
    );

    let translator = translate::from_settings(&settings);
    let mut app =
        GlossApp::new(&text, source_name, translator, &settings).map_err(io::Error::other)?;

    let mut output = ConsoleOutputDriver::new()?;
    output.enter()?;
    let result = app::run(&mut app, ConsoleInputDriver::new(), &mut output, FRAME_INTERVAL);
    output.exit()?;

    if let Err(err) = &result {
        tracing::error!(%err, "term-gloss exited with an error");
    }
    result
}

fn read_source(path: Option<&Path>) -> io::Result<(String, String)> {
    match path {
        Some(path) if path != Path::new("-") => {
            let text = fs::read_to_string(path)?;
            Ok((text, path.display().to_string()))
        }
        _ => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "no file given and stdin is a terminal; pass a file or pipe text in",
                ));
            }
            let mut text = String::new();
            stdin.lock().read_to_string(&mut text)?;
            Ok((text, "<stdin>".to_string()))
        }
    }
}
