mod app;
mod handler;
mod tui;
mod ui;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use flowdraft_core::{Config, OllamaClient, Provider, Theme};
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser, Debug)]
#[command(name = "flowdraft")]
#[command(version)]
#[command(about = "Describe a flowchart in plain words and refine it in your terminal")]
struct Cli {
    /// AI provider: openai, claude or ollama
    #[arg(short, long)]
    provider: Option<String>,

    /// Model name (defaults to the provider's default model)
    #[arg(short, long)]
    model: Option<String>,

    /// Sampling temperature, 0.0 to 2.0
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum tokens per completion
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Diagram theme: default, dark, forest or neutral
    #[arg(long)]
    theme: Option<String>,

    /// Write logs here instead of the cache directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Persist the options above to the config file
    #[arg(long)]
    save_config: bool,

    /// List models available on the Ollama server and exit
    #[arg(long)]
    list_models: bool,
}

impl Cli {
    /// Apply command line overrides on top of the loaded config
    fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(provider) = &self.provider {
            let parsed = Provider::from_str(provider)
                .ok_or_else(|| anyhow!("Unknown provider '{}'", provider))?;
            config.provider = Some(parsed.as_str().to_string());
            // A model from the config file may belong to another provider
            if self.model.is_none() {
                config.model = None;
            }
        }
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                bail!("Temperature must be between 0.0 and 2.0, got {}", temperature);
            }
            config.temperature = Some(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            if max_tokens == 0 {
                bail!("--max-tokens must be greater than zero");
            }
            config.max_tokens = Some(max_tokens);
        }
        if let Some(theme) = &self.theme {
            let parsed = Theme::from_str(theme).ok_or_else(|| anyhow!("Unknown theme '{}'", theme))?;
            config.theme = Some(parsed.as_str().to_string());
        }
        Ok(())
    }
}

fn default_log_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir().ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    Ok(cache_dir.join("flowdraft").join("flowdraft.log"))
}

/// Log to a file; the terminal belongs to the UI
fn init_logging(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => default_log_path()?,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open log file {:?}", path))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}

async fn list_ollama_models(config: &Config) -> Result<()> {
    let ollama = OllamaClient::new(config.ollama_base_url());
    let models = ollama
        .list_models()
        .await
        .with_context(|| format!("Could not reach Ollama at {}", config.ollama_base_url()))?;

    if models.is_empty() {
        println!("No models found. Pull one with: ollama pull llama3.2");
    } else {
        for model in models {
            println!("  {}", model);
        }
    }
    Ok(())
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await,
            None => break,
        }
    }

    if let Some(task) = app.generation_task.take() {
        task.abort();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = init_logging(cli.log_file.clone())?;

    let mut config = Config::load()?;
    cli.apply_to(&mut config)?;
    if cli.save_config {
        config.save()?;
        info!(path = ?Config::get_config_path()?, "config saved");
    }

    if cli.list_models {
        return list_ollama_models(&config).await;
    }

    info!(
        provider = config.provider().as_str(),
        model = %config.model(),
        log = ?log_path,
        "starting flowdraft v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut app = App::new(&config);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    result
}
