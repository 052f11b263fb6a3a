use clap::Parser;
use parley::core::config::{CliOverrides, load_config, log_dir, resolve};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "parley", about = "Terminal chat client for Gemini")]
struct Args {
    /// Text model to chat with
    #[arg(short, long)]
    model: Option<String>,

    /// Model used for image requests
    #[arg(long)]
    image_model: Option<String>,

    /// Where chats and the log file are stored
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep chats in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // File logger first, so config loading is logged; the terminal
    // belongs to the UI
    let log_dir = log_dir(args.data_dir.as_deref());
    fs::create_dir_all(&log_dir)?;
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create(log_dir.join("parley.log")) {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let config = load_config().map_err(|e| {
        log::error!("Failed to load config: {}", e);
        io::Error::other(e.to_string())
    })?;
    let resolved = resolve(
        &config,
        &CliOverrides {
            model: args.model,
            image_model: args.image_model,
            data_dir: args.data_dir,
            ephemeral: args.ephemeral,
        },
    );

    log::info!(
        "Parley starting up: model={}, image_model={}, data_dir={}",
        resolved.model,
        resolved.image_model,
        resolved.data_dir.display()
    );

    if resolved.api_key.is_none() {
        return Err(io::Error::other(
            "No Gemini API key found. Set GEMINI_API_KEY (or add api_key under [gemini] in ~/.parley/config.toml)",
        ));
    }

    parley::tui::run(resolved)
}
