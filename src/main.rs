use clap::Parser;
use filebot_cli::cli::{Cli, Commands, ConfigCommand};
use filebot_cli::config::{Config, ConfigManager};
use filebot_cli::engine::FileBotEngine;
use filebot_cli::terminal;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is normal; variables may come from the shell.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,filebot_cli=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Some(Commands::Config { config_command }) => {
            init_logging(cli.verbose);
            run_config_command(config_command)
        }
        None => start_chat(cli).await,
    }
}

fn run_config_command(config_command: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match config_command {
        ConfigCommand::Init => ConfigManager::init_config(),
        ConfigCommand::Get => {
            let config = ConfigManager::load_config()?;
            let toml_string = toml::to_string_pretty(&config.redacted())?;
            println!("Current configuration:\n{}", toml_string);
            Ok(())
        }
        ConfigCommand::Set { key, value } => ConfigManager::set_config_value(&key, &value),
        ConfigCommand::Validate => ConfigManager::validate_config(),
    }
}

async fn start_chat(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ConfigManager::load_config()?;
    if let Some(model) = cli.model {
        config.api.model = model;
    }
    if cli.verbose {
        config.preferences.verbose = true;
    }
    init_logging(config.preferences.verbose);

    // Fatal before the loop starts; nothing can be interpreted without it.
    config.require_api_key()?;

    let base_dir = base_directory(cli.dir, &config)?;
    let mut engine = FileBotEngine::new(&config, base_dir)?;

    print_banner(&engine);

    let mut input = terminal::stdin_source();
    let mut stdout = io::stdout();
    engine.run(input.as_mut(), &mut stdout).await?;

    log::debug!("session {} finished", engine.session_id);
    Ok(())
}

fn base_directory(cli_dir: Option<String>, config: &Config) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = cli_dir
        .or_else(|| config.preferences.default_directory.clone())
        .unwrap_or_else(|| ".".to_string());

    fs::canonicalize(&dir).map_err(|e| format!("Base directory '{}' is not usable: {}", dir, e).into())
}

fn print_banner(engine: &FileBotEngine) {
    println!("---------------------------------------------------------");
    println!("🤖 File robot ready (model: {})", engine.model());
    println!("📁 Base directory: {}", engine.base_dir().display());
    println!("I can find files by extension and move them into folders.");
    println!("Example commands:");
    println!(" - 'Find all PDFs in Documents'");
    println!(" - 'Move all text files to a folder named Archive'");
    println!("Type 'exit' to quit.");
    println!("---------------------------------------------------------");
}
