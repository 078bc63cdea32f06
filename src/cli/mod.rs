use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "filebot")]
#[command(about = "Chat front-end that finds files by extension and moves them into folders")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base directory for searches (defaults to config, then the current directory)
    #[arg(long, global = true)]
    pub dir: Option<String>,

    /// Override default model from config
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Manage filebot configuration")]
    Config {
        #[command(subcommand)]
        config_command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration with defaults")]
    Init,
    #[command(about = "Display current configuration")]
    Get,
    #[command(about = "Set a configuration value")]
    Set {
        #[arg(help = "Configuration key (e.g., 'api.model')")]
        key: String,
        #[arg(help = "Configuration value")]
        value: String,
    },
    #[command(about = "Validate current configuration")]
    Validate,
}
