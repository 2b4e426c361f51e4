use clap::{Parser, Subcommand};
use nook_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "nook", version, about = "Nook focus timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Timer and goal settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Task import from Todoist
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Session journal
    Journal {
        #[command(subcommand)]
        action: commands::journal::JournalAction,
    },
    /// Background and playlist preferences
    Media {
        #[command(subcommand)]
        action: commands::media::MediaAction,
    },
}

/// Logs go to stderr so JSON on stdout stays parseable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("NOOK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(Config::load_or_default().log.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Sync { action } => commands::sync::run(action),
        Commands::Journal { action } => commands::journal::run(action),
        Commands::Media { action } => commands::media::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
