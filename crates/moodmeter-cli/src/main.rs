use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "warn,moodmeter_core=info,moodmeter=info";

#[derive(Parser)]
#[command(name = "moodmeter", version, about = "Workload mood, flow and usage dashboard")]
struct Cli {
    /// Shared secret for mutations (also read from MOODMETER_TOKEN)
    #[arg(long, global = true, env = "MOODMETER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Priority task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Tag catalog management
    Tag {
        #[command(subcommand)]
        action: commands::tag::TagAction,
    },
    /// Flow tasks and the flow meter
    Flow {
        #[command(subcommand)]
        action: commands::flow::FlowAction,
    },
    /// Current load and mood
    Mood(commands::mood::MoodArgs),
    /// Usage totals and the animated counter
    Usage {
        #[command(subcommand)]
        action: commands::usage::UsageAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let token = cli.token.as_deref();
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action, token),
        Commands::Tag { action } => commands::tag::run(action, token),
        Commands::Flow { action } => commands::flow::run(action, token),
        Commands::Mood(args) => commands::mood::run(args, token),
        Commands::Usage { action } => commands::usage::run(action, token),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
