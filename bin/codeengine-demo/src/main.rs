use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod kubeconfig_flow;
mod project_flow;
mod settings;

use settings::DemoSettings;

#[derive(Debug, Parser)]
#[command(name = "codeengine-demo")]
#[command(version)]
#[command(about = "Exercise the Code Engine kubeconfig and project APIs")]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Fetch the kubeconfig of CE_PROJECT_ID and list its config maps (default)
    Kubeconfig {
        /// Use the deprecated refresh-token endpoint
        #[arg(long)]
        legacy: bool,
    },
    /// Create a project, wait for it, use its kubeconfig, then delete it
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let settings = DemoSettings::from_env()?;
    info!("Using Code Engine API at {}", settings.api_host());

    match cli.command.unwrap_or(Command::Kubeconfig { legacy: false }) {
        Command::Kubeconfig { legacy } => kubeconfig_flow::run(&settings, legacy).await,
        Command::Project => project_flow::run(&settings).await,
    }
}
