use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod core;
mod daemon;
mod providers;
mod ui;

#[derive(Parser)]
#[command(name = "balance-bar")]
#[command(author, version, about = "Always-on balance monitor for EarnApp and Honeygain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the polling daemon with the terminal display
    Daemon {
        /// Emit logs as JSON lines
        #[arg(long)]
        json_logs: bool,
    },

    /// Fetch current balances once
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Only query this service (earnapp, honeygain)
        #[arg(long)]
        service: Option<String>,
    },

    /// Trigger daemon refresh via D-Bus
    Refresh,

    /// Enable a service in the config file
    Enable {
        /// Service name (earnapp, honeygain)
        service: String,
    },

    /// Disable a service in the config file
    Disable {
        /// Service name (earnapp, honeygain)
        service: String,
    },

    /// Set the Honeygain refresh interval
    Interval {
        /// Minutes between refreshes
        minutes: u64,
    },

    /// Save credentials for both services
    Credentials {
        /// EarnApp dashboard cookie header value
        #[arg(long)]
        earnapp_cookie: String,

        /// Honeygain account email
        #[arg(long)]
        honeygain_email: String,

        /// Honeygain account password
        #[arg(long)]
        honeygain_password: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon { json_logs } => {
            init_logging(json_logs);
            daemon::run().await
        }
        Commands::Status { json, service } => {
            init_logging(false);
            cli::status::run(json, service).await
        }
        Commands::Refresh => {
            init_logging(false);
            cli::refresh::run().await
        }
        Commands::Enable { service } => {
            init_logging(false);
            cli::configure::set_enabled(&service, true)
        }
        Commands::Disable { service } => {
            init_logging(false);
            cli::configure::set_enabled(&service, false)
        }
        Commands::Interval { minutes } => {
            init_logging(false);
            cli::configure::set_interval(minutes)
        }
        Commands::Credentials {
            earnapp_cookie,
            honeygain_email,
            honeygain_password,
        } => {
            init_logging(false);
            cli::configure::set_credentials(cli::configure::CredentialsInput {
                earnapp_cookie,
                honeygain_email,
                honeygain_password,
            })
            .await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
