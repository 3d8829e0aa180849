use clap::{Parser, Subcommand};
use portal_lib::auth::Role;
use portal_lib::config::Config;
use portal_lib::models::NewUser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Office portal: public site API and content dashboard
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Config file path (default: $PORTAL_CONFIG, then portal.toml)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    #[command(visible_alias = "s")]
    Serve {
        /// Address to listen on, overriding `server.bind`
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Create a dashboard account
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// ADMIN, EDITOR or USER
        #[arg(long, default_value = "ADMIN")]
        role: Role,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("portal=info,portal_lib=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = Config::resolve_path(cli.config);
    let mut config = Config::load(&config_path)?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            portal_lib::run(config).await
        }
        Commands::CreateUser {
            email,
            name,
            password,
            role,
        } => {
            let user = portal_lib::create_user(
                &config,
                &NewUser {
                    name,
                    email,
                    password,
                    role,
                },
            )?;
            tracing::info!(user = %user.id, email = %user.email, role = %user.role, "account created");
            Ok(())
        }
    }
}
