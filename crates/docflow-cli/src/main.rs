//! Docflow CLI: run the approval workflow server and inspect its data.
//!
//! Reuses the same core domain logic (docflow-core) and server bootstrap
//! (docflow-server) as the HTTP deployment.

use std::time::Duration;

use clap::{Parser, Subcommand};

use docflow_cli::commands;
use docflow_core::CoreConfig;

/// Docflow CLI: sequential document approval workflow
#[derive(Parser)]
#[command(name = "docflow", version, about = "Docflow CLI: sequential document approval workflow")]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(long, global = true, env = "DOCFLOW_DB_PATH", default_value = "docflow.db")]
    db: String,

    /// HS256 secret shared with the identity service
    #[arg(long, global = true, env = "DOCFLOW_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Expected `iss` claim of bearer tokens
    #[arg(long, global = true, env = "DOCFLOW_JWT_ISSUER", default_value = "docflow")]
    jwt_issuer: String,

    /// How long a request waits for a busy document, in milliseconds
    #[arg(long, global = true, env = "DOCFLOW_LOCK_TIMEOUT_MS", default_value_t = 5000)]
    lock_timeout_ms: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn core_config(&self) -> CoreConfig {
        CoreConfig {
            jwt_secret: self.jwt_secret.clone().unwrap_or_default(),
            jwt_issuer: self.jwt_issuer.clone(),
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Docflow HTTP server
    Server {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3210)]
        port: u16,
    },

    /// Inspect documents
    Document {
        #[command(subcommand)]
        action: DocumentAction,
    },

    /// Manage principals and their tokens
    Principal {
        #[command(subcommand)]
        action: PrincipalAction,
    },
}

#[derive(Subcommand)]
enum DocumentAction {
    /// List documents, newest first
    List,
    /// Show a document with its approval records
    Show {
        #[arg(long)]
        id: String,
    },
    /// Show workflow progress of a document
    Status {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum PrincipalAction {
    /// Create or replace a principal
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: Option<String>,
        /// Group membership (repeatable), e.g. FillerGroup1 or ApproverGroup
        #[arg(long = "group")]
        groups: Vec<String>,
    },
    /// Add a principal to a group
    Join {
        #[arg(long)]
        id: String,
        #[arg(long)]
        group: String,
    },
    /// Show a principal and its resolved role
    Show {
        #[arg(long)]
        id: String,
    },
    /// Sign a bearer token for a principal (requires the JWT secret)
    Token {
        #[arg(long)]
        id: String,
        /// Token lifetime in hours
        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docflow_core=info,docflow_server=info,tower_http=info".into()),
        )
        .init();

    let core = cli.core_config();

    let result = match cli.command {
        Some(Commands::Server { host, port }) => {
            commands::server::run(host, port, cli.db, core).await
        }

        Some(Commands::Document { action }) => {
            let state = commands::init_state(&cli.db, &core).await;
            match action {
                DocumentAction::List => commands::document::list(&state).await,
                DocumentAction::Show { id } => commands::document::show(&state, &id).await,
                DocumentAction::Status { id } => commands::document::status(&state, &id).await,
            }
            .map(|value| commands::print_json(&value))
        }

        Some(Commands::Principal { action }) => {
            if matches!(action, PrincipalAction::Token { .. }) && core.jwt_secret.is_empty() {
                eprintln!("Error: --jwt-secret (or DOCFLOW_JWT_SECRET) is required to sign tokens");
                std::process::exit(1);
            }
            let state = commands::init_state(&cli.db, &core).await;
            match action {
                PrincipalAction::Add {
                    id,
                    username,
                    email,
                    groups,
                } => commands::principal::add(&state, &id, &username, email.as_deref(), groups).await,
                PrincipalAction::Join { id, group } => {
                    commands::principal::join(&state, &id, &group).await
                }
                PrincipalAction::Show { id } => commands::principal::show(&state, &id).await,
                PrincipalAction::Token { id, ttl_hours } => {
                    commands::principal::token(&state, &id, ttl_hours).await
                }
            }
            .map(|value| commands::print_json(&value))
        }

        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
