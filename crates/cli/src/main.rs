//! Product Catalog CLI - Database migrations and identity management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! catalog-cli migrate
//!
//! # Create a user (email doubles as user name)
//! catalog-cli user create -e admin@example.com -p secret
//!
//! # Create a role and put a user in it
//! catalog-cli role create Admin
//! catalog-cli role assign -e admin@example.com -r Admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Register a user
//! - `role create` - Create a role
//! - `role assign` - Add a user to a role
//!
//! The JSON API only lets staff manage roles, so the first `Admin`,
//! `Moderator` or `Employee` is created here.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(author, version, about = "Product catalog CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a new user
    Create {
        /// Email address, also used as the user name
        #[arg(short, long)]
        email: String,

        /// Password (at least 4 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// Create a new role
    Create {
        /// Role name (`Admin`, `Moderator` and `Employee` may manage products)
        name: String,
    },
    /// Add an existing user to an existing role
    Assign {
        /// Email address of the user
        #[arg(short, long)]
        email: String,

        /// Role name
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let pool = commands::connect().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&pool).await?,
        Commands::User { action } => match action {
            UserAction::Create { email, password } => {
                commands::identity::create_user(&pool, &email, &password).await?;
            }
        },
        Commands::Role { action } => match action {
            RoleAction::Create { name } => {
                commands::identity::create_role(&pool, &name).await?;
            }
            RoleAction::Assign { email, role } => {
                commands::identity::assign_role(&pool, &email, &role).await?;
            }
        },
    }
    Ok(())
}
