mod admin;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "storefront-cli")]
#[command(about = "Storefront operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Upsert email templates from a YAML file
    SeedTemplates {
        /// Templates file to load
        #[arg(
            long,
            env = "STOREFRONT_TEMPLATES_PATH",
            default_value = "./config/email_templates.yaml"
        )]
        path: PathBuf,
    },
    /// Give the admin role to the member registered with this email
    GrantAdmin {
        /// Email address of an existing member profile
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let log_level = std::env::var("STOREFRONT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    let cli = Cli::parse();

    // Only DATABASE_URL is needed here; the server's auth settings are not.
    let pool = storefront_db::connect_pool_from_env().await?;

    match cli.command {
        Commands::Migrate => admin::run_migrate(&pool).await?,
        Commands::SeedTemplates { path } => admin::run_seed_templates(&pool, &path).await?,
        Commands::GrantAdmin { email } => admin::run_grant_admin(&pool, &email).await?,
    }

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests;
