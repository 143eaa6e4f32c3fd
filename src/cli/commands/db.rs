use clap::Subcommand;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

/// Tables in drop order, children before parents.
const APP_TABLES: &[&str] = &[
    "appointment_responses",
    "invites",
    "notes",
    "appointments",
    "caregiver_elder",
    "refresh_tokens",
    "elders",
    "caregivers",
    "_sqlx_migrations",
];

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Connect and apply pending migrations")]
    Migrate,

    #[command(about = "Drop all application tables and re-run migrations")]
    Reset {
        #[arg(long, help = "Skip the confirmation guard")]
        yes: bool,
    },
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Migrate => {
            // The pool migrates on first connect
            let _pool = DatabaseManager::pool().await?;
            output_success(&output_format, "Migrations applied", None)
        }
        DbCommands::Reset { yes } => {
            if !yes {
                anyhow::bail!("db reset drops every table; re-run with --yes to confirm");
            }

            let pool = DatabaseManager::pool().await?;
            for table in APP_TABLES {
                sqlx::query(&format!("DROP TABLE IF EXISTS {} CASCADE", table))
                    .execute(&pool)
                    .await?;
            }
            DatabaseManager::migrate(&pool).await?;

            tracing::warn!("database reset: all tables dropped and re-migrated");
            output_success(&output_format, "Database reset and re-migrated", None)
        }
    }
}
