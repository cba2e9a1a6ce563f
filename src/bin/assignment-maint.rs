/// Maintenance tasks for the assignment tracker database
/// Run the reconcile sweep periodically (e.g., via cron job: */15 * * * * /app/assignment-maint reconcile)
///
/// Usage: assignment-maint <COMMAND>
///   reconcile [--dry-run]        : Recompute every assignment's base status
///   normalize-statuses           : Rewrite legacy status values
///   stats                        : Print the base status distribution
///   list-users [--role ROLE]     : List users
///   create-admin --email --password [--name]
use clap::{Parser, Subcommand};
use std::sync::Arc;

use assignment_tracker::config::AppConfig;
use assignment_tracker::models::users::entities::UserRole;
use assignment_tracker::models::users::requests::CreateUserRequest;
use assignment_tracker::storage::{Storage, create_storage};
use assignment_tracker::utils::password::hash_password;
use assignment_tracker::utils::validate::{validate_email, validate_password};

#[derive(Parser)]
#[command(
    name = "assignment-maint",
    about = "Maintenance tasks for the assignment tracker database"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recompute base statuses after due dates pass
    Reconcile {
        /// Only print what would change
        #[arg(long)]
        dry_run: bool,
    },
    /// Map legacy status values onto the current set
    NormalizeStatuses,
    /// Print assignment counts per base status
    Stats,
    /// List users, optionally filtered by role
    ListUsers {
        #[arg(long)]
        role: Option<String>,
    },
    /// Create an administrator (skipped when the email already exists)
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "Administrator")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = AppConfig::load()?;
    let storage = create_storage(&config).await?;

    match args.command {
        Command::Reconcile { dry_run } => reconcile(&storage, dry_run).await?,
        Command::NormalizeStatuses => normalize_statuses(&storage).await?,
        Command::Stats => print_stats(&storage).await?,
        Command::ListUsers { role } => list_users(&storage, role).await?,
        Command::CreateAdmin {
            email,
            password,
            name,
        } => create_admin(&storage, &config, email, password, name).await?,
    }

    Ok(())
}

async fn reconcile(
    storage: &Arc<dyn Storage>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting reconcile sweep (dry run: {})...", dry_run);

    let outcomes = storage
        .reconcile_all_assignments(chrono::Utc::now(), dry_run)
        .await?;
    let changed: Vec<_> = outcomes.iter().filter(|o| o.changed()).collect();

    for outcome in &changed {
        println!(
            "assignment {}: {} -> {}",
            outcome.assignment_id, outcome.previous, outcome.current
        );
    }

    tracing::info!(
        "Reconcile sweep completed: {} assignments checked, {} {}",
        outcomes.len(),
        changed.len(),
        if dry_run { "would change" } else { "changed" }
    );
    Ok(())
}

async fn normalize_statuses(storage: &Arc<dyn Storage>) -> Result<(), Box<dyn std::error::Error>> {
    let fixes = storage.normalize_legacy_statuses().await?;
    if fixes.is_empty() {
        tracing::info!("No legacy status values found");
        return Ok(());
    }

    for fix in &fixes {
        println!("{} -> {}: {} rows", fix.from, fix.to, fix.rows);
    }
    tracing::info!("Normalized {} legacy status values", fixes.len());
    Ok(())
}

async fn print_stats(storage: &Arc<dyn Storage>) -> Result<(), Box<dyn std::error::Error>> {
    let total = storage.count_assignments().await?;
    println!("total: {total}");
    for entry in storage.count_assignments_by_status().await? {
        println!("{}: {}", entry.status, entry.count);
    }
    Ok(())
}

async fn list_users(
    storage: &Arc<dyn Storage>,
    role: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let role = role
        .map(|r| r.parse::<UserRole>())
        .transpose()
        .map_err(|e| format!("Invalid role: {e}"))?;

    for user in storage.list_users_by_role(role).await? {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            user.id, user.email, user.full_name, user.role, user.status
        );
    }
    Ok(())
}

async fn create_admin(
    storage: &Arc<dyn Storage>,
    config: &AppConfig,
    email: String,
    password: String,
    name: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let email = email.trim().to_lowercase();
    validate_email(&email)?;
    validate_password(&password)?;

    if let Some(existing) = storage.get_user_by_email(&email).await? {
        tracing::info!(
            "User {} already exists (ID: {}), skipping",
            existing.email,
            existing.id
        );
        return Ok(());
    }

    let password_hash = hash_password(&password, &config.argon2)?;
    let user = storage
        .create_user(CreateUserRequest {
            email,
            password: password_hash,
            full_name: name,
            role: UserRole::Admin,
        })
        .await?;

    tracing::info!("Admin {} created (ID: {})", user.email, user.id);
    Ok(())
}
