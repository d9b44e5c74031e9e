use clap::{Parser, Subcommand};
use portfolio_backend::config::Config;
use portfolio_backend::models::db_operations::users_db_operations;
use portfolio_backend::setup::db_setup::{self, SetupError};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "Initial setup and admin accounts for the portfolio site.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Creates the schema and seeds the default site settings. Safe to re-run.
    Setup,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
    ChangeUsername {
        #[arg(long)]
        old_username: String,
        #[arg(long)]
        new_username: String,
    },
    Activate {
        #[arg(long)]
        username: String,
    },
    Deactivate {
        #[arg(long)]
        username: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file).expect("FATAL: Failed to load or parse configuration.");
    let db_path = config.portfolio_db_path();

    match &cli.command {
        Commands::Db { action: DbAction::Setup } => {
            println!("\nSetting up portfolio database at '{}'...", db_path.display());
            match setup_database(&db_path) {
                Ok(()) => println!("✅ Portfolio database setup completed successfully."),
                Err(e) => eprintln!("❌ Error setting up portfolio database: {}", e),
            }
        }
        Commands::Admin { action } => {
            let Some(conn) = open_existing(&db_path) else {
                return;
            };
            match action {
                AdminAction::Create { username, password } => create_admin_user(&conn, username, password),
                AdminAction::List => list_admin_users(&conn),
                AdminAction::ChangePassword { username, new_password } => {
                    change_admin_password(&conn, username, new_password)
                }
                AdminAction::ChangeUsername { old_username, new_username } => {
                    change_admin_username(&conn, old_username, new_username)
                }
                AdminAction::Activate { username } => set_admin_active(&conn, username, true),
                AdminAction::Deactivate { username } => set_admin_active(&conn, username, false),
            }
        }
    }
}

fn setup_database(db_path: &Path) -> Result<(), SetupError> {
    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir)?;
    }
    let mut conn = Connection::open(db_path)?;
    db_setup::setup_portfolio_db(&mut conn)
}

fn open_existing(db_path: &Path) -> Option<Connection> {
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Portfolio database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    match Connection::open(db_path) {
        Ok(conn) => Some(conn),
        Err(e) => {
            eprintln!("❌ Error opening portfolio database: {}", e);
            None
        }
    }
}

fn create_admin_user(conn: &Connection, username: &str, password: &str) {
    if let Ok(Some(_)) = users_db_operations::read_user_by_username(conn, username) {
        eprintln!("❌ Error: An admin user named '{}' already exists.", username);
        return;
    }
    match users_db_operations::create_user(conn, username, password) {
        Ok(()) => println!("✅ Admin user '{}' created successfully.", username),
        Err(e) => eprintln!("❌ Error creating admin user: {}. It might be because the username already exists.", e),
    }
}

fn list_admin_users(conn: &Connection) {
    match users_db_operations::read_all_users(conn) {
        Ok(users) => {
            println!("Listing Admin Users:");
            for user in users {
                let state = if user.is_active { "active" } else { "inactive" };
                let last_login = user.last_login_time.as_deref().unwrap_or("never");
                println!("- {} ({}, last login: {})", user.username, state, last_login);
            }
        }
        Err(e) => eprintln!("❌ Error fetching admins: {}", e),
    }
}

fn change_admin_password(conn: &Connection, username: &str, new_password: &str) {
    match users_db_operations::change_password(conn, username, new_password) {
        Ok(0) => eprintln!("❌ Error: No admin user named '{}' found.", username),
        Ok(_) => println!("✅ Password for admin user '{}' changed successfully.", username),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}

fn change_admin_username(conn: &Connection, old_username: &str, new_username: &str) {
    match users_db_operations::change_username(conn, old_username, new_username) {
        Ok(0) => eprintln!("❌ Error: No admin user named '{}' found.", old_username),
        Ok(_) => println!("✅ Admin username changed from '{}' to '{}'.", old_username, new_username),
        Err(e) => eprintln!("❌ Error changing username: {}. The new username might already be taken.", e),
    }
}

fn set_admin_active(conn: &Connection, username: &str, active: bool) {
    let verb = if active { "activated" } else { "deactivated" };
    match users_db_operations::set_active(conn, username, active) {
        Ok(0) => eprintln!("❌ Error: No admin user named '{}' found.", username),
        Ok(_) => println!("✅ Admin user '{}' {}.", username, verb),
        Err(e) => eprintln!("❌ Error updating admin user: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_creates_nested_directories_and_can_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("db").join("portfolio.db");

        setup_database(&db_path).unwrap();
        setup_database(&db_path).unwrap();

        let conn = open_existing(&db_path).expect("database exists");
        let settings: i64 = conn
            .query_row("SELECT COUNT(*) FROM site_settings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(settings, 1);
    }

    #[test]
    fn missing_database_is_not_created_by_admin_commands() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("portfolio.db");
        assert!(open_existing(&db_path).is_none());
        assert!(!db_path.exists());
    }

    #[test]
    fn admin_accounts_round_trip_through_the_cli_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("portfolio.db");
        setup_database(&db_path).unwrap();
        let conn = open_existing(&db_path).unwrap();

        create_admin_user(&conn, "admin", "s3cret");
        change_admin_username(&conn, "admin", "owner");
        set_admin_active(&conn, "owner", false);

        let users = users_db_operations::read_all_users(&conn).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "owner");
        assert!(!users[0].is_active);
    }
}
