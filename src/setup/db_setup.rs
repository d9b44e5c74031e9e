use crate::models::{NewsPlatform, ProjectStatus, SiteSettingsDraft, SocialPlatform};
use chrono::Utc;
use rusqlite::{params, Connection, Result as RusqliteResult, Transaction};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders `'a', 'b', 'c'` for a CHECK constraint over stored choice codes.
fn sql_choice_list(codes: impl Iterator<Item = &'static str>) -> String {
    codes.map(|c| format!("'{}'", c)).collect::<Vec<_>>().join(", ")
}

pub fn setup_portfolio_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;

    println!("- Creating 'admin_users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS admin_users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_login_time TEXT
        )",
        [],
    )?;

    println!("- Creating 'profiles' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            handle TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            bio TEXT NOT NULL,
            photo TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'projects' table...");
    tx.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                short_description TEXT NOT NULL,
                description TEXT NOT NULL,
                image TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'en_cours' CHECK(status IN ({})),
                technologies TEXT NOT NULL DEFAULT '[]',
                display_order INTEGER NOT NULL DEFAULT 0,
                featured INTEGER NOT NULL DEFAULT 0,
                demo_url TEXT,
                repo_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            sql_choice_list(ProjectStatus::ALL.iter().map(|s| s.as_str()))
        ),
        [],
    )?;

    println!("- Creating 'skills' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS skills (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            icon_class TEXT NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'news' table...");
    tx.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS news (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                image TEXT NOT NULL DEFAULT '',
                link TEXT NOT NULL,
                platform TEXT NOT NULL CHECK(platform IN ({})),
                published_at TEXT NOT NULL,
                display_order INTEGER NOT NULL DEFAULT 0
            )",
            sql_choice_list(NewsPlatform::ALL.iter().map(|p| p.as_str()))
        ),
        [],
    )?;

    println!("- Creating 'partners' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS partners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            logo TEXT NOT NULL DEFAULT '',
            site_url TEXT,
            description TEXT NOT NULL DEFAULT '',
            display_order INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'gallery_items' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS gallery_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            short_description TEXT NOT NULL,
            content TEXT NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'feed_items' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS feed_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image TEXT NOT NULL DEFAULT '',
            alt_text TEXT NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'newsletter_subscribers' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS newsletter_subscribers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            token TEXT NOT NULL UNIQUE,
            subscribed_at TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'contact_messages' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS contact_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            subject TEXT NOT NULL,
            message TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            sent_at TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'social_links' table...");
    tx.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS social_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                platform TEXT NOT NULL UNIQUE CHECK(platform IN ({})),
                url TEXT NOT NULL,
                display_name TEXT NOT NULL,
                display_order INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                sidebar_contact INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            sql_choice_list(SocialPlatform::ALL.iter().map(|p| p.as_str()))
        ),
        [],
    )?;

    // The constant `singleton` column makes a second row impossible at the
    // storage level, whatever path the insert comes from.
    println!("- Creating 'contact_info' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS contact_info (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            singleton INTEGER NOT NULL DEFAULT 1 UNIQUE CHECK(singleton = 1),
            phone TEXT NOT NULL,
            email TEXT NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            whatsapp TEXT NOT NULL DEFAULT '',
            linkedin_url TEXT NOT NULL DEFAULT '',
            show_sidebar INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'site_settings' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS site_settings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_name TEXT NOT NULL,
            description TEXT NOT NULL,
            logo TEXT NOT NULL DEFAULT '',
            favicon TEXT NOT NULL DEFAULT '',
            primary_color TEXT NOT NULL,
            analytics_id TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    seed_initial_settings(&tx)?;

    tx.commit()?;
    Ok(())
}

fn seed_initial_settings(tx: &Transaction) -> RusqliteResult<()> {
    let existing: i64 = tx.query_row("SELECT COUNT(*) FROM site_settings", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(());
    }

    println!("- Seeding initial site settings...");
    let defaults = SiteSettingsDraft::default();
    let now = Utc::now();
    tx.execute(
        "INSERT INTO site_settings (site_name, description, logo, favicon, primary_color, analytics_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            defaults.site_name,
            defaults.description,
            defaults.logo,
            defaults.favicon,
            defaults.primary_color,
            defaults.analytics_id,
            now
        ],
    )?;
    println!("  > Site name set to: {}", defaults.site_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_is_idempotent_and_seeds_settings_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = Connection::open(dir.path().join("portfolio.db")).unwrap();

        setup_portfolio_db(&mut conn).unwrap();
        setup_portfolio_db(&mut conn).unwrap();

        let settings: i64 = conn
            .query_row("SELECT COUNT(*) FROM site_settings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(settings, 1);
    }

    #[test]
    fn contact_info_table_rejects_a_second_row() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_portfolio_db(&mut conn).unwrap();
        let now = Utc::now();
        let insert = "INSERT INTO contact_info (phone, email, created_at, updated_at) VALUES ('1', 'a@b.c', ?1, ?1)";

        conn.execute(insert, params![now]).unwrap();
        assert!(conn.execute(insert, params![now]).is_err());
    }

    #[test]
    fn unknown_status_codes_are_rejected_by_the_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_portfolio_db(&mut conn).unwrap();
        let now = Utc::now();
        let res = conn.execute(
            "INSERT INTO projects (title, slug, short_description, description, status, created_at, updated_at)
             VALUES ('t', 't', 's', 'd', 'archived', ?1, ?1)",
            params![now],
        );
        assert!(res.is_err());
    }
}
