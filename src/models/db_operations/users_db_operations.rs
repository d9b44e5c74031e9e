use crate::models::AdminUser;
use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

fn admin_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AdminUser> {
    Ok(AdminUser {
        id: row.get(0)?,
        username: row.get(1)?,
        is_active: row.get(2)?,
        last_login_time: row.get(3)?,
    })
}

pub fn create_user(conn: &Connection, username: &str, password: &str) -> Result<(), RusqliteError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "INSERT INTO admin_users (username, password_hash) VALUES (?1, ?2)",
        params![username, hashed_password],
    )?;
    Ok(())
}

pub fn read_all_users(conn: &Connection) -> Result<Vec<AdminUser>, RusqliteError> {
    let mut stmt =
        conn.prepare("SELECT id, username, is_active, last_login_time FROM admin_users ORDER BY id")?;
    let users = stmt.query_map([], admin_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn read_user_by_username(conn: &Connection, username: &str) -> Result<Option<AdminUser>, RusqliteError> {
    conn.query_row(
        "SELECT id, username, is_active, last_login_time FROM admin_users WHERE username = ?1",
        [username],
        admin_from_row,
    )
    .optional()
}

/// Returns the username when the password matches an active account.
pub fn verify_credentials(conn: &Connection, username: &str, password: &str) -> Option<String> {
    let res: rusqlite::Result<(String, bool)> = conn.query_row(
        "SELECT password_hash, is_active FROM admin_users WHERE username = ?1",
        [username],
        |row| Ok((row.get(0)?, row.get(1)?)),
    );

    if let Ok((hash, is_active)) = res {
        if is_active && verify(password, &hash).unwrap_or(false) {
            return Some(username.to_string());
        }
    }
    None
}

pub fn update_last_login_time(conn: &Connection, username: &str) -> Result<(), RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE admin_users SET last_login_time = ?1 WHERE username = ?2",
        params![now, username],
    )?;
    Ok(())
}

/// Returns the number of rows touched, 0 when the user does not exist.
pub fn change_password(conn: &Connection, username: &str, new_password: &str) -> Result<usize, RusqliteError> {
    let hashed_password = hash(new_password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "UPDATE admin_users SET password_hash = ?1 WHERE username = ?2",
        params![hashed_password, username],
    )
}

pub fn change_username(conn: &Connection, old_username: &str, new_username: &str) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE admin_users SET username = ?1 WHERE username = ?2",
        params![new_username, old_username],
    )
}

pub fn set_active(conn: &Connection, username: &str, active: bool) -> Result<usize, RusqliteError> {
    conn.execute(
        "UPDATE admin_users SET is_active = ?1 WHERE username = ?2",
        params![active, username],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_portfolio_db(&mut conn).unwrap();
        conn
    }

    #[test]
    fn credentials_are_checked_against_the_hash() {
        let conn = conn();
        create_user(&conn, "admin", "s3cret").unwrap();

        assert_eq!(verify_credentials(&conn, "admin", "s3cret").as_deref(), Some("admin"));
        assert_eq!(verify_credentials(&conn, "admin", "wrong"), None);
        assert_eq!(verify_credentials(&conn, "nobody", "s3cret"), None);
    }

    #[test]
    fn inactive_accounts_cannot_log_in() {
        let conn = conn();
        create_user(&conn, "admin", "s3cret").unwrap();
        assert_eq!(set_active(&conn, "admin", false).unwrap(), 1);
        assert_eq!(verify_credentials(&conn, "admin", "s3cret"), None);
    }

    #[test]
    fn rename_and_password_change() {
        let conn = conn();
        create_user(&conn, "admin", "old").unwrap();
        assert_eq!(change_username(&conn, "admin", "root").unwrap(), 1);
        assert_eq!(change_password(&conn, "root", "new").unwrap(), 1);
        assert_eq!(change_password(&conn, "admin", "new").unwrap(), 0);

        assert!(verify_credentials(&conn, "root", "new").is_some());
        update_last_login_time(&conn, "root").unwrap();
        let user = read_user_by_username(&conn, "root").unwrap().unwrap();
        assert!(user.last_login_time.is_some());
        assert_eq!(read_all_users(&conn).unwrap().len(), 1);
    }
}
