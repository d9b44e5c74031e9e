use super::{StoreError, StoreResult};
use crate::models::{ContactMessage, ContactMessageDraft, Subscriber, SubscriberDraft};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

// ====================================================================
// ============================ NEWSLETTER ============================
// ====================================================================

const SUBSCRIBER_COLUMNS: &str = "id, email, active, token, subscribed_at";

fn subscriber_from_row(row: &Row<'_>) -> rusqlite::Result<Subscriber> {
    Ok(Subscriber {
        id: row.get(0)?,
        email: row.get(1)?,
        active: row.get(2)?,
        token: row.get(3)?,
        subscribed_at: row.get(4)?,
    })
}

pub fn read_subscriber_by_email(conn: &Connection, email: &str) -> StoreResult<Option<Subscriber>> {
    let sql = format!("SELECT {} FROM newsletter_subscribers WHERE email = ?1", SUBSCRIBER_COLUMNS);
    Ok(conn.query_row(&sql, [email], subscriber_from_row).optional()?)
}

pub fn read_subscriber_by_token(conn: &Connection, token: &str) -> StoreResult<Option<Subscriber>> {
    let sql = format!("SELECT {} FROM newsletter_subscribers WHERE token = ?1", SUBSCRIBER_COLUMNS);
    Ok(conn.query_row(&sql, [token], subscriber_from_row).optional()?)
}

pub fn read_subscriber(conn: &Connection, id: i64) -> StoreResult<Option<Subscriber>> {
    let sql = format!("SELECT {} FROM newsletter_subscribers WHERE id = ?1", SUBSCRIBER_COLUMNS);
    Ok(conn.query_row(&sql, [id], subscriber_from_row).optional()?)
}

pub fn list_subscribers(conn: &Connection) -> StoreResult<Vec<Subscriber>> {
    let sql = format!(
        "SELECT {} FROM newsletter_subscribers ORDER BY subscribed_at DESC, id DESC",
        SUBSCRIBER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], subscriber_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Inserts a subscriber with a fresh unsubscribe token. A duplicate email
/// surfaces as `StoreError::Conflict`.
pub fn create_subscriber(conn: &Connection, draft: &SubscriberDraft) -> StoreResult<Subscriber> {
    let token = Uuid::new_v4().to_string();
    let now = Utc::now();
    conn.execute(
        "INSERT INTO newsletter_subscribers (email, active, token, subscribed_at) VALUES (?1, ?2, ?3, ?4)",
        params![draft.email, draft.active, token, now],
    )?;
    Ok(Subscriber {
        id: conn.last_insert_rowid(),
        email: draft.email.clone(),
        active: draft.active,
        token,
        subscribed_at: now,
    })
}

pub fn set_subscriber_active(conn: &Connection, id: i64, active: bool) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE newsletter_subscribers SET active = ?1 WHERE id = ?2",
        params![active, id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("subscriber {}", id)));
    }
    Ok(())
}

/// Admin edit. The token is never rewritten.
pub fn update_subscriber(conn: &Connection, id: i64, draft: &SubscriberDraft) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE newsletter_subscribers SET email = ?1, active = ?2 WHERE id = ?3",
        params![draft.email, draft.active, id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("subscriber {}", id)));
    }
    Ok(())
}

// ====================================================================
// ========================= CONTACT MESSAGES =========================
// ====================================================================

const MESSAGE_COLUMNS: &str = "id, name, email, subject, message, read, sent_at";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ContactMessage> {
    Ok(ContactMessage {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        subject: row.get(3)?,
        message: row.get(4)?,
        read: row.get(5)?,
        sent_at: row.get(6)?,
    })
}

pub fn list_contact_messages(conn: &Connection) -> StoreResult<Vec<ContactMessage>> {
    let sql = format!("SELECT {} FROM contact_messages ORDER BY sent_at DESC, id DESC", MESSAGE_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], message_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn read_contact_message(conn: &Connection, id: i64) -> StoreResult<Option<ContactMessage>> {
    let sql = format!("SELECT {} FROM contact_messages WHERE id = ?1", MESSAGE_COLUMNS);
    Ok(conn.query_row(&sql, [id], message_from_row).optional()?)
}

pub fn count_unread_messages(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM contact_messages WHERE read = 0", [], |row| row.get(0))?)
}

pub fn create_contact_message(conn: &Connection, draft: &ContactMessageDraft) -> StoreResult<ContactMessage> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO contact_messages (name, email, subject, message, read, sent_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![draft.name, draft.email, draft.subject, draft.message, draft.read, now],
    )?;
    Ok(ContactMessage {
        id: conn.last_insert_rowid(),
        name: draft.name.clone(),
        email: draft.email.clone(),
        subject: draft.subject.clone(),
        message: draft.message.clone(),
        read: draft.read,
        sent_at: now,
    })
}

pub fn update_contact_message(conn: &Connection, id: i64, draft: &ContactMessageDraft) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE contact_messages SET name = ?1, email = ?2, subject = ?3, message = ?4, read = ?5 WHERE id = ?6",
        params![draft.name, draft.email, draft.subject, draft.message, draft.read, id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("contact message {}", id)));
    }
    Ok(())
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
    fn subscribers_get_distinct_tokens() {
        let conn = conn();
        let a = create_subscriber(&conn, &SubscriberDraft { email: "a@x.io".into(), active: true }).unwrap();
        let b = create_subscriber(&conn, &SubscriberDraft { email: "b@x.io".into(), active: true }).unwrap();
        assert_ne!(a.token, b.token);
        assert!(Uuid::parse_str(&a.token).is_ok());

        let found = read_subscriber_by_token(&conn, &b.token).unwrap().unwrap();
        assert_eq!(found.email, "b@x.io");
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let conn = conn();
        let draft = SubscriberDraft { email: "a@x.io".into(), active: true };
        create_subscriber(&conn, &draft).unwrap();
        assert!(matches!(create_subscriber(&conn, &draft), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn unread_count_follows_the_read_flag() {
        let conn = conn();
        let draft = ContactMessageDraft {
            name: "Ana".into(),
            email: "ana@x.io".into(),
            subject: "Hi".into(),
            message: "Hello".into(),
            read: false,
        };
        let msg = create_contact_message(&conn, &draft).unwrap();
        create_contact_message(&conn, &draft).unwrap();
        assert_eq!(count_unread_messages(&conn).unwrap(), 2);

        update_contact_message(&conn, msg.id, &ContactMessageDraft { read: true, ..draft }).unwrap();
        assert_eq!(count_unread_messages(&conn).unwrap(), 1);
        assert_eq!(list_contact_messages(&conn).unwrap().len(), 2);
    }
}
