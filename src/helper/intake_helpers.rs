use crate::models::db_operations::intake_db_operations;
use crate::models::db_operations::StoreError;
use crate::models::{ContactMessage, ContactMessageDraft, Subscriber, SubscriberDraft};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_MESSAGE_CHARS: usize = 2000;

pub const MSG_EMAIL_REQUIRED: &str = "Please provide an email address.";
pub const MSG_EMAIL_INVALID: &str = "Please provide a valid email address.";
pub const MSG_ALREADY_SUBSCRIBED: &str = "This email address is already subscribed to the newsletter.";
pub const MSG_SUBSCRIBED: &str = "Thank you for subscribing to the newsletter!";
pub const MSG_REACTIVATED: &str = "Welcome back! Your subscription has been reactivated.";
pub const MSG_FIELDS_REQUIRED: &str = "All fields are required.";
pub const MSG_MESSAGE_TOO_LONG: &str = "The message cannot exceed 2000 characters.";
pub const MSG_CONTACT_SENT: &str = "Your message has been sent. I will get back to you soon.";
pub const MSG_INTERNAL: &str = "An error occurred. Please try again later.";

#[derive(Error, Debug)]
pub enum IntakeError {
    /// Input problem the visitor can fix. The text is shown as is.
    #[error("{0}")]
    Invalid(&'static str),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntakeError {
    pub fn user_message(&self) -> &'static str {
        match self {
            IntakeError::Invalid(msg) => *msg,
            IntakeError::Store(_) => MSG_INTERNAL,
        }
    }
}

#[derive(Debug)]
pub enum SubscribeOutcome {
    Subscribed(Subscriber),
    AlreadySubscribed,
    Reactivated(Subscriber),
}

impl SubscribeOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SubscribeOutcome::Subscribed(_) => MSG_SUBSCRIBED,
            SubscribeOutcome::AlreadySubscribed => MSG_ALREADY_SUBSCRIBED,
            SubscribeOutcome::Reactivated(_) => MSG_REACTIVATED,
        }
    }
}

/// Shallow syntactic check: an `@`, and a `.` in the segment between the
/// first `@` and the next one. Deliverability is not checked.
pub fn validate_email(raw: &str) -> Result<String, IntakeError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(IntakeError::Invalid(MSG_EMAIL_REQUIRED));
    }
    match email.split('@').nth(1) {
        Some(domain) if domain.contains('.') => Ok(email),
        _ => Err(IntakeError::Invalid(MSG_EMAIL_INVALID)),
    }
}

/// absent → new active record; active → no-op; inactive → reactivated with
/// its original token.
pub fn subscribe(conn: &Connection, raw_email: &str) -> Result<SubscribeOutcome, IntakeError> {
    let email = validate_email(raw_email)?;

    if let Some(mut existing) = intake_db_operations::read_subscriber_by_email(conn, &email)? {
        if existing.active {
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }
        intake_db_operations::set_subscriber_active(conn, existing.id, true)?;
        existing.active = true;
        return Ok(SubscribeOutcome::Reactivated(existing));
    }

    match intake_db_operations::create_subscriber(conn, &SubscriberDraft { email, active: true }) {
        Ok(subscriber) => Ok(SubscribeOutcome::Subscribed(subscriber)),
        // Lost a race against a concurrent signup for the same address.
        Err(StoreError::Conflict(_)) => Err(IntakeError::Invalid(MSG_ALREADY_SUBSCRIBED)),
        Err(e) => Err(e.into()),
    }
}

/// Looks a token up without touching the record. Malformed tokens never hit
/// the store.
pub fn find_subscription(conn: &Connection, token: &str) -> Result<Option<Subscriber>, IntakeError> {
    if Uuid::parse_str(token).is_err() {
        return Ok(None);
    }
    Ok(intake_db_operations::read_subscriber_by_token(conn, token)?)
}

/// Deactivates the subscription behind `token`. `None` means the link is
/// invalid. Repeating the call on an inactive record is a no-op.
pub fn unsubscribe(conn: &Connection, token: &str) -> Result<Option<Subscriber>, IntakeError> {
    let Some(mut subscriber) = find_subscription(conn, token)? else {
        return Ok(None);
    };
    if subscriber.active {
        intake_db_operations::set_subscriber_active(conn, subscriber.id, false)?;
        subscriber.active = false;
    }
    Ok(Some(subscriber))
}

/// Contact form fields as submitted. Only surrounding whitespace is removed
/// before storage; templates escape on output.
#[derive(Debug, Default, Clone)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

pub fn validate_contact(submission: &ContactSubmission) -> Result<ContactMessageDraft, IntakeError> {
    let name = submission.name.trim().to_string();
    let subject = submission.subject.trim().to_string();
    let message = submission.message.trim().to_string();
    let raw_email = submission.email.trim();

    if name.is_empty() || raw_email.is_empty() || subject.is_empty() || message.is_empty() {
        return Err(IntakeError::Invalid(MSG_FIELDS_REQUIRED));
    }
    let email = validate_email(raw_email)?;
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(IntakeError::Invalid(MSG_MESSAGE_TOO_LONG));
    }

    Ok(ContactMessageDraft { name, email, subject, message, read: false })
}

pub fn submit_contact(conn: &Connection, submission: &ContactSubmission) -> Result<ContactMessage, IntakeError> {
    let draft = validate_contact(submission)?;
    Ok(intake_db_operations::create_contact_message(conn, &draft)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::content_db_operations::{count_rows, Table};
    use crate::setup::db_setup;
    use rstest::rstest;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_portfolio_db(&mut conn).unwrap();
        conn
    }

    fn submission(message: &str) -> ContactSubmission {
        ContactSubmission {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            subject: "Project".to_string(),
            message: message.to_string(),
        }
    }

    #[rstest]
    #[case("a@b.co", true)]
    #[case("  Mixed@Example.COM ", true)]
    #[case("", false)]
    #[case("no-at-sign.com", false)]
    #[case("a@localhost", false)]
    #[case("@b.co", true)]
    #[case("a@b@c.d", false)]
    #[case("a@b.c@d", true)]
    fn email_validation(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(validate_email(raw).is_ok(), ok);
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(validate_email("  Mixed@Example.COM ").unwrap(), "mixed@example.com");
    }

    #[test]
    fn second_subscribe_reports_already_subscribed() {
        let conn = conn();
        assert!(matches!(subscribe(&conn, "a@b.co").unwrap(), SubscribeOutcome::Subscribed(_)));
        assert!(matches!(subscribe(&conn, "A@B.co").unwrap(), SubscribeOutcome::AlreadySubscribed));
        assert_eq!(count_rows(&conn, Table::NewsletterSubscribers).unwrap(), 1);
    }

    #[test]
    fn resubscribe_reactivates_with_the_same_token() {
        let conn = conn();
        let SubscribeOutcome::Subscribed(original) = subscribe(&conn, "a@b.co").unwrap() else {
            panic!("expected a new subscription");
        };
        unsubscribe(&conn, &original.token).unwrap().unwrap();

        let SubscribeOutcome::Reactivated(again) = subscribe(&conn, "a@b.co").unwrap() else {
            panic!("expected a reactivation");
        };
        assert_eq!(again.id, original.id);
        assert_eq!(again.token, original.token);
        assert!(again.active);
        assert_eq!(count_rows(&conn, Table::NewsletterSubscribers).unwrap(), 1);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let conn = conn();
        let SubscribeOutcome::Subscribed(sub) = subscribe(&conn, "a@b.co").unwrap() else {
            panic!("expected a new subscription");
        };
        assert!(!unsubscribe(&conn, &sub.token).unwrap().unwrap().active);
        assert!(!unsubscribe(&conn, &sub.token).unwrap().unwrap().active);
        let stored = intake_db_operations::read_subscriber(&conn, sub.id).unwrap().unwrap();
        assert!(!stored.active);
    }

    #[test]
    fn unknown_tokens_are_invalid_and_change_nothing() {
        let conn = conn();
        let SubscribeOutcome::Subscribed(sub) = subscribe(&conn, "a@b.co").unwrap() else {
            panic!("expected a new subscription");
        };
        assert!(unsubscribe(&conn, &Uuid::new_v4().to_string()).unwrap().is_none());
        assert!(unsubscribe(&conn, "not-a-token").unwrap().is_none());
        assert!(intake_db_operations::read_subscriber(&conn, sub.id).unwrap().unwrap().active);
    }

    #[test]
    fn contact_requires_every_field() {
        let conn = conn();
        for blank in ["name", "email", "subject", "message"] {
            let mut s = submission("Hello");
            match blank {
                "name" => s.name = "  ".to_string(),
                "email" => s.email = String::new(),
                "subject" => s.subject = String::new(),
                _ => s.message = String::new(),
            }
            let err = submit_contact(&conn, &s).unwrap_err();
            assert_eq!(err.user_message(), MSG_FIELDS_REQUIRED);
        }
        assert_eq!(count_rows(&conn, Table::ContactMessages).unwrap(), 0);
    }

    #[test]
    fn contact_message_length_boundary() {
        let conn = conn();
        let too_long = submit_contact(&conn, &submission(&"a".repeat(MAX_MESSAGE_CHARS + 1))).unwrap_err();
        assert_eq!(too_long.user_message(), MSG_MESSAGE_TOO_LONG);
        assert_eq!(count_rows(&conn, Table::ContactMessages).unwrap(), 0);

        let saved = submit_contact(&conn, &submission(&"a".repeat(MAX_MESSAGE_CHARS))).unwrap();
        assert!(!saved.read);
        assert_eq!(count_rows(&conn, Table::ContactMessages).unwrap(), 1);
    }

    #[test]
    fn contact_text_is_kept_as_submitted() {
        let mut s = submission("  if a<b then swap, else keep  ");
        s.subject = "Compare <Vec> and <HashMap>".to_string();
        let draft = validate_contact(&s).unwrap();
        assert_eq!(draft.message, "if a<b then swap, else keep");
        assert_eq!(draft.subject, "Compare <Vec> and <HashMap>");

        assert_eq!(validate_contact(&submission("<hello>")).unwrap().message, "<hello>");
    }

    #[test]
    fn markup_counts_towards_the_length_limit() {
        let body = format!("<i>{}</i>", "a".repeat(MAX_MESSAGE_CHARS));
        let err = validate_contact(&submission(&body)).unwrap_err();
        assert_eq!(err.user_message(), MSG_MESSAGE_TOO_LONG);
    }

    #[test]
    fn length_limit_counts_characters_not_bytes() {
        assert!(validate_contact(&submission(&"é".repeat(MAX_MESSAGE_CHARS))).is_ok());
    }
}
