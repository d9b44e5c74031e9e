use crate::models::{ContactMessage, Subscriber};
use actix_web::{rt, web};
use lettre::message::{header::ContentType, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Anything able to deliver a plain-text email. Implementations block.
pub trait EmailBackend: Send + Sync {
    fn send(&self, from: &str, email: &OutgoingEmail) -> Result<(), MailError>;
}

pub struct SmtpBackend {
    transport: SmtpTransport,
}

impl SmtpBackend {
    pub fn new(host: &str, port: u16, credentials: Option<(String, String)>) -> Result<Self, MailError> {
        let mut builder = SmtpTransport::starttls_relay(host)?.port(port);
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }
        Ok(Self { transport: builder.build() })
    }
}

impl EmailBackend for SmtpBackend {
    fn send(&self, from: &str, email: &OutgoingEmail) -> Result<(), MailError> {
        let mut builder = Message::builder()
            .from(from.parse::<Mailbox>()?)
            .to(email.to.parse::<Mailbox>()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(reply_to.parse::<Mailbox>()?);
        }
        let message = builder.body(email.body.clone())?;
        self.transport.send(&message)?;
        Ok(())
    }
}

/// Development backend: writes the message to the log instead of sending it.
pub struct ConsoleBackend;

impl EmailBackend for ConsoleBackend {
    fn send(&self, from: &str, email: &OutgoingEmail) -> Result<(), MailError> {
        log::info!(
            "[console mail] from: {} | to: {} | subject: {}\n{}",
            from,
            email.to,
            email.subject,
            email.body
        );
        Ok(())
    }
}

/// Keeps every message in memory. Used by tests.
#[derive(Default)]
pub struct MemoryBackend {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryBackend {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl EmailBackend for MemoryBackend {
    fn send(&self, _from: &str, email: &OutgoingEmail) -> Result<(), MailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct Mailer {
    backend: Arc<dyn EmailBackend>,
    from_email: String,
    notify_to: String,
    site_url: String,
}

impl Mailer {
    pub fn new(backend: Arc<dyn EmailBackend>, from_email: &str, notify_to: &str, site_url: &str) -> Self {
        Self {
            backend,
            from_email: from_email.to_string(),
            notify_to: notify_to.to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    /// Sends in the background. The caller never waits and never sees the
    /// outcome; failures end up in the log.
    pub fn dispatch(&self, email: OutgoingEmail) {
        let backend = Arc::clone(&self.backend);
        let from = self.from_email.clone();
        rt::spawn(async move {
            let recipient = email.to.clone();
            match web::block(move || backend.send(&from, &email)).await {
                Ok(Ok(())) => log::info!("Email sent to {}", recipient),
                Ok(Err(e)) => log::warn!("Failed to send email to {}: {}", recipient, e),
                Err(e) => log::warn!("Mail task for {} was cancelled: {}", recipient, e),
            }
        });
    }

    pub fn unsubscribe_url(&self, token: &str) -> String {
        format!("{}/newsletter/unsubscribe/{}/", self.site_url, token)
    }

    pub fn welcome_email(&self, subscriber: &Subscriber) -> OutgoingEmail {
        OutgoingEmail {
            to: subscriber.email.clone(),
            reply_to: None,
            subject: "Welcome to the newsletter".to_string(),
            body: format!(
                "Thank you for subscribing.\n\nYou can unsubscribe at any time:\n{}\n",
                self.unsubscribe_url(&subscriber.token)
            ),
        }
    }

    pub fn contact_notification(&self, message: &ContactMessage) -> OutgoingEmail {
        OutgoingEmail {
            to: self.notify_to.clone(),
            reply_to: Some(message.email.clone()),
            subject: format!("New contact message: {}", message.subject),
            body: format!(
                "From: {} <{}>\nSubject: {}\n\n{}\n",
                message.name, message.email, message.subject, message.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn mailer(backend: Arc<MemoryBackend>) -> Mailer {
        Mailer::new(backend, "site@example.com", "owner@example.com", "https://example.com/")
    }

    #[test]
    fn welcome_email_carries_the_unsubscribe_link() {
        let mailer = mailer(Arc::new(MemoryBackend::default()));
        let subscriber = Subscriber {
            id: 1,
            email: "reader@example.com".to_string(),
            active: true,
            token: "abc-123".to_string(),
            subscribed_at: Utc::now(),
        };
        let email = mailer.welcome_email(&subscriber);
        assert_eq!(email.to, "reader@example.com");
        assert!(email.body.contains("https://example.com/newsletter/unsubscribe/abc-123/"));
    }

    #[test]
    fn contact_notification_replies_to_the_sender() {
        let mailer = mailer(Arc::new(MemoryBackend::default()));
        let message = ContactMessage {
            id: 1,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            subject: "Hello".to_string(),
            message: "Body".to_string(),
            read: false,
            sent_at: Utc::now(),
        };
        let email = mailer.contact_notification(&message);
        assert_eq!(email.to, "owner@example.com");
        assert_eq!(email.reply_to.as_deref(), Some("ana@example.com"));
        assert!(email.subject.contains("Hello"));
    }

    #[actix_web::test]
    async fn dispatch_delivers_in_the_background() {
        let backend = Arc::new(MemoryBackend::default());
        let mailer = mailer(Arc::clone(&backend));
        mailer.dispatch(OutgoingEmail {
            to: "x@example.com".to_string(),
            reply_to: None,
            subject: "s".to_string(),
            body: "b".to_string(),
        });

        for _ in 0..100 {
            if !backend.sent().is_empty() {
                break;
            }
            rt::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(backend.sent().len(), 1);
    }
}
