use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    // Populated from the .env file
    pub database_path: String,
    pub media_path: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub session_secret_key: String,
    pub admin_url_prefix: String,
    pub use_secure_cookies: bool,
    /// Comma-separated addresses allowed to reach the back office, `*` for any.
    pub admin_login_accept_ip: String,
    /// Public base URL, used for links inside outgoing email.
    pub site_url: String,
    /// Sender of every outgoing email and recipient of contact notifications.
    pub default_from_email: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

fn required_var(name: &str) -> Result<String, config::ConfigError> {
    env::var(name).map_err(|_| {
        config::ConfigError::Message(format!(
            "FATAL: Environment variable '{}' is not set in your .env file.",
            name
        ))
    })
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn require_absolute(name: &str, value: &str) -> Result<(), config::ConfigError> {
    if Path::new(value).is_relative() {
        return Err(config::ConfigError::Message(format!(
            "FATAL: The '{}' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
            name, value
        )));
    }
    Ok(())
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let database_path = required_var("DATABASE_PATH")?;
        let media_path = required_var("MEDIA_PATH")?;
        require_absolute("DATABASE_PATH", &database_path)?;
        require_absolute("MEDIA_PATH", &media_path)?;

        // 128 hex characters, 64 bytes once decoded.
        let session_secret_key = required_var("SESSION_SECRET_KEY")?;
        if session_secret_key.len() != 128 || !session_secret_key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(config::ConfigError::Message(
                "FATAL: 'SESSION_SECRET_KEY' must be 128 hexadecimal characters long (64 bytes).".to_string(),
            ));
        }

        let admin_url_prefix = required_var("ADMIN_URL_PREFIX")?;
        if admin_url_prefix.is_empty()
            || !admin_url_prefix.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            return Err(config::ConfigError::Message(
                "FATAL: 'ADMIN_URL_PREFIX' must not be empty and can only contain letters, numbers, underscores, and hyphens.".to_string(),
            ));
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_default();
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let use_secure_cookies = env::var("USE_SECURE_COOKIES")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        // Unset means nobody gets in.
        let admin_login_accept_ip = env::var("ADMIN_LOGIN_ACCEPT_IP").unwrap_or_default();

        let site_url = env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let default_from_email =
            env::var("DEFAULT_FROM_EMAIL").unwrap_or_else(|_| "webmaster@localhost".to_string());

        let smtp_port = match env::var("SMTP_PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| {
                config::ConfigError::Message(format!("FATAL: 'SMTP_PORT' must be a port number, got '{}'.", raw))
            })?,
            Err(_) => 587,
        };

        let mut builder = config::Config::builder()
            // Host and port come from the TOML file.
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml))
            .set_override("database_path", database_path)?
            .set_override("media_path", media_path)?
            .set_override("session_secret_key", session_secret_key)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("use_secure_cookies", use_secure_cookies)?
            .set_override("admin_url_prefix", admin_url_prefix)?
            .set_override("admin_login_accept_ip", admin_login_accept_ip)?
            .set_override("site_url", site_url)?
            .set_override("default_from_email", default_from_email)?
            .set_override("smtp_port", i64::from(smtp_port))?;

        for (key, var) in [
            ("smtp_host", "SMTP_HOST"),
            ("smtp_username", "SMTP_USERNAME"),
            ("smtp_password", "SMTP_PASSWORD"),
        ] {
            if let Some(value) = optional_var(var) {
                builder = builder.set_override(key, value)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    /// The single SQLite file holding content, intake and admin accounts.
    pub fn portfolio_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path).join("portfolio.db")
    }

    /// SMTP credentials, only when both halves are configured.
    pub fn smtp_credentials(&self) -> Option<(String, String)> {
        match (&self.smtp_username, &self.smtp_password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        web: WebConfig { host: "127.0.0.1".to_string(), port: 8080 },
        database_path: "/tmp/portfolio-test".to_string(),
        media_path: "/tmp/portfolio-test/media".to_string(),
        allowed_origins: String::new(),
        log_level: "debug".to_string(),
        session_secret_key: "0".repeat(128),
        admin_url_prefix: "test-admin".to_string(),
        use_secure_cookies: false,
        admin_login_accept_ip: "*".to_string(),
        site_url: "http://localhost:8080".to_string(),
        default_from_email: "site@example.com".to_string(),
        smtp_host: None,
        smtp_port: 587,
        smtp_username: None,
        smtp_password: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_file_lives_under_the_database_path() {
        let config = test_config();
        assert_eq!(config.portfolio_db_path(), PathBuf::from("/tmp/portfolio-test/portfolio.db"));
    }

    #[test]
    fn credentials_need_both_halves() {
        let mut config = test_config();
        config.smtp_username = Some("mailer".to_string());
        assert_eq!(config.smtp_credentials(), None);
        config.smtp_password = Some("secret".to_string());
        assert_eq!(config.smtp_credentials(), Some(("mailer".to_string(), "secret".to_string())));
    }
}
