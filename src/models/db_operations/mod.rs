use rusqlite::ErrorCode;
use thiserror::Error;

pub mod content_db_operations;
pub mod intake_db_operations;
pub mod users_db_operations;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(rusqlite::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    /// A UNIQUE (or similar) constraint rejected the write, usually because a
    /// concurrent request got there first.
    #[error("Constraint violation: {0}")]
    Conflict(String),
    #[error("Only one {0} record may exist")]
    SingletonExists(&'static str),
    #[error("Item not found in database: {0}")]
    NotFound(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(err, msg) if err.code == ErrorCode::ConstraintViolation => {
                StoreError::Conflict(msg.unwrap_or_else(|| err.to_string()))
            }
            other => StoreError::Rusqlite(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Maps a JSON column decode failure into the rusqlite row-mapping error type.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
