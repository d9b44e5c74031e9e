use actix_session::{Session, SessionExt};
use actix_web::{dev, guard, FromRequest, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

/// Session key holding the logged-in back-office username.
pub const SESSION_ADMIN_KEY: &str = "admin_username";

#[derive(Serialize)]
pub struct AuthenticatedAdmin {
    pub username: String,
}

impl FromRequest for AuthenticatedAdmin {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        match session.get::<String>(SESSION_ADMIN_KEY) {
            Ok(Some(username)) => ready(Ok(AuthenticatedAdmin { username })),
            _ => ready(Err(actix_web::error::ErrorUnauthorized("Not logged in."))),
        }
    }
}

pub fn admin_guard(session: &Session) -> bool {
    matches!(session.get::<String>(SESSION_ADMIN_KEY), Ok(Some(_)))
}

/// Checks a client address against a comma-separated allow-list. `*` allows
/// everyone, an unknown address is always refused.
pub fn ip_allowed(allow_list: &str, request_ip: Option<&str>) -> bool {
    if allow_list.trim() == "*" {
        return true;
    }
    match request_ip {
        Some(ip) => allow_list.split(',').any(|allowed| allowed.trim() == ip),
        None => false,
    }
}

pub fn ip_guard(ctx: &guard::GuardContext, allow_list: &str) -> bool {
    // Behind a reverse proxy the first X-Forwarded-For entry is the client.
    let request_ip = ctx
        .head()
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| ctx.head().peer_addr.map(|addr| addr.ip().to_string()));

    let allowed = ip_allowed(allow_list, request_ip.as_deref());
    if !allowed {
        match request_ip {
            Some(ip) => log::warn!("Blocked back-office request from unauthorized IP: {}", ip),
            None => log::warn!("Could not determine peer IP address for back-office request."),
        }
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("*", None, true)]
    #[case("*", Some("10.0.0.1"), true)]
    #[case("127.0.0.1, 10.0.0.1", Some("10.0.0.1"), true)]
    #[case("127.0.0.1", Some("10.0.0.1"), false)]
    #[case("127.0.0.1", None, false)]
    fn allow_list(#[case] list: &str, #[case] ip: Option<&str>, #[case] expected: bool) {
        assert_eq!(ip_allowed(list, ip), expected);
    }
}
