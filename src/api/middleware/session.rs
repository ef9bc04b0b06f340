//! Session cookie handling
//!
//! Uploads are grouped per browser session. The id lives in a long-lived
//! HttpOnly cookie, minted on the first request that needs it.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use crate::config::SessionConfig;
use crate::domain::session::SessionId;

/// Return the caller's session id, minting one (and its cookie) if the jar
/// has none or holds a malformed value.
pub fn ensure_session(jar: CookieJar, config: &SessionConfig) -> (CookieJar, SessionId) {
    if let Some(sid) = jar
        .get(&config.cookie_name)
        .and_then(|cookie| SessionId::new(cookie.value()).ok())
    {
        return (jar, sid);
    }

    let sid = SessionId::generate();
    debug!(session = %sid, "Issuing session cookie");

    let cookie = Cookie::build((config.cookie_name.clone(), sid.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(config.max_age_secs))
        .build();

    (jar.add(cookie), sid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::http::{HeaderMap, HeaderValue};
    use axum::response::IntoResponse;

    fn config() -> SessionConfig {
        SessionConfig::default()
    }

    fn jar_with(cookie: &'static str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(cookie));
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn test_existing_session_is_reused() {
        let jar = jar_with("session_id=existing-session");

        let (jar, sid) = ensure_session(jar, &config());

        assert_eq!(sid.as_str(), "existing-session");
        let response = jar.into_response();
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[test]
    fn test_new_session_sets_cookie() {
        let (jar, sid) = ensure_session(CookieJar::new(), &config());

        let response = jar.into_response();
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();

        assert!(set_cookie.starts_with(&format!("session_id={}", sid)));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("Max-Age=2592000"));
    }

    #[test]
    fn test_malformed_session_is_replaced() {
        let jar = jar_with("session_id=../../etc");

        let (jar, sid) = ensure_session(jar, &config());

        assert_ne!(sid.as_str(), "../../etc");
        assert!(jar.into_response().headers().get(SET_COOKIE).is_some());
    }
}
