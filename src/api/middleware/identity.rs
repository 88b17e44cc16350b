//! Owner identity cookie middleware.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::state::AppState;

pub const COOKIE_NAME: &str = "user_id";

/// The owner a request acts on behalf of.
///
/// Inserted into request extensions by [`layer`]; handlers read it with
/// `Extension<Identity>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    /// True when the request carried no valid cookie and a new identity was
    /// issued for it.
    pub fresh: bool,
}

/// Resolves the caller's identity from the `user_id` cookie.
///
/// A missing, malformed or forged cookie gets a freshly issued identity and a
/// `Set-Cookie` header on the response.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/", post(shorten_text_handler))
///     .layer(middleware::from_fn_with_state(state.clone(), identity::layer));
/// ```
pub async fn layer(State(st): State<AppState>, mut req: Request, next: Next) -> Response {
    let verified = cookie_value(req.headers(), COOKIE_NAME).and_then(|t| st.identity.verify(&t));

    let (identity, issued) = match verified {
        Some(user_id) => (
            Identity {
                user_id,
                fresh: false,
            },
            None,
        ),
        None => {
            let (user_id, token) = st.identity.issue();
            debug!(user_id, "Issued new identity");
            (
                Identity {
                    user_id,
                    fresh: true,
                },
                Some(token),
            )
        }
    };

    req.extensions_mut().insert(identity);

    let mut response = next.run(req).await;

    if let Some(token) = issued {
        let cookie = format!("{COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Failed to encode identity cookie: {}", e),
        }
    }

    response
}

/// Returns the value of cookie `name` from any `Cookie` header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value_found() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; user_id=abc.def; lang=en"),
        );

        assert_eq!(cookie_value(&headers, "user_id"), Some("abc.def".to_string()));
    }

    #[test]
    fn test_cookie_value_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("user_id=abc.def"));

        assert_eq!(cookie_value(&headers, "user_id"), Some("abc.def".to_string()));
    }

    #[test]
    fn test_cookie_value_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(cookie_value(&headers, "user_id"), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("user=abc"));
        assert_eq!(cookie_value(&headers, "user_id"), None);
    }
}
