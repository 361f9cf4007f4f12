use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use storefront_clients::{AuthUser, ClientError};
use uuid::Uuid;

use crate::api::{ApiError, AppState};

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The verified identity behind the request's bearer token, if one was sent.
///
/// Always present as a request extension once [`authenticate`] has run;
/// `None` means the request was anonymous.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<AuthUser>);

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware resolving the bearer token, if any, to a [`Caller`].
///
/// Requests without an `Authorization` header pass through as anonymous.
/// A token the auth provider refuses is answered with 401 here; route-level
/// extractors decide whether an anonymous caller is acceptable.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();

    let caller = match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        None => Caller(None),
        Some(token) => match state.auth.verify(token).await {
            Ok(user) => Caller(Some(user)),
            Err(ClientError::Unauthorized) => {
                return ApiError::new(request_id, "unauthorized", "missing or invalid bearer token")
                    .into_response();
            }
            Err(e) => {
                tracing::error!(error = %e, "auth provider request failed");
                return ApiError::new(request_id, "upstream_error", "auth provider unavailable")
                    .into_response();
            }
        },
    };

    req.extensions_mut().insert(caller);
    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn extract_bearer_token_rejects_blank_token() {
        let header = HeaderValue::from_static("Bearer   ");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn extract_bearer_token_handles_missing_header() {
        assert_eq!(extract_bearer_token(None), None);
    }
}
