//! Request extractors: JSON bodies that fail with the API error envelope,
//! and the caller identity turned into a profile behind the member and
//! admin gates.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, OptionalFromRequest, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use storefront_core::{Role, Tier};
use storefront_db::ProfileRow;

use crate::middleware::{Caller, RequestId};

use super::{map_db_error, ApiError, AppState};

fn request_id(parts: &Parts) -> String {
    parts
        .extensions
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default()
}

/// A JSON request body whose rejections use the API error envelope.
///
/// As `Option<ApiJson<T>>`, a request without a `Content-Type` header
/// yields `None` so that bodyless calls are accepted.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct ApiJson<T>(pub T);

fn body_error(request_id: String, rejection: &JsonRejection) -> ApiError {
    let code = match rejection {
        JsonRejection::JsonDataError(_) => "validation_error",
        _ => "bad_request",
    };
    ApiError::new(request_id, code, rejection.body_text())
}

fn body_request_id(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default()
}

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let rid = body_request_id(&req);
        match <Json<T> as FromRequest<S>>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(body_error(rid, &rejection)),
        }
    }
}

impl<T, S> OptionalFromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, ApiError> {
        let rid = body_request_id(&req);
        match <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await {
            Ok(body) => Ok(body.map(|Json(value)| Self(value))),
            Err(rejection) => Err(body_error(rid, &rejection)),
        }
    }
}

fn caller_id(parts: &Parts) -> Option<uuid::Uuid> {
    parts
        .extensions
        .get::<Caller>()
        .and_then(|c| c.0.as_ref())
        .map(|user| user.id)
}

/// The pricing tier of whoever is calling a public route.
///
/// Anonymous callers, callers without a profile and members whose login is
/// disabled all browse as [`Tier::Guest`].
#[derive(Debug, Clone, Copy)]
pub(super) struct Viewer {
    pub tier: Tier,
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let Some(user_id) = caller_id(parts) else {
            return Ok(Self { tier: Tier::Guest });
        };

        let profile = storefront_db::get_profile(&state.pool, user_id)
            .await
            .map_err(|e| map_db_error(request_id(parts), &e))?;

        let tier = match profile {
            Some(p) if p.login_enabled => {
                p.tier().map_err(|e| map_db_error(request_id(parts), &e))?
            }
            _ => Tier::Guest,
        };
        Ok(Self { tier })
    }
}

/// A registered member whose login is enabled.
#[derive(Debug, Clone)]
pub(super) struct Member(pub ProfileRow);

impl FromRequestParts<AppState> for Member {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let rid = request_id(parts);
        let Some(user_id) = caller_id(parts) else {
            return Err(ApiError::new(rid, "unauthorized", "bearer token required"));
        };

        let profile = storefront_db::get_profile(&state.pool, user_id)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?
            .ok_or_else(|| {
                ApiError::new(
                    rid.clone(),
                    "unauthorized",
                    "no profile registered for this account",
                )
            })?;

        if !profile.login_enabled {
            return Err(ApiError::new(rid, "forbidden", "login is disabled for this account"));
        }
        Ok(Self(profile))
    }
}

/// A member whose profile carries the admin role.
#[derive(Debug, Clone)]
pub(super) struct Admin(pub ProfileRow);

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let Member(profile) = Member::from_request_parts(parts, state).await?;
        let rid = request_id(parts);
        let role = profile.role().map_err(|e| map_db_error(rid.clone(), &e))?;
        if role != Role::Admin {
            return Err(ApiError::new(rid, "forbidden", "admin role required"));
        }
        Ok(Self(profile))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Payload {
        count: u32,
    }

    fn json_request(body: &str) -> Request {
        let mut req = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .expect("request");
        req.extensions_mut().insert(RequestId("req-1".to_string()));
        req
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let err = <ApiJson<Payload> as FromRequest<()>>::from_request(json_request("{nope"), &())
            .await
            .unwrap_err();
        assert_eq!(err.error.code, "bad_request");
        assert_eq!(err.meta.request_id, "req-1");
    }

    #[tokio::test]
    async fn wrong_field_type_is_a_validation_error() {
        let err = <ApiJson<Payload> as FromRequest<()>>::from_request(
            json_request(r#"{"count":"many"}"#),
            &(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error.code, "validation_error");
    }

    #[tokio::test]
    async fn missing_content_type_is_none_when_optional() {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::empty())
            .expect("request");
        let body = <ApiJson<Payload> as OptionalFromRequest<()>>::from_request(req, &())
            .await
            .expect("no rejection");
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn valid_json_is_extracted() {
        let ApiJson(payload) =
            <ApiJson<Payload> as FromRequest<()>>::from_request(json_request(r#"{"count":3}"#), &())
                .await
                .expect("payload");
        assert_eq!(payload.count, 3);
    }
}
