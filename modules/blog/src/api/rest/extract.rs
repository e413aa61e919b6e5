use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::api::rest::error::ApiError;
use crate::domain::authorize::Actor;

/// Header naming the user a mutation is performed for. Authentication itself
/// happens in front of this service.
pub const ACTOR_HEADER: &str = "x-user-id";

/// The acting user, if the request names one.
#[derive(Debug, Clone, Copy)]
pub struct ActingUser(pub Option<Actor>);

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(ACTOR_HEADER) else {
            return Ok(Self(None));
        };
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| ApiError::bad_request(format!("{ACTOR_HEADER} must be a UUID")))?;
        Ok(Self(Some(Actor::new(id))))
    }
}

/// `Json<T>` whose rejection is reported in the error envelope.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(Self(value))
    }
}
