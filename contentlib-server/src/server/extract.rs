use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use contentlib::services::Actor;

use super::app::AppState;
use super::error::ApiError;

/// Header carrying the authenticated username, set by the fronting proxy.
pub const USERNAME_HEADER: &str = "x-username";

/// The caller of a request. Missing or unknown usernames resolve to an anonymous actor.
pub struct RequestActor(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for RequestActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get(USERNAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let actor = state.gateway.users().resolve_actor(username).await?;
        Ok(RequestActor(actor))
    }
}
