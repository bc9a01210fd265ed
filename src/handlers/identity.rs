use axum::{extract::FromRequestParts, http::StatusCode, http::request::Parts};

/// Header the chat host sets to the id of the logged-in user.
pub const USER_ID_HEADER: &str = "mattermost-user-id";

/// Caller identity as asserted by the host. Handlers that take this extractor
/// answer `403` when the header is missing or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| UserId(value.to_string()))
            .ok_or((StatusCode::FORBIDDEN, "please log in"))
    }
}
