use crate::handlers::identity::UserId;
use crate::handlers::oauth::{AUTH_COMPLETE_MESSAGE, OAuthError, complete};
use crate::models::AppState;
use crate::models::oauth::CallbackParams;
use axum::extract::{Query, State};

pub async fn callback_handler(
    user_id: UserId,
    Query(params): Query<CallbackParams>,
    State(app_state): State<AppState>,
) -> Result<&'static str, OAuthError> {
    complete(&app_state, &user_id, params).await?;
    Ok(AUTH_COMPLETE_MESSAGE)
}
