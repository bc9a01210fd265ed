use crate::handlers::identity::UserId;
use crate::models::AppState;
use crate::store::{StoreError, access_token_key};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum GraphQlError {
    #[error("could not read access token: {0}")]
    Store(#[from] StoreError),
    #[error("GraphQL request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("could not decode GraphQL response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("GraphQL response carried no data")]
    MissingData,
}

impl IntoResponse for GraphQlError {
    fn into_response(self) -> Response {
        error!("GitHub GraphQL query failed: {}", self);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

#[derive(Debug, PartialEq)]
pub enum QueryOutcome {
    Data(Value),
    /// No token stored for the user; the caller should prompt for auth.
    Unauthenticated,
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a Value>,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

/// Runs `query` against GitHub on behalf of `user_id`. GraphQL-level errors
/// are logged; only a missing `data` member fails the call.
pub async fn query(
    app_state: &AppState,
    user_id: &UserId,
    query: &str,
    variables: Option<&Value>,
) -> Result<QueryOutcome, GraphQlError> {
    let Some(token) = app_state
        .store
        .get(&access_token_key(user_id.as_str()))
        .await?
    else {
        return Ok(QueryOutcome::Unauthenticated);
    };
    let token = String::from_utf8_lossy(&token);

    let response = app_state
        .http
        .post(app_state.endpoints.graphql_url.clone())
        .bearer_auth(token)
        .json(&GraphQlRequest { query, variables })
        .send()
        .await
        .map_err(GraphQlError::Transport)?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "GitHub GraphQL endpoint answered with an error status");
    }

    let payload: GraphQlResponse = response.json().await.map_err(GraphQlError::Decode)?;

    for e in &payload.errors {
        error!(user_id = %user_id.as_str(), "GitHub GraphQL error: {}", e.message);
    }

    payload
        .data
        .map(QueryOutcome::Data)
        .ok_or(GraphQlError::MissingData)
}
