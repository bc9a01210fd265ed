//! GitHub OAuth web flow: issue a state nonce, send the user to GitHub, then
//! trade the returned code for an access token once the nonce checks out.

mod callback_handler;
mod command_handler;

pub use callback_handler::callback_handler;
pub use command_handler::{command_handler, commands_handler};

use axum::{
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use oauth2::{AccessToken, AuthorizationCode, ClientId, ClientSecret, CsrfToken};
use rand::{RngCore, rngs::OsRng};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::handlers::identity::UserId;
use crate::models::AppState;
use crate::models::oauth::{CallbackParams, TokenResponse};
use crate::store::{StoreError, access_token_key, auth_state_key};

pub const OAUTH_SCOPES: &str = "repo,read:org,read:user,read:discussion";
pub const NOT_CONFIGURED_MESSAGE: &str =
    "This plugin has not been configured yet. Go poke your administrator.";
pub const AUTH_COMPLETE_MESSAGE: &str =
    "Authentication complete. You may now close this page and return to Mattermost.";

const STATE_BYTES: usize = 20;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("error generating random state: {0}")]
    Randomness(#[source] rand::Error),
    #[error("key/value store failure: {0}")]
    Persistence(#[source] StoreError),
    #[error("error storing access token: {0}")]
    TokenPersistence(#[source] StoreError),
    #[error("auth state missing or mismatched")]
    StateMismatch,
    #[error("oauth credentials are not configured")]
    Unconfigured,
    #[error("token request failed: {0}")]
    UpstreamTransport(#[source] reqwest::Error),
    #[error("token endpoint answered HTTP {0}")]
    UpstreamStatus(StatusCode),
    #[error("could not read token response: {0}")]
    UnreadableResponse(#[source] reqwest::Error),
    #[error("could not parse token response: {0}")]
    MalformedResponse(#[source] serde_json::Error),
    #[error("token response carried no access_token")]
    MissingAccessToken,
}

impl OAuthError {
    fn status(&self) -> StatusCode {
        match self {
            OAuthError::StateMismatch => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the end user sees. Upstream details stay in the logs.
    fn user_message(&self) -> &'static str {
        match self {
            OAuthError::StateMismatch => "bad request",
            OAuthError::Randomness(_) | OAuthError::Persistence(_) => "internal error",
            OAuthError::TokenPersistence(_) => "error storing access token. please try again",
            OAuthError::Unconfigured => NOT_CONFIGURED_MESSAGE,
            OAuthError::UpstreamTransport(_) | OAuthError::UpstreamStatus(_) => {
                "oauth request error. please try again"
            }
            OAuthError::UnreadableResponse(_) => "error reading oauth response. please try again",
            OAuthError::MalformedResponse(_) | OAuthError::MissingAccessToken => {
                "error parsing oauth response. please try again"
            }
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        match &self {
            OAuthError::StateMismatch => warn!("rejecting oauth callback: {}", self),
            _ => error!("oauth flow failed: {}", self),
        }
        (self.status(), self.user_message()).into_response()
    }
}

#[derive(Debug)]
pub enum Initiation {
    Redirect(Url),
    Unconfigured,
}

/// Starts the flow for `user_id`: stores a fresh state nonce and returns the
/// GitHub authorization URL carrying it.
pub async fn initiate(app_state: &AppState, user_id: &UserId) -> Result<Initiation, OAuthError> {
    let configuration = app_state.config.snapshot();
    let Some((client_id, _)) = configuration.credentials() else {
        info!(user_id = %user_id.as_str(), "authentication requested but plugin is not configured");
        return Ok(Initiation::Unconfigured);
    };

    let state = new_state()?;
    app_state
        .store
        .set(
            &auth_state_key(user_id.as_str()),
            state.secret().as_bytes().to_vec(),
        )
        .await
        .map_err(OAuthError::Persistence)?;

    let mut url = app_state.endpoints.authorize_url.url().clone();
    url.query_pairs_mut()
        .append_pair("client_id", client_id.as_str())
        .append_pair("scope", OAUTH_SCOPES)
        .append_pair("state", state.secret());

    info!(user_id = %user_id.as_str(), "issued oauth state, redirecting to GitHub");
    Ok(Initiation::Redirect(url))
}

/// Finishes the flow: verifies `state` against the stored nonce, exchanges
/// `code` for a token and stores it. The nonce is consumed on a match.
pub async fn complete(
    app_state: &AppState,
    user_id: &UserId,
    params: CallbackParams,
) -> Result<AccessToken, OAuthError> {
    let state_key = auth_state_key(user_id.as_str());
    let expected = app_state
        .store
        .get(&state_key)
        .await
        .map_err(OAuthError::Persistence)?;

    let code = params.code.filter(|code| !code.is_empty());
    let state = params.state.filter(|state| !state.is_empty());
    let (Some(code), Some(state), Some(expected)) = (code, state, expected) else {
        return Err(OAuthError::StateMismatch);
    };
    if !bool::from(expected.as_slice().ct_eq(state.as_bytes())) {
        return Err(OAuthError::StateMismatch);
    }

    app_state
        .store
        .delete(&state_key)
        .await
        .map_err(OAuthError::Persistence)?;

    let configuration = app_state.config.snapshot();
    let (client_id, client_secret) = configuration
        .credentials()
        .ok_or(OAuthError::Unconfigured)?;

    let access_token = exchange_code(
        app_state,
        &client_id,
        &client_secret,
        &AuthorizationCode::new(code),
        &state,
    )
    .await?;

    app_state
        .store
        .set(
            &access_token_key(user_id.as_str()),
            access_token.secret().as_bytes().to_vec(),
        )
        .await
        .map_err(OAuthError::TokenPersistence)?;

    info!(user_id = %user_id.as_str(), "stored GitHub access token");
    Ok(access_token)
}

fn new_state() -> Result<CsrfToken, OAuthError> {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(OAuthError::Randomness)?;
    Ok(CsrfToken::new(URL_SAFE_NO_PAD.encode(bytes)))
}

async fn exchange_code(
    app_state: &AppState,
    client_id: &ClientId,
    client_secret: &ClientSecret,
    code: &AuthorizationCode,
    state: &str,
) -> Result<AccessToken, OAuthError> {
    let params = [
        ("client_id", client_id.as_str()),
        ("client_secret", client_secret.secret().as_str()),
        ("code", code.secret().as_str()),
        ("state", state),
    ];

    let response = app_state
        .http
        .post(app_state.endpoints.token_url.url().clone())
        .form(&params)
        .send()
        .await
        .map_err(OAuthError::UpstreamTransport)?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(OAuthError::UpstreamStatus(status));
    }

    // GitHub answers form-encoded unless asked for JSON; accept either.
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    let body = response
        .text()
        .await
        .map_err(OAuthError::UnreadableResponse)?;

    let access_token = if is_json {
        serde_json::from_str::<TokenResponse>(&body)
            .map_err(OAuthError::MalformedResponse)?
            .access_token
    } else {
        url::form_urlencoded::parse(body.as_bytes())
            .find(|(key, _)| key == "access_token")
            .map(|(_, value)| value.into_owned())
    };

    access_token
        .filter(|token| !token.is_empty())
        .map(AccessToken::new)
        .ok_or(OAuthError::MissingAccessToken)
}
