use crate::handlers::identity::UserId;
use crate::handlers::oauth::{Initiation, NOT_CONFIGURED_MESSAGE, OAuthError, initiate};
use crate::models::AppState;
use crate::models::oauth::{CommandArgs, CommandDescriptor, CommandResponse};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;

pub const AUTH_TRIGGER: &str = "gh-tooltip-auth";

pub const COMMANDS: &[CommandDescriptor] = &[CommandDescriptor {
    trigger: AUTH_TRIGGER,
    auto_complete: true,
    auto_complete_desc: "Authenticates the GitHub Tooltip plugin so you can get enhanced tooltips.",
}];

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error(transparent)]
    OAuth(#[from] OAuthError),
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        match self {
            CommandError::Unknown(trigger) => {
                warn!(trigger = %trigger, "unknown command");
                (
                    StatusCode::NOT_FOUND,
                    Json(CommandResponse::text(format!("Unknown command: /{trigger}"))),
                )
                    .into_response()
            }
            CommandError::OAuth(e) => e.into_response(),
        }
    }
}

/// `"/gh-tooltip-auth extra args"` -> `"gh-tooltip-auth"`.
fn trigger_of(command: &str) -> &str {
    let first = command.split_whitespace().next().unwrap_or_default();
    first.strip_prefix('/').unwrap_or(first)
}

pub async fn command_handler(
    user_id: UserId,
    State(app_state): State<AppState>,
    Json(args): Json<CommandArgs>,
) -> Result<Json<CommandResponse>, CommandError> {
    let trigger = trigger_of(&args.command);
    if trigger != AUTH_TRIGGER {
        return Err(CommandError::Unknown(trigger.to_string()));
    }

    let response = match initiate(&app_state, &user_id).await? {
        Initiation::Redirect(url) => CommandResponse::goto(url),
        Initiation::Unconfigured => CommandResponse::text(NOT_CONFIGURED_MESSAGE),
    };
    Ok(Json(response))
}

pub async fn commands_handler() -> Json<&'static [CommandDescriptor]> {
    Json(COMMANDS)
}
