use serde::{Deserialize, Serialize};

/// Query string GitHub appends when redirecting back to `/auth-callback`.
/// Both fields are optional so a missing value is a 400, not a rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// JSON form of GitHub's token endpoint reply, when JSON is what it sent.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommandArgs {
    pub command: String,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct CommandResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goto_location: Option<String>,
}

impl CommandResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            goto_location: None,
        }
    }

    pub fn goto(location: impl Into<String>) -> Self {
        Self {
            text: None,
            goto_location: Some(location.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandDescriptor {
    pub trigger: &'static str,
    pub auto_complete: bool,
    pub auto_complete_desc: &'static str,
}
