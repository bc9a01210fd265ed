use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TooltipKind {
    AuthenticationRequired,
    PullRequest,
}

/// Body of `GET /tooltip`. `data` is always present on the wire, `null` when
/// the user still has to authenticate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    #[serde(rename = "type")]
    pub kind: TooltipKind,
    pub data: Option<Value>,
}

impl Tooltip {
    pub fn authentication_required() -> Self {
        Self {
            kind: TooltipKind::AuthenticationRequired,
            data: None,
        }
    }

    pub fn pull_request(data: Value) -> Self {
        Self {
            kind: TooltipKind::PullRequest,
            data: Some(data),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TooltipQuery {
    pub url: Option<String>,
}
