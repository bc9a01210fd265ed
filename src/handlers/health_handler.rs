use axum::{Json, extract::State};
use serde::Serialize;

use crate::models::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub configured: bool,
}

pub async fn health_handler(State(app_state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        configured: app_state.config.snapshot().is_configured(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Configuration;
    use crate::models::app_config::test_support::{configured, state_for};

    #[tokio::test]
    async fn test_health_tracks_reloaded_configuration() {
        let app_state = state_for("http://127.0.0.1:1", Configuration::default());

        let Json(before) = health_handler(State(app_state.clone())).await;
        app_state.config.replace(configured());
        let Json(after) = health_handler(State(app_state)).await;

        assert!(!before.configured);
        assert!(after.configured);
        assert_eq!(after.status, "ok");
    }
}
