pub mod app_config;
pub mod oauth;
pub mod tooltip;

pub use app_config::{AppConfig, AppState, Configuration};
