use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oauth2::{AuthUrl, ClientId, ClientSecret, TokenUrl};
use thiserror::Error;
use tokio::sync::watch;
use url::Url;

use crate::store::KeyValueStore;

const CLIENT_ID_VAR: &str = "GITHUB_CLIENT_ID";
const CLIENT_SECRET_VAR: &str = "GITHUB_CLIENT_SECRET";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:10000";
const DEFAULT_ENV_FILE: &str = ".env";
const DEFAULT_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const DEFAULT_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

const USER_AGENT: &str = concat!("github-tooltip-server/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("BIND_ADDR is not a valid socket address: {0}")]
    InvalidBindAddr(#[from] std::net::AddrParseError),
    #[error("could not read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// The hot-reloadable OAuth credentials. Empty strings mean "not configured".
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    pub github_client_id: String,
    pub github_client_secret: String,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("github_client_id", &self.github_client_id)
            .field("github_client_secret", &"[redacted]")
            .finish()
    }
}

impl Configuration {
    pub fn from_env() -> Self {
        Self::from_lookup(|var: &str| std::env::var(var).ok())
    }

    /// Re-reads `path` on top of the process environment. Values in the file
    /// win, since the process environment cannot change after startup.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let env_file_error = |source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        };

        let mut overrides = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(env_file_error)? {
            let (key, value) = item.map_err(env_file_error)?;
            overrides.insert(key, value);
        }

        Ok(Self::from_lookup(|var: &str| {
            overrides
                .get(var)
                .cloned()
                .or_else(|| std::env::var(var).ok())
        }))
    }

    /// Startup and reload both come through here, so a reload with an
    /// unchanged file always yields the snapshot that is already live. Only a
    /// missing file falls back to the process environment alone.
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        match Self::from_env_file(env_file) {
            Err(ConfigError::EnvFile {
                source: dotenvy::Error::Io(e),
                ..
            }) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::from_env()),
            other => other,
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            github_client_id: lookup(CLIENT_ID_VAR).unwrap_or_default(),
            github_client_secret: lookup(CLIENT_SECRET_VAR).unwrap_or_default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.github_client_id.is_empty() && !self.github_client_secret.is_empty()
    }

    pub fn credentials(&self) -> Option<(ClientId, ClientSecret)> {
        self.is_configured().then(|| {
            (
                ClientId::new(self.github_client_id.clone()),
                ClientSecret::new(self.github_client_secret.clone()),
            )
        })
    }
}

/// Single-writer, multi-reader cell around the current [`Configuration`].
///
/// Readers take a cheap `Arc` clone of whatever snapshot is current; a reload
/// swaps in a whole new snapshot, so nobody sees a half-applied change.
#[derive(Clone)]
pub struct ConfigHandle {
    sender: Arc<watch::Sender<Arc<Configuration>>>,
}

impl ConfigHandle {
    pub fn new(initial: Configuration) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn snapshot(&self) -> Arc<Configuration> {
        self.sender.borrow().clone()
    }

    pub fn replace(&self, next: Configuration) {
        self.sender.send_replace(Arc::new(next));
    }
}

#[derive(Debug, Clone)]
pub struct GitHubEndpoints {
    pub authorize_url: AuthUrl,
    pub token_url: TokenUrl,
    pub graphql_url: Url,
}

impl GitHubEndpoints {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |var: &'static str, default: &str| -> Result<Url, ConfigError> {
            let raw = lookup(var).unwrap_or_else(|| default.to_string());
            Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { var, source })
        };

        Ok(Self {
            authorize_url: AuthUrl::from_url(read("GITHUB_AUTHORIZE_URL", DEFAULT_AUTHORIZE_URL)?),
            token_url: TokenUrl::from_url(read("GITHUB_TOKEN_URL", DEFAULT_TOKEN_URL)?),
            graphql_url: read("GITHUB_GRAPHQL_URL", DEFAULT_GRAPHQL_URL)?,
        })
    }

    /// All three endpoints rooted at one base URL, e.g. a mock server.
    #[cfg(test)]
    pub fn with_base(base: &str) -> Result<Self, ConfigError> {
        let base = base.trim_end_matches('/');
        let overrides = HashMap::from([
            ("GITHUB_AUTHORIZE_URL", format!("{base}/login/oauth/authorize")),
            ("GITHUB_TOKEN_URL", format!("{base}/login/oauth/access_token")),
            ("GITHUB_GRAPHQL_URL", format!("{base}/graphql")),
        ]);
        Self::from_lookup(&|var: &str| overrides.get(var).cloned())
    }
}

/// Settings read once at startup. Only the credentials are reloadable.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store_dir: Option<PathBuf>,
    pub env_file: PathBuf,
    pub endpoints: GitHubEndpoints,
    pub configuration: Configuration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        use dotenvy::dotenv;
        use std::env;

        dotenv().ok();

        Self::from_lookup(|var: &str| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |var: &str| lookup(var).filter(|value| !value.is_empty());

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()?;
        let env_file = lookup("ENV_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE));

        Ok(Self {
            bind_addr,
            store_dir: lookup("KV_STORE_DIR").map(PathBuf::from),
            endpoints: GitHubEndpoints::from_lookup(&lookup)?,
            configuration: Configuration::load(&env_file)?,
            env_file,
        })
    }
}

/// Everything a handler needs, passed explicitly through axum state.
#[derive(Clone)]
pub struct AppState {
    pub config: ConfigHandle,
    pub store: Arc<dyn KeyValueStore>,
    pub http: reqwest::Client,
    pub endpoints: Arc<GitHubEndpoints>,
}

impl AppState {
    pub fn new(
        configuration: Configuration,
        store: Arc<dyn KeyValueStore>,
        endpoints: GitHubEndpoints,
    ) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            config: ConfigHandle::new(configuration),
            store,
            http,
            endpoints: Arc::new(endpoints),
        })
    }
}
