use crate::error::{BadEnvVarSnafu, BouncerResult, ParseTimeoutSnafu};
use dotenvy::var;
use snafu::ResultExt;
use std::{env::VarError, path::PathBuf, sync::Arc, time::Duration};

const DEFAULT_API_URL: &str = "http://localhost:8321";
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SERVER_IP: &str = "127.0.0.1:8080";
const DEFAULT_SESSION_FILE: &str = "bouncer_session.json";

#[derive(Clone, Debug)]
pub struct RuntimeConfiguration {
    api_config: Arc<ApiConfig>,
    server_ip: Arc<str>,
    session_file: Arc<PathBuf>,
}

impl RuntimeConfiguration {
    pub fn new() -> BouncerResult<Self> {
        Ok(Self {
            api_config: Arc::new(ApiConfig::new()?),
            server_ip: optional_env_var("BOUNCER_SERVER_IP")?
                .unwrap_or_else(|| DEFAULT_SERVER_IP.to_string())
                .into(),
            session_file: Arc::new(
                optional_env_var("BOUNCER_SESSION_FILE")?
                    .map_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE), PathBuf::from),
            ),
        })
    }

    #[cfg(test)]
    pub fn for_tests(base_url: String, session_file: PathBuf) -> Self {
        Self {
            api_config: Arc::new(ApiConfig {
                base_url,
                timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            }),
            server_ip: DEFAULT_SERVER_IP.into(),
            session_file: Arc::new(session_file),
        }
    }

    pub fn api_config(&self) -> Arc<ApiConfig> {
        self.api_config.clone()
    }

    pub fn server_ip(&self) -> &str {
        &self.server_ip
    }

    pub fn session_file(&self) -> &PathBuf {
        &self.session_file
    }
}

#[derive(Debug)]
pub struct ApiConfig {
    base_url: String,
    timeout: Duration,
}

impl ApiConfig {
    pub fn new() -> BouncerResult<Self> {
        let base_url = optional_env_var("BOUNCER_API_URL")?
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout = match optional_env_var("BOUNCER_API_TIMEOUT_SECS")? {
            Some(original) => Duration::from_secs(
                original
                    .trim()
                    .parse()
                    .context(ParseTimeoutSnafu { original })?,
            ),
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Joins an endpoint path (which must start with `/`) onto the base URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn optional_env_var(name: &'static str) -> BouncerResult<Option<String>> {
    match var(name) {
        Ok(value) => Ok(Some(value)),
        Err(dotenvy::Error::EnvVar(VarError::NotPresent)) => Ok(None),
        Err(source) => Err(source).context(BadEnvVarSnafu { name }),
    }
}
