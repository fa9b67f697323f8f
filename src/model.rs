use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// One desired migration from a source remote to a destination remote.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MigrationSpec {
    pub name: String,
    pub source: Endpoint,
    pub destination: Endpoint,
    #[serde(default)]
    pub options: TransferOptions,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Endpoint {
    pub url: String,
    /// `None` means the remote's primary branch.
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub auth: Option<AuthSpec>,
    /// Only consulted for destinations.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

impl Endpoint {
    pub fn new(url: &str) -> Self {
        Endpoint {
            url: url.to_string(),
            branch: None,
            auth: None,
            create_if_missing: true,
        }
    }
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthSpec {
    Token { token: String },
    Ssh { ssh_key: PathBuf },
    Basic { username: String, password: String },
}

impl AuthSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthSpec::Token { .. } => "token",
            AuthSpec::Ssh { .. } => "ssh",
            AuthSpec::Basic { .. } => "basic",
        }
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for AuthSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthSpec::Token { .. } => f.debug_struct("Token").field("token", &"***").finish(),
            AuthSpec::Ssh { ssh_key } => f.debug_struct("Ssh").field("ssh_key", ssh_key).finish(),
            AuthSpec::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TransferOptions {
    #[serde(default = "default_true")]
    pub preserve_history: bool,
    /// Force-sync every ref when set, otherwise only branches and tags.
    #[serde(default = "default_true")]
    pub mirror: bool,
    #[serde(default)]
    pub delete_source_refs: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        TransferOptions {
            preserve_history: true,
            mirror: true,
            delete_source_refs: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_true")]
    pub retry_on_failure: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Seconds between attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
    /// Root for per-attempt working areas. Defaults to the system temp dir.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

impl BatchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    pub fn work_root(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            max_concurrent: default_max_concurrent(),
            retry_on_failure: true,
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            work_dir: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `null` in the config turns the log file off.
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    5
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("migration.log"))
}
