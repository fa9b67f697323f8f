use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::error::{MigrationError, Result};
use crate::model::{AuthSpec, Endpoint};

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{([A-Za-z_][A-Za-z0-9_]*)\}$").expect("env reference pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Source,
    Destination,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Source => f.write_str("source"),
            Role::Destination => f.write_str("destination"),
        }
    }
}

/// A remote ready to be passed to `git`.
#[derive(Clone)]
pub struct ResolvedEndpoint {
    remote_url: String,
    display_url: String,
    env: Vec<(String, String)>,
    secrets: Vec<String>,
}

impl ResolvedEndpoint {
    /// URL with credentials embedded. Never log this.
    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    /// URL safe for logs and error messages.
    pub fn display_url(&self) -> &str {
        &self.display_url
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Replace every credential occurring in `text` with `***`.
    pub fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .filter(|secret| !secret.is_empty())
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), "***"))
    }
}

impl fmt::Debug for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEndpoint")
            .field("url", &self.display_url)
            .field("env", &self.env.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Turns declared auth variants into usable credentials.
#[derive(Clone)]
pub struct AuthResolver {
    lookup: EnvLookup,
}

impl AuthResolver {
    /// Resolve `${NAME}` references against the process environment.
    pub fn from_env() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        AuthResolver {
            lookup: Arc::new(lookup),
        }
    }

    pub fn resolve(&self, endpoint: &Endpoint, role: Role) -> Result<ResolvedEndpoint> {
        let display_url = display_url(&endpoint.url);

        let resolved = match &endpoint.auth {
            None => ResolvedEndpoint {
                remote_url: endpoint.url.clone(),
                display_url,
                env: Vec::new(),
                secrets: Vec::new(),
            },
            Some(AuthSpec::Token { token }) => {
                let token = self.expand(token)?;
                if token.is_empty() {
                    return Err(MigrationError::auth(role, "token is empty"));
                }
                self.with_userinfo(endpoint, role, display_url, &token, None)
            }
            Some(AuthSpec::Basic { username, password }) => {
                let password = self.expand(password)?;
                if username.is_empty() || password.is_empty() {
                    return Err(MigrationError::auth(
                        role,
                        "basic auth requires a username and a password",
                    ));
                }
                self.with_userinfo(endpoint, role, display_url, username, Some(&password))
            }
            Some(AuthSpec::Ssh { ssh_key }) => {
                let key = check_ssh_key(ssh_key, role)?;
                ResolvedEndpoint {
                    remote_url: endpoint.url.clone(),
                    display_url,
                    env: vec![("GIT_SSH_COMMAND".to_string(), ssh_command(&key))],
                    secrets: Vec::new(),
                }
            }
        };

        debug!(
            %role,
            url = %resolved.display_url,
            kind = endpoint.auth.as_ref().map(AuthSpec::kind).unwrap_or("none"),
            "resolved credentials"
        );
        Ok(resolved)
    }

    /// Resolve a value of the exact form `${NAME}`; anything else is literal.
    fn expand(&self, value: &str) -> Result<String> {
        match ENV_REFERENCE.captures(value) {
            Some(captures) => {
                let name = &captures[1];
                (self.lookup)(name).ok_or_else(|| MigrationError::MissingEnvVar {
                    name: name.to_string(),
                })
            }
            None => Ok(value.to_string()),
        }
    }

    fn with_userinfo(
        &self,
        endpoint: &Endpoint,
        role: Role,
        display_url: String,
        username: &str,
        password: Option<&str>,
    ) -> ResolvedEndpoint {
        // A token travels as the URL user; for basic auth only the password is secret.
        let mut secrets = vec![password.unwrap_or(username).to_string()];

        let remote_url = match embed_userinfo(&endpoint.url, username, password) {
            Some(parsed) => {
                let encoded = match password {
                    Some(_) => parsed.password().unwrap_or_default(),
                    None => parsed.username(),
                };
                secrets.push(encoded.to_string());
                parsed.to_string()
            }
            None => {
                warn!(
                    %role,
                    url = %display_url,
                    "credentials only apply to http(s) remotes, using url as is"
                );
                endpoint.url.clone()
            }
        };

        ResolvedEndpoint {
            remote_url,
            display_url,
            env: Vec::new(),
            secrets,
        }
    }
}

impl Default for AuthResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

fn embed_userinfo(url: &str, username: &str, password: Option<&str>) -> Option<Url> {
    let mut parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.set_username(username).ok()?;
    parsed.set_password(password).ok()?;
    Some(parsed)
}

/// The configured URL with any userinfo stripped.
pub fn display_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

fn check_ssh_key(path: &Path, role: Role) -> Result<PathBuf> {
    let key = expand_home(path);
    let readable = key.is_file() && File::open(&key).is_ok();
    if !readable {
        return Err(MigrationError::auth(
            role,
            format!("ssh key not found: {}", key.display()),
        ));
    }
    Ok(key)
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn ssh_command(key: &Path) -> String {
    format!(
        "ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=no",
        shell_quote(&key.to_string_lossy())
    )
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
