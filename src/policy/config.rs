//! Settings file types for the sandcat proxy.
//!
//! The top-level [`Settings`] document has three optional sections: an
//! ordered `network` rule list, a `secrets` map and an `env` map of plain
//! variables exported to dev containers. A missing section is empty, never
//! an error.
//!
//! # Example `settings.json`
//!
//! ```json
//! {
//!   "network": [
//!     {"action": "allow", "host": "*", "method": "GET"},
//!     {"action": "allow", "host": "*.github.com"}
//!   ],
//!   "secrets": {
//!     "GITHUB_TOKEN": {"value": "${GITHUB_TOKEN}", "hosts": ["api.github.com"]}
//!   },
//!   "env": {"GIT_USER_NAME": "Alice"}
//! }
//! ```
//!
//! A file ending in `.toml` is parsed as TOML with the same shape.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SandcatError};

/// The action to take when a request matches a network rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Let the request through to secret substitution.
    Allow,
    /// Reject the request with 403 Forbidden.
    Deny,
}

/// A single network rule matching a host glob and an optional HTTP method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Rule {
    pub action: Action,
    /// Host glob, e.g. `"*.github.com"` or `"*"`.
    pub host: String,
    /// HTTP method filter, compared case-insensitively. `None` matches any method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Raw secret definition from the `secrets` section.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecretEntry {
    /// The real value. Never logged.
    pub value: String,
    /// Host globs the value may be sent to.
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl std::fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEntry")
            .field("value", &"<redacted>")
            .field("hosts", &self.hosts)
            .finish()
    }
}

/// Top-level settings document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Ordered rule list; first match wins, no match denies.
    #[serde(default)]
    pub network: Vec<Rule>,
    /// Secrets keyed by name. Iteration is in name order.
    #[serde(default)]
    pub secrets: BTreeMap<String, SecretEntry>,
    /// Extra variables written to the placeholder env file.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Settings {
    /// Load and parse settings from a file.
    ///
    /// `${VAR}` references in the file text are replaced with environment
    /// variable values before parsing; an unset variable is an error. Files
    /// with a `.toml` extension are parsed as TOML, everything else as JSON.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let content = substitute_env_vars(&content)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let settings: Settings = if is_toml {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject `env` and `secrets` keys that are not shell variable names.
    /// Both end up after `export` in the env file.
    pub fn validate(&self) -> Result<()> {
        match self
            .env
            .keys()
            .chain(self.secrets.keys())
            .find(|name| !is_valid_name(name))
        {
            Some(name) => Err(SandcatError::InvalidName(name.clone())),
            None => Ok(()),
        }
    }

    /// Like [`Settings::load_from_path`], but a missing file yields empty
    /// settings: every request is denied and substitution is disabled.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.is_file() {
            info!(
                "No settings file at {}; network access denied and secret substitution disabled",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }
}

static VAR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("variable name regex is valid")
});

/// Whether `name` can be exported as a shell variable.
pub fn is_valid_name(name: &str) -> bool {
    VAR_NAME.is_match(name)
}

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env reference regex is valid")
});

/// Replace `${VAR_NAME}` references with environment variable values.
///
/// Returns an error naming the first variable that is not set.
fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut last = 0;
    for cap in ENV_REF.captures_iter(input) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let value = std::env::var(name.as_str())
            .map_err(|_| SandcatError::ConfigEnvVar(name.as_str().to_string()))?;
        result.push_str(&input[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&input[last..]);
    Ok(result)
}
