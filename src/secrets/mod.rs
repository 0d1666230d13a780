//! Secret store and placeholder tokens.
//!
//! Dev containers only ever see placeholder tokens such as
//! `SANDCAT_PLACEHOLDER_GITHUB_TOKEN`. The proxy swaps a placeholder for the
//! real value on the way out, but only for hosts on that secret's allowlist
//! (see [`substitute`]). [`env_file`] renders the placeholders as shell
//! exports for the containers.

pub mod env_file;
pub mod substitute;

use std::collections::BTreeMap;

use memchr::memmem;

use crate::policy::config::SecretEntry;
use crate::policy::pattern::HostPattern;

/// Prefix of every placeholder token.
pub const PLACEHOLDER_PREFIX: &str = "SANDCAT_PLACEHOLDER_";

/// The placeholder token for the secret called `name`.
pub fn placeholder_for(name: &str) -> String {
    format!("{}{}", PLACEHOLDER_PREFIX, name)
}

/// A loaded secret. Immutable once built.
#[derive(Clone)]
pub struct Secret {
    name: String,
    value: String,
    placeholder: String,
    finder: memmem::Finder<'static>,
    allowed_hosts: Vec<HostPattern>,
}

impl Secret {
    pub fn new(name: &str, entry: &SecretEntry) -> Self {
        let placeholder = placeholder_for(name);
        let finder = memmem::Finder::new(placeholder.as_bytes()).into_owned();
        Self {
            name: name.to_string(),
            value: entry.value.clone(),
            placeholder,
            finder,
            allowed_hosts: entry.hosts.iter().map(|h| HostPattern::new(h)).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub(crate) fn value(&self) -> &str {
        &self.value
    }

    /// Precompiled searcher for the placeholder.
    pub(crate) fn finder(&self) -> &memmem::Finder<'static> {
        &self.finder
    }

    pub fn allowed_hosts(&self) -> impl Iterator<Item = &str> {
        self.allowed_hosts.iter().map(HostPattern::as_str)
    }

    /// Whether the real value may be sent to `host`.
    pub fn allows_host(&self, host: &str) -> bool {
        self.allowed_hosts.iter().any(|p| p.matches(host))
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("placeholder", &self.placeholder)
            .field("allowed_hosts", &self.allowed_hosts().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Read-only set of secrets, iterated in name order.
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    secrets: Vec<Secret>,
}

impl SecretStore {
    pub fn new(entries: &BTreeMap<String, SecretEntry>) -> Self {
        let secrets = entries
            .iter()
            .map(|(name, entry)| Secret::new(name, entry))
            .collect();
        Self { secrets }
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn get(&self, name: &str) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Secret> {
        self.secrets.iter()
    }
}

impl<'a> IntoIterator for &'a SecretStore {
    type Item = &'a Secret;
    type IntoIter = std::slice::Iter<'a, Secret>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
