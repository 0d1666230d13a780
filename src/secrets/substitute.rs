//! Placeholder substitution and leak detection for a single request.
//!
//! For every secret whose placeholder appears in the URL, a header value or
//! the body, the destination host must match the secret's allowlist. One
//! disallowed secret blocks the whole request. Otherwise each placeholder is
//! replaced with the real value, touching only the components that contain
//! it: a rewritten URL is re-parsed by the transport layer and can clobber
//! routing headers, so untouched parts must stay untouched.

use memchr::memmem::Finder;
use tracing::{debug, warn};

use super::{Secret, SecretStore};

/// The mutable view of an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Destination host as routed by the proxy.
    pub host: String,
    /// Full URL including query.
    pub url: String,
    /// Header name/value pairs in wire order.
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: &str, host: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            host: host.to_string(),
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// First header value whose name matches ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Components of the request that contain `needle`.
    pub fn parts_containing(&self, needle: &str) -> Vec<RequestPart> {
        self.locate(&Finder::new(needle))
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.has(&Finder::new(needle))
    }

    fn locate(&self, finder: &Finder<'_>) -> Vec<RequestPart> {
        let mut parts = Vec::new();
        if finder.find(self.url.as_bytes()).is_some() {
            parts.push(RequestPart::Url);
        }
        for (name, value) in &self.headers {
            if finder.find(value.as_bytes()).is_some() {
                parts.push(RequestPart::Header(name.clone()));
            }
        }
        if let Some(body) = &self.body {
            if finder.find(body).is_some() {
                parts.push(RequestPart::Body);
            }
        }
        parts
    }

    fn has(&self, finder: &Finder<'_>) -> bool {
        finder.find(self.url.as_bytes()).is_some()
            || self
                .headers
                .iter()
                .any(|(_, v)| finder.find(v.as_bytes()).is_some())
            || self
                .body
                .as_deref()
                .is_some_and(|b| finder.find(b).is_some())
    }

    /// Write the real value of `secret` over every occurrence of its
    /// placeholder, only in components that contain it. Returns the
    /// components that were rewritten.
    fn substitute_secret(&mut self, secret: &Secret) -> Vec<RequestPart> {
        let finder = secret.finder();
        let (placeholder, value) = (secret.placeholder(), secret.value());
        let mut parts = Vec::new();
        if finder.find(self.url.as_bytes()).is_some() {
            self.url = self.url.replace(placeholder, value);
            parts.push(RequestPart::Url);
        }
        for (name, header) in self.headers.iter_mut() {
            if finder.find(header.as_bytes()).is_some() {
                *header = header.replace(placeholder, value);
                parts.push(RequestPart::Header(name.clone()));
            }
        }
        if let Some(body) = self.body.as_mut() {
            if let Some(replaced) = splice(body, finder, value.as_bytes()) {
                *body = replaced;
                parts.push(RequestPart::Body);
            }
        }
        parts
    }
}

/// A component of a request that can carry a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPart {
    Url,
    Header(String),
    Body,
}

impl std::fmt::Display for RequestPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestPart::Url => write!(f, "url"),
            RequestPart::Header(name) => write!(f, "header {}", name),
            RequestPart::Body => write!(f, "body"),
        }
    }
}

/// One secret written into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub secret: String,
    /// Components rewritten for this secret. Anything not listed by any
    /// substitution is byte-identical to the delivered request.
    pub parts: Vec<RequestPart>,
}

/// What [`substitute`] did to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No placeholder found; the request was not touched.
    Unchanged,
    /// Placeholders were replaced with real values.
    Modified(Vec<Substitution>),
    /// A placeholder for `secret` is headed to a host outside its allowlist.
    /// The request was not touched and must not be forwarded.
    Blocked { secret: String, host: String },
}

impl Outcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Outcome::Blocked { .. })
    }
}

/// Substitute placeholders in `request` or report a leak.
///
/// Secrets are visited in store order, each one checked for presence
/// against the request as left by the secrets before it. When one
/// placeholder is a prefix of another, the secret visited first claims the
/// overlapping text; a placeholder carried in by an earlier secret's value
/// is seen, and its allowlist checked, by the later secret. Edits go to a
/// staged copy that replaces `request` only if no secret blocks, so a
/// blocked request is left exactly as delivered.
pub fn substitute(store: &SecretStore, request: &mut Request) -> Outcome {
    if store.is_empty() {
        return Outcome::Unchanged;
    }

    let mut staged: Option<Request> = None;
    let mut substitutions = Vec::new();
    for secret in store {
        let current = staged.as_ref().unwrap_or(&*request);
        if !current.has(secret.finder()) {
            continue;
        }
        if !secret.allows_host(&request.host) {
            warn!(
                "Blocked secret {:?} leak to disallowed host {:?}",
                secret.name(),
                request.host
            );
            return Outcome::Blocked {
                secret: secret.name().to_string(),
                host: request.host.clone(),
            };
        }

        let working = staged.get_or_insert_with(|| request.clone());
        let parts = working.substitute_secret(secret);
        debug!(
            "Substituted secret {:?} for {} in {} part(s)",
            secret.name(),
            working.host,
            parts.len()
        );
        substitutions.push(Substitution {
            secret: secret.name().to_string(),
            parts,
        });
    }

    match staged {
        Some(working) => {
            *request = working;
            Outcome::Modified(substitutions)
        }
        None => Outcome::Unchanged,
    }
}

/// `None` when `finder` has no match in `haystack`, so callers can skip the
/// write.
fn splice(haystack: &[u8], finder: &Finder<'_>, replacement: &[u8]) -> Option<Vec<u8>> {
    let mut matches = finder.find_iter(haystack).peekable();
    matches.peek()?;
    let width = finder.needle().len();
    let mut out = Vec::with_capacity(haystack.len());
    let mut last = 0;
    for pos in matches {
        out.extend_from_slice(&haystack[last..pos]);
        out.extend_from_slice(replacement);
        last = pos + width;
    }
    out.extend_from_slice(&haystack[last..]);
    Some(out)
}
