//! Rejection responses handed back to the proxy runtime.
//!
//! A rejected request is answered locally with 403 and a plaintext body
//! naming the cause; the request itself is never sent upstream.

use crate::policy::evaluator::Evaluation;

pub const FORBIDDEN: u16 = 403;

/// Header naming the rejection cause, for clients and log scrapers.
pub const REASON_HEADER: &str = "X-Sandcat-Reason";

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Denied by the network rules.
    NetworkPolicy,
    /// A secret placeholder was headed to a host outside its allowlist.
    SecretLeak,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::NetworkPolicy => "network-policy",
            RejectReason::SecretLeak => "secret-leak",
        }
    }
}

/// Transport-agnostic response for the runtime to emit in place of
/// forwarding the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub reason: RejectReason,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Rejection {
    pub fn new(status: u16, reason: RejectReason, detail: &str) -> Self {
        let mut body = detail.as_bytes().to_vec();
        if !body.ends_with(b"\n") {
            body.push(b'\n');
        }
        Self {
            status,
            reason,
            headers: vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                (REASON_HEADER.to_string(), reason.as_str().to_string()),
            ],
            body,
        }
    }

    pub fn network_denied(method: &str, host: &str, evaluation: &Evaluation) -> Self {
        Self::new(
            FORBIDDEN,
            RejectReason::NetworkPolicy,
            &format!(
                "Blocked by network policy: {} {} ({})",
                method, host, evaluation.reason
            ),
        )
    }

    pub fn secret_leak(secret: &str, host: &str) -> Self {
        Self::new(
            FORBIDDEN,
            RejectReason::SecretLeak,
            &format!("Blocked: secret '{}' not allowed for host '{}'", secret, host),
        )
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::config::Action;

    #[test]
    fn secret_leak_names_secret_and_host() {
        let rejection = Rejection::secret_leak("API_KEY", "evil.com");
        assert_eq!(rejection.status, 403);
        assert_eq!(rejection.reason, RejectReason::SecretLeak);
        assert_eq!(
            rejection.body_text(),
            "Blocked: secret 'API_KEY' not allowed for host 'evil.com'\n"
        );
    }

    #[test]
    fn network_denial_names_the_rule() {
        let evaluation = Evaluation {
            action: Action::Deny,
            reason: "rule #3 deny POST *".to_string(),
            matched_rule: Some(2),
        };
        let rejection = Rejection::network_denied("POST", "example.com", &evaluation);
        assert_eq!(
            rejection.body_text(),
            "Blocked by network policy: POST example.com (rule #3 deny POST *)\n"
        );
        assert!(rejection.body_text().contains("network policy"));
    }

    #[test]
    fn headers_carry_content_type_and_reason() {
        let rejection = Rejection::secret_leak("K", "h");
        assert!(rejection
            .headers
            .contains(&("Content-Type".to_string(), "text/plain".to_string())));
        assert!(rejection
            .headers
            .contains(&(REASON_HEADER.to_string(), "secret-leak".to_string())));
    }

    #[test]
    fn detail_gets_single_trailing_newline() {
        let rejection = Rejection::new(FORBIDDEN, RejectReason::NetworkPolicy, "denied\n");
        assert_eq!(rejection.body, b"denied\n");
    }
}
