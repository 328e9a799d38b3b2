//! Externally-visible identifiers (§6).
//!
//! Each id type wraps a `String` in the documented external format and must
//! round-trip through the APIs; parsing rejects malformed input rather than
//! silently truncating it.

use crate::error::{PersistenceError, SoarResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

fn random_hex(len: usize) -> String {
    const HEX: &[u8] = b"0123456789ABCDEF";
    (0..len)
        .map(|_| HEX[fastrand::usize(..HEX.len())] as char)
        .collect()
}

fn base36_timestamp() -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut n = Utc::now().timestamp_millis().max(0) as u128;
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(ExecutionId);
string_id!(PlaybookId);
string_id!(TriggerId);
string_id!(WebhookId);
string_id!(ApprovalId);
string_id!(CaseId);
string_id!(SlaId);

impl ExecutionId {
    /// `EXE-YYYYMMDD-<6 hex uppercase>`
    pub fn generate() -> Self {
        let date = Utc::now().format("%Y%m%d");
        Self(format!("EXE-{}-{}", date, random_hex(6)))
    }

    pub fn parse(s: &str) -> SoarResult<Self> {
        if s.starts_with("EXE-") {
            Ok(Self(s.to_string()))
        } else {
            Err(PersistenceError::NotFound(format!("malformed execution id: {}", s)).into())
        }
    }
}

impl PlaybookId {
    /// `PB-<timestamp36>-<6 hex>`
    pub fn generate() -> Self {
        Self(format!("PB-{}-{}", base36_timestamp(), random_hex(6)))
    }
}

impl CaseId {
    /// `CASE-YYYYMMDD-<4 hex>`
    pub fn generate() -> Self {
        let date = Utc::now().format("%Y%m%d");
        Self(format!("CASE-{}-{}", date, random_hex(4)))
    }
}

impl SlaId {
    /// `SLA-<suffix>-<timestamp36>`
    pub fn generate(suffix: &str) -> Self {
        Self(format!("SLA-{}-{}", suffix, base36_timestamp()))
    }
}

impl ApprovalId {
    pub fn generate() -> Self {
        Self(format!("APR-{}", random_hex(12)))
    }
}

impl TriggerId {
    pub fn generate() -> Self {
        Self(format!("TRG-{}", random_hex(12)))
    }
}

impl WebhookId {
    pub fn generate() -> Self {
        Self(format!("WHK-{}", random_hex(16)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_id_round_trips() {
        let id = ExecutionId::generate();
        assert!(id.as_str().starts_with("EXE-"));
        let parsed = ExecutionId::parse(id.as_str()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn execution_id_rejects_malformed_input() {
        assert!(ExecutionId::parse("not-an-id").is_err());
    }

    #[test]
    fn playbook_id_has_stable_prefix() {
        let id = PlaybookId::generate();
        assert!(id.as_str().starts_with("PB-"));
    }
}
