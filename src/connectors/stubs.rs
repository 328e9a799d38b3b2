//! Two illustrative stub connectors used by this core's own tests (§4.L).
//! Real connectors (VirusTotal, firewall, Slack) are registered by the
//! embedding application.

use crate::connectors::{ConnectorCapability, ConnectorError, ConnectorOutput};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Mimics an IP-reputation enrichment lookup (e.g. AbuseIPDB). Returns a
/// deterministic score derived from the looked-up address so tests can
/// exercise both the high- and low-score branches of a condition step.
#[derive(Default)]
pub struct EnrichmentStub;

#[async_trait]
impl ConnectorCapability for EnrichmentStub {
    async fn invoke(
        &self,
        action_type: &str,
        inputs: &HashMap<String, Value>,
        _deadline: Duration,
    ) -> Result<ConnectorOutput, ConnectorError> {
        if action_type != "lookup" {
            return Err(ConnectorError::UnknownAction(action_type.to_string(), "enrichment_stub".into()));
        }
        let ip = inputs.get("ip").and_then(Value::as_str).unwrap_or("");
        // Deterministic stand-in for a real reputation score: addresses
        // ending in an octet >= 100 are treated as malicious.
        let last_octet: u32 = ip.rsplit('.').next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let score = if last_octet >= 100 { 95 } else { 10 };
        Ok(ConnectorOutput {
            data: json!({ "abuse_score": score }),
        })
    }
}

/// Mimics a firewall block action.
#[derive(Default)]
pub struct FirewallStub;

#[async_trait]
impl ConnectorCapability for FirewallStub {
    async fn invoke(
        &self,
        action_type: &str,
        inputs: &HashMap<String, Value>,
        _deadline: Duration,
    ) -> Result<ConnectorOutput, ConnectorError> {
        if action_type != "block" {
            return Err(ConnectorError::UnknownAction(action_type.to_string(), "firewall_stub".into()));
        }
        let ip = inputs.get("ip").and_then(Value::as_str).unwrap_or("").to_string();
        Ok(ConnectorOutput {
            data: json!({ "status": "blocked", "ip": ip }),
        })
    }
}
