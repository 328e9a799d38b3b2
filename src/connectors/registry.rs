//! `ConnectorRegistry` (§4.L): named, boxed connector implementations.

use crate::connectors::{ConnectorCapability, ConnectorError, ConnectorOutput};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn ConnectorCapability>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connector_id: impl Into<String>, connector: Arc<dyn ConnectorCapability>) {
        self.connectors.insert(connector_id.into(), connector);
    }

    pub async fn invoke(
        &self,
        connector_id: &str,
        action_type: &str,
        inputs: &HashMap<String, Value>,
        deadline: Duration,
    ) -> Result<ConnectorOutput, ConnectorError> {
        let connector = self
            .connectors
            .get(connector_id)
            .ok_or_else(|| ConnectorError::UnknownConnector(connector_id.to_string()))?;

        match tokio::time::timeout(deadline, connector.invoke(action_type, inputs, deadline)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectorError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::stubs::{EnrichmentStub, FirewallStub};

    #[tokio::test]
    async fn invoking_an_unregistered_connector_fails() {
        let registry = ConnectorRegistry::new();
        let result = registry
            .invoke("nope", "anything", &HashMap::new(), Duration::from_secs(1))
            .await;
        assert_eq!(result.unwrap_err(), ConnectorError::UnknownConnector("nope".into()));
    }

    #[tokio::test]
    async fn invoking_a_registered_connector_succeeds() {
        let mut registry = ConnectorRegistry::new();
        registry.register("abuseipdb", Arc::new(EnrichmentStub::default()));
        registry.register("firewall", Arc::new(FirewallStub::default()));

        let result = registry
            .invoke("abuseipdb", "lookup", &HashMap::new(), Duration::from_secs(1))
            .await;
        assert!(result.is_ok());
    }
}
