//! Connector Capability Layer (§4.L, ambient): a narrow async trait the
//! engine depends on instead of any concrete connector implementation.

pub mod registry;
pub mod stubs;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("unknown connector '{0}'")]
    UnknownConnector(String),
    #[error("unknown action '{0}' for connector '{1}'")]
    UnknownAction(String, String),
    #[error("connector call exceeded its deadline")]
    Timeout,
    #[error("connector call failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ConnectorOutput {
    pub data: Value,
}

/// The only thing the Execution Engine knows about connectors.
#[async_trait]
pub trait ConnectorCapability: Send + Sync {
    async fn invoke(
        &self,
        action_type: &str,
        inputs: &HashMap<String, Value>,
        deadline: Duration,
    ) -> Result<ConnectorOutput, ConnectorError>;
}
