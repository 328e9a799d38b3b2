//! Webhook data model (§3).

use crate::domain::ids::{PlaybookId, WebhookId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum secret length, in bytes, for a freshly generated secret.
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub webhook_id: WebhookId,
    pub playbook_id: PlaybookId,
    /// Full secret, used for constant-time comparison during authentication.
    pub secret: String,
    /// First few characters of the secret, safe to show in a UI.
    pub secret_prefix: String,
    pub enabled: bool,
    pub rate_limit_max_requests: Option<u32>,
    pub rate_limit_window_secs: Option<u64>,
    pub rotation_counter: u32,
    pub rotated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub total_requests: u64,
    pub total_accepted: u64,
    pub total_dropped: u64,
    pub total_rejected: u64,
}

impl Webhook {
    pub fn new(playbook_id: PlaybookId, secret: String) -> Self {
        let secret_prefix = secret.chars().take(8).collect();
        let now = Utc::now();
        Self {
            webhook_id: WebhookId::generate(),
            playbook_id,
            secret,
            secret_prefix,
            enabled: true,
            rate_limit_max_requests: None,
            rate_limit_window_secs: None,
            rotation_counter: 0,
            rotated_at: now,
            created_at: now,
            total_requests: 0,
            total_accepted: 0,
            total_dropped: 0,
            total_rejected: 0,
        }
    }

    /// Rotate the secret, invalidating the previous one immediately.
    pub fn rotate_secret(&mut self, new_secret: String) {
        self.secret = new_secret;
        self.secret_prefix = self.secret.chars().take(8).collect();
        self.rotation_counter += 1;
        self.rotated_at = Utc::now();
    }
}
