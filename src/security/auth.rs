//! Webhook Authenticator (§4.B): load-by-id, enabled check, constant-time
//! secret comparison.

use crate::domain::ids::WebhookId;
use crate::domain::webhook::Webhook;
use crate::error::IngestionError;
use crate::persistence::WebhookStore;
use subtle::ConstantTimeEq;

pub async fn authenticate(
    store: &dyn WebhookStore,
    webhook_id: &WebhookId,
    presented_secret: &str,
) -> Result<Webhook, IngestionError> {
    let webhook = store
        .get(webhook_id)
        .await
        .map_err(|_| IngestionError::UnknownWebhook)?
        .ok_or(IngestionError::UnknownWebhook)?;

    if !webhook.enabled {
        return Err(IngestionError::WebhookDisabled);
    }

    if webhook.secret.as_bytes().ct_eq(presented_secret.as_bytes()).into() {
        Ok(webhook)
    } else {
        Err(IngestionError::InvalidSecret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::PlaybookId;
    use crate::persistence::memory::InMemoryStore;

    #[tokio::test]
    async fn correct_secret_authenticates() {
        let store = InMemoryStore::new();
        let webhook = Webhook::new(PlaybookId::generate(), "correct-horse-battery-staple".into());
        WebhookStore::save(&store, &webhook).await.unwrap();

        let result = authenticate(&store, &webhook.webhook_id, "correct-horse-battery-staple").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let store = InMemoryStore::new();
        let webhook = Webhook::new(PlaybookId::generate(), "correct-horse-battery-staple".into());
        WebhookStore::save(&store, &webhook).await.unwrap();

        let result = authenticate(&store, &webhook.webhook_id, "wrong").await;
        assert_eq!(result.unwrap_err(), IngestionError::InvalidSecret);
    }

    #[tokio::test]
    async fn disabled_webhook_is_rejected() {
        let store = InMemoryStore::new();
        let mut webhook = Webhook::new(PlaybookId::generate(), "secret".into());
        webhook.enabled = false;
        WebhookStore::save(&store, &webhook).await.unwrap();

        let result = authenticate(&store, &webhook.webhook_id, "secret").await;
        assert_eq!(result.unwrap_err(), IngestionError::WebhookDisabled);
    }

    #[tokio::test]
    async fn unknown_webhook_is_rejected() {
        let store = InMemoryStore::new();
        let result = authenticate(&store, &WebhookId::generate(), "secret").await;
        assert_eq!(result.unwrap_err(), IngestionError::UnknownWebhook);
    }
}
