//! Webhook delivery tracking and the background dispatch worker.
//!
//! Enqueueing happens inside the originating transaction; delivery is
//! fire-and-forget from the handler's perspective and runs on its own
//! timeout. At-least-once: consumers must de-duplicate on `payload.id`.

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{RegistryError, Result};
use crate::models::WebhookDelivery;
use crate::store;

/// Queue a delivery for the configured endpoint. A missing endpoint makes
/// this a no-op.
pub async fn enqueue_event(
    conn: &mut PgConnection,
    settings: &Settings,
    event_type: &str,
    payload: Value,
) -> Result<Option<WebhookDelivery>> {
    let Some(url) = settings.webhook_url.as_deref() else {
        return Ok(None);
    };
    let delivery = store::webhooks::enqueue(conn, event_type, &payload, url).await?;
    debug!(delivery_id = %delivery.id, event_type, "Webhook delivery enqueued");
    Ok(Some(delivery))
}

/// Background worker that drives pending deliveries to completion.
pub struct WebhookWorker {
    db: PgPool,
    http: reqwest::Client,
    max_attempts: i32,
    poll_interval: Duration,
}

impl WebhookWorker {
    pub fn new(db: PgPool, settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.webhook_timeout_secs))
            .build()
            .map_err(|e| RegistryError::Internal(format!("webhook client build failed: {e}")))?;
        Ok(Self {
            db,
            http,
            max_attempts: settings.webhook_max_attempts,
            poll_interval: Duration::from_secs(settings.webhook_poll_interval_secs),
        })
    }

    /// Poll loop. Runs until the process shuts down.
    pub async fn run(self) {
        info!(
            "Webhook worker started (poll interval {}s)",
            self.poll_interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            match self.dispatch_pending().await {
                Ok(0) => {}
                Ok(count) => info!("Dispatched {} webhook deliveries", count),
                Err(e) => warn!("Webhook dispatch pass failed: {}", e),
            }
        }
    }

    /// Attempt every pending delivery once. Returns how many were attempted.
    pub async fn dispatch_pending(&self) -> Result<usize> {
        let mut conn = self.db.acquire().await?;
        let pending = store::webhooks::fetch_pending(&mut conn, self.max_attempts, 20).await?;
        drop(conn);

        let attempted = pending.len();
        for delivery in pending {
            self.attempt(&delivery).await?;
        }
        Ok(attempted)
    }

    async fn attempt(&self, delivery: &WebhookDelivery) -> Result<()> {
        let now = Utc::now();
        let response = self
            .http
            .post(&delivery.url)
            .json(&delivery.payload)
            .send()
            .await;

        let mut conn = self.db.acquire().await?;
        match response {
            Ok(response) if response.status().is_success() => {
                store::webhooks::mark_delivered(
                    &mut conn,
                    delivery.id,
                    response.status().as_u16() as i32,
                    now,
                )
                .await?;
                debug!(delivery_id = %delivery.id, "Webhook delivered");
            }
            Ok(response) => {
                let status = response.status().as_u16() as i32;
                let body = response.text().await.unwrap_or_default();
                store::webhooks::mark_failed_attempt(
                    &mut conn,
                    delivery.id,
                    Some(status),
                    &format!("endpoint returned {status}: {body}"),
                    self.max_attempts,
                    now,
                )
                .await?;
                warn!(delivery_id = %delivery.id, status, "Webhook attempt failed");
            }
            Err(e) => {
                store::webhooks::mark_failed_attempt(
                    &mut conn,
                    delivery.id,
                    None,
                    &e.to_string(),
                    self.max_attempts,
                    now,
                )
                .await?;
                warn!(delivery_id = %delivery.id, "Webhook attempt errored: {}", e);
            }
        }
        Ok(())
    }
}
