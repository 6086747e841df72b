//! Proposal expiration.
//!
//! A pending proposal expires when its explicit `expires_at` has passed, or
//! when `auto_expire` is set and every consumer acknowledgment carries a
//! migration deadline that is already in the past.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::Result;
use crate::models::enums::ProposalStatus;
use crate::models::{Acknowledgment, Proposal};
use crate::services::audit::{log_event, AuditAction};
use crate::store;

/// Default expiration for a proposal created now.
pub fn default_expiration(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}

/// Whether a proposal should expire at `now`.
pub fn should_expire(
    proposal: &Proposal,
    acknowledgments: &[Acknowledgment],
    now: DateTime<Utc>,
) -> bool {
    if proposal.status != ProposalStatus::Pending {
        return false;
    }

    if let Some(expires_at) = proposal.expires_at {
        if now > expires_at {
            return true;
        }
    }

    if proposal.auto_expire && !acknowledgments.is_empty() {
        let all_deadlines_past = acknowledgments.iter().all(|ack| {
            ack.migration_deadline
                .map(|deadline| now > deadline)
                .unwrap_or(false)
        });
        if all_deadlines_past {
            return true;
        }
    }

    false
}

/// Expire every pending proposal that qualifies. Returns the expired ids.
pub async fn expire_sweep(conn: &mut PgConnection, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
    let pending = store::proposals::list_pending(conn).await?;
    let mut expired = Vec::new();

    for proposal in pending {
        let acknowledgments = store::proposals::list_acknowledgments(conn, proposal.id).await?;
        if !should_expire(&proposal, &acknowledgments, now) {
            continue;
        }

        store::proposals::resolve(conn, proposal.id, ProposalStatus::Expired).await?;
        log_event(
            conn,
            proposal.id,
            AuditAction::ProposalExpired,
            None,
            json!({
                "expires_at": proposal.expires_at,
                "auto_expire": proposal.auto_expire,
            }),
        )
        .await?;
        expired.push(proposal.id);
    }

    Ok(expired)
}

/// Periodic background task invoking [`expire_sweep`].
pub struct ExpirationSweeper {
    db: PgPool,
    interval: StdDuration,
    enabled: bool,
}

impl ExpirationSweeper {
    pub fn new(db: PgPool, settings: &Settings) -> Self {
        Self {
            db,
            interval: StdDuration::from_secs(settings.expiration_sweep_interval_secs),
            enabled: settings.proposal_auto_expire_enabled,
        }
    }

    pub async fn run(self) {
        if !self.enabled {
            info!("Proposal auto-expiration disabled");
            return;
        }
        info!(
            "Expiration sweeper started (interval {}s)",
            self.interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(expired) if expired.is_empty() => {}
                Ok(expired) => info!("Expired {} stale proposals", expired.len()),
                Err(e) => warn!("Expiration sweep failed: {}", e),
            }
        }
    }

    async fn sweep_once(&self) -> Result<Vec<Uuid>> {
        let mut tx = self.db.begin().await?;
        let expired = expire_sweep(&mut tx, Utc::now()).await?;
        tx.commit().await?;
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AckResponse;
    use tessera_engine::ChangeType;

    fn proposal(
        status: ProposalStatus,
        expires_at: Option<DateTime<Utc>>,
        auto_expire: bool,
    ) -> Proposal {
        Proposal {
            id: Uuid::new_v4(),
            asset_id: Uuid::new_v4(),
            proposed_schema: json!({"type": "object"}),
            change_type: ChangeType::Major,
            breaking_changes: json!([]),
            status,
            proposed_by: Uuid::new_v4(),
            proposed_at: Utc::now() - Duration::days(10),
            resolved_at: None,
            expires_at,
            auto_expire,
        }
    }

    fn ack(migration_deadline: Option<DateTime<Utc>>) -> Acknowledgment {
        Acknowledgment {
            id: Uuid::new_v4(),
            proposal_id: Uuid::new_v4(),
            consumer_team_id: Uuid::new_v4(),
            response: AckResponse::Migrating,
            migration_deadline,
            notes: None,
            responded_at: Utc::now(),
        }
    }

    #[test]
    fn test_explicit_expiry_in_past() {
        let now = Utc::now();
        let p = proposal(ProposalStatus::Pending, Some(now - Duration::hours(1)), false);
        assert!(should_expire(&p, &[], now));
    }

    #[test]
    fn test_future_expiry_does_not_fire() {
        let now = Utc::now();
        let p = proposal(ProposalStatus::Pending, Some(now + Duration::hours(1)), false);
        assert!(!should_expire(&p, &[], now));
    }

    #[test]
    fn test_terminal_proposal_never_expires() {
        let now = Utc::now();
        let p = proposal(
            ProposalStatus::Withdrawn,
            Some(now - Duration::hours(1)),
            true,
        );
        assert!(!should_expire(&p, &[], now));
    }

    #[test]
    fn test_auto_expire_requires_every_deadline_past() {
        let now = Utc::now();
        let p = proposal(ProposalStatus::Pending, None, true);

        let all_past = vec![
            ack(Some(now - Duration::days(2))),
            ack(Some(now - Duration::days(1))),
        ];
        assert!(should_expire(&p, &all_past, now));

        let one_future = vec![
            ack(Some(now - Duration::days(2))),
            ack(Some(now + Duration::days(1))),
        ];
        assert!(!should_expire(&p, &one_future, now));

        let missing_deadline = vec![ack(Some(now - Duration::days(2))), ack(None)];
        assert!(!should_expire(&p, &missing_deadline, now));
    }

    #[test]
    fn test_auto_expire_without_acks_does_not_fire() {
        let now = Utc::now();
        let p = proposal(ProposalStatus::Pending, None, true);
        assert!(!should_expire(&p, &[], now));
    }

    #[test]
    fn test_default_expiration_window() {
        let now = Utc::now();
        assert_eq!(default_expiration(now, 30), now + Duration::days(30));
    }
}
