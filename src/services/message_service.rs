use chrono::{ DateTime, Utc };
use sea_orm::sea_query::{ OnConflict, Query };
use sea_orm::{ ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set };
use sha2::{ Digest, Sha256 };
use uuid::Uuid;

use crate::automation::SyncedMessage;
use crate::db::entity::{ campaign, campaign_lead, message, CampaignLead };
use crate::enums::{ LeadStatus, MessageDirection };
use crate::error::Result;

/// What one inbox sync pass did to the message store.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub inserted: usize,
    pub duplicates: usize,
    /// Leads whose sequence just got answered by a real person. The
    /// caller runs the reply transition for each.
    pub replied_leads: Vec<campaign_lead::Model>,
}

/// Persists conversation messages and turns fresh inbound ones into
/// reply signals for the lead pipeline.
#[derive(Clone)]
pub struct MessageService {
    db: DatabaseConnection,
}

impl MessageService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Content address of one message within an account. Keyed on the
    /// platform's own message id when the markup exposes one; the body
    /// otherwise. Scraped timestamps are too unstable to key on.
    pub fn dedup_key(
        account_id: Uuid,
        thread_id: &str,
        platform_msg_id: Option<&str>,
        body: &str
    ) -> String {
        let discriminator = platform_msg_id.unwrap_or(body);

        let mut hasher = Sha256::new();
        hasher.update(account_id.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(thread_id.as_bytes());
        hasher.update(b"|");
        hasher.update(discriminator.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Dedup key for a scraped message. Outbound rows ignore the
    /// platform id so a re-scraped sent message lands on the row
    /// written at send time, which had no id to key on.
    fn sync_dedup_key(account_id: Uuid, item: &SyncedMessage) -> String {
        let platform_id = if item.outbound { None } else { item.platform_msg_id.as_deref() };
        Self::dedup_key(account_id, &item.thread_id, platform_id, &item.body)
    }

    /// Store everything a sync pass scraped, skipping rows already
    /// seen. Returns the leads that replied so the caller can advance
    /// them.
    pub async fn ingest(
        &self,
        account_id: Uuid,
        synced: &[SyncedMessage]
    ) -> Result<IngestSummary> {
        let mut summary = IngestSummary::default();

        for item in synced {
            let lead = match item.participant_url.as_deref() {
                Some(url) => self.find_lead_for_profile(account_id, url).await?,
                None => None,
            };

            let direction = if item.outbound {
                MessageDirection::Outbound
            } else {
                MessageDirection::Inbound
            };
            let key = Self::sync_dedup_key(account_id, item);

            let inserted = self.insert_if_new(
                account_id,
                lead.as_ref().map(|l| l.id),
                &item.thread_id,
                direction,
                &item.body,
                item.sent_at,
                &key
            ).await?;

            if !inserted {
                summary.duplicates += 1;
                continue;
            }
            summary.inserted += 1;

            if item.outbound {
                continue;
            }
            if let Some(lead) = lead {
                let status = lead.status.parse::<LeadStatus>().unwrap_or(LeadStatus::Pending);
                let already_queued = summary.replied_leads.iter().any(|l| l.id == lead.id);
                if
                    matches!(status, LeadStatus::Messaged | LeadStatus::AwaitingReply) &&
                    !already_queued
                {
                    summary.replied_leads.push(lead);
                }
            }
        }

        Ok(summary)
    }

    /// Record a message this engine just sent, so the next inbox sync
    /// recognizes it instead of treating it as new.
    pub async fn record_outbound(
        &self,
        account_id: Uuid,
        lead_id: Option<Uuid>,
        thread_id: &str,
        body: &str
    ) -> Result<()> {
        let key = Self::dedup_key(account_id, thread_id, None, body);
        self.insert_if_new(
            account_id,
            lead_id,
            thread_id,
            MessageDirection::Outbound,
            body,
            Utc::now(),
            &key
        ).await?;
        Ok(())
    }

    /// Match a conversation partner back to a lead of this account's
    /// campaigns. Profile URLs are compared with and without the
    /// trailing slash.
    async fn find_lead_for_profile(
        &self,
        account_id: Uuid,
        profile_url: &str
    ) -> Result<Option<campaign_lead::Model>> {
        let campaigns_of_account = Query::select()
            .column(campaign::Column::Id)
            .from(campaign::Entity)
            .and_where(campaign::Column::AccountId.eq(account_id))
            .to_owned();

        let trimmed = profile_url.trim_end_matches('/');
        let variants = [trimmed.to_string(), format!("{}/", trimmed)];

        let lead = CampaignLead::find()
            .filter(campaign_lead::Column::ProfileUrl.is_in(variants))
            .filter(campaign_lead::Column::CampaignId.in_subquery(campaigns_of_account))
            .one(&self.db).await?;

        Ok(lead)
    }

    async fn insert_if_new(
        &self,
        account_id: Uuid,
        lead_id: Option<Uuid>,
        thread_id: &str,
        direction: MessageDirection,
        body: &str,
        sent_at: DateTime<Utc>,
        dedup_key: &str
    ) -> Result<bool> {
        let model = message::ActiveModel {
            id: Set(Uuid::new_v4()),
            account_id: Set(account_id),
            lead_id: Set(lead_id),
            thread_id: Set(thread_id.to_string()),
            direction: Set(direction.to_string()),
            body: Set(body.to_string()),
            sent_at: Set(sent_at),
            dedup_key: Set(dedup_key.to_string()),
            created_at: Set(Utc::now()),
        };

        let inserted = message::Entity
            ::insert(model)
            .on_conflict(OnConflict::column(message::Column::DedupKey).do_nothing().to_owned())
            .exec_without_returning(&self.db).await?;

        Ok(inserted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_prefers_platform_id() {
        let account = Uuid::new_v4();
        let with_id = MessageService::dedup_key(account, "t-1", Some("urn:li:msg:9"), "hello");
        let edited = MessageService::dedup_key(account, "t-1", Some("urn:li:msg:9"), "hello!!");
        // Same platform id means same message, even if the body moved
        assert_eq!(with_id, edited);
    }

    #[test]
    fn test_dedup_key_falls_back_to_body() {
        let account = Uuid::new_v4();
        let a = MessageService::dedup_key(account, "t-1", None, "hello");
        let b = MessageService::dedup_key(account, "t-1", None, "hello");
        let c = MessageService::dedup_key(account, "t-1", None, "different");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_dedup_key_scopes_by_account_and_thread() {
        let account = Uuid::new_v4();
        let other_account = Uuid::new_v4();
        let base = MessageService::dedup_key(account, "t-1", None, "hello");
        assert_ne!(base, MessageService::dedup_key(other_account, "t-1", None, "hello"));
        assert_ne!(base, MessageService::dedup_key(account, "t-2", None, "hello"));
    }

    #[test]
    fn test_outbound_sync_rows_match_send_time_key() {
        let account = Uuid::new_v4();
        let item = SyncedMessage {
            thread_id: "t-1".to_string(),
            participant_url: Some("https://www.linkedin.com/in/lead/".to_string()),
            platform_msg_id: Some("urn:li:msg:42".to_string()),
            body: "hi, thanks for connecting".to_string(),
            sent_at: Utc::now(),
            outbound: true,
        };

        // The row written at send time had no platform id, so the
        // scraped copy must key on the body to collide with it.
        let send_time_key = MessageService::dedup_key(account, "t-1", None, &item.body);
        assert_eq!(MessageService::sync_dedup_key(account, &item), send_time_key);

        // Inbound messages keep using the platform id.
        let inbound = SyncedMessage { outbound: false, ..item };
        assert_eq!(
            MessageService::sync_dedup_key(account, &inbound),
            MessageService::dedup_key(account, "t-1", Some("urn:li:msg:42"), &inbound.body)
        );
    }

    #[test]
    fn test_dedup_key_is_hex_sha256() {
        let key = MessageService::dedup_key(Uuid::new_v4(), "t", None, "x");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
