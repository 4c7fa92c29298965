use chrono::Duration;
use sea_orm::{ entity::prelude::*, Condition, DatabaseConnection, Set, UpdateMany };
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::enums::AccountStatus;
use crate::error::{ AppError, ErrorCode, Result };

pub mod entity;
pub use entity::*;

mod action_repository;
pub use action_repository::{ ActionRepository, NewAction };

mod campaign_repository;
pub use campaign_repository::CampaignRepository;

pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<entity::account::Model> {
        entity::account::Entity
            ::find_by_id(id)
            .one(&self.db).await?
            .ok_or(AppError::AccountNotFound)
    }

    pub async fn find_by_status(
        &self,
        status: AccountStatus
    ) -> Result<Vec<entity::account::Model>> {
        let accounts = entity::account::Entity
            ::find()
            .filter(entity::account::Column::Status.eq(status.as_str()))
            .all(&self.db).await?;

        Ok(accounts)
    }

    /// Accounts queued for an interactive login pass. Without stored
    /// credentials there is nothing the verifier can do.
    pub async fn find_verifiable(&self) -> Result<Vec<entity::account::Model>> {
        let accounts = entity::account::Entity
            ::find()
            .filter(entity::account::Column::Status.eq(AccountStatus::Verifying.as_str()))
            .filter(entity::account::Column::EncryptedCredentials.is_not_null())
            .all(&self.db).await?;

        Ok(accounts)
    }

    /// Try to take the account lease for `worker`. A lock row is free
    /// when it is unclaimed or when the previous holder's lease has
    /// aged past `lease`. Returns false when another worker holds it,
    /// which callers treat as "skip this account this cycle".
    pub async fn try_lock(
        &self,
        id: Uuid,
        worker: &str,
        lease: Duration,
        now: DateTimeUtc
    ) -> Result<bool> {
        let stale_before = now - lease;

        let result = entity::account::Entity
            ::update_many()
            .col_expr(entity::account::Column::LockedAt, Expr::value(now))
            .col_expr(entity::account::Column::LockedBy, Expr::value(worker))
            .col_expr(entity::account::Column::UpdatedAt, Expr::value(now))
            .filter(entity::account::Column::Id.eq(id))
            .filter(
                Condition::any()
                    .add(entity::account::Column::LockedAt.is_null())
                    .add(entity::account::Column::LockedAt.lt(stale_before))
            )
            .exec(&self.db).await?;

        Ok(result.rows_affected == 1)
    }

    /// Extend a lease the worker already holds, resetting its age to
    /// `now`. Long batches renew between actions so slow browser work
    /// cannot outlive the lease and invite a second holder. Returns
    /// false when the lease was lost in the meantime; the caller must
    /// stop driving the account.
    pub async fn renew_lock(&self, id: Uuid, worker: &str, now: DateTimeUtc) -> Result<bool> {
        let result = Self::renew_lock_query(id, worker, now).exec(&self.db).await?;
        Ok(result.rows_affected == 1)
    }

    fn renew_lock_query(
        id: Uuid,
        worker: &str,
        now: DateTimeUtc
    ) -> UpdateMany<entity::account::Entity> {
        entity::account::Entity
            ::update_many()
            .col_expr(entity::account::Column::LockedAt, Expr::value(now))
            .col_expr(entity::account::Column::UpdatedAt, Expr::value(now))
            .filter(entity::account::Column::Id.eq(id))
            .filter(entity::account::Column::LockedBy.eq(worker))
    }

    /// Release the lease, but only if we still hold it. A worker that
    /// overran its lease must not clobber the next holder's lock.
    pub async fn unlock(&self, id: Uuid, worker: &str, now: DateTimeUtc) -> Result<()> {
        entity::account::Entity
            ::update_many()
            .col_expr(entity::account::Column::LockedAt, Expr::value(None::<DateTimeUtc>))
            .col_expr(entity::account::Column::LockedBy, Expr::value(None::<String>))
            .col_expr(entity::account::Column::UpdatedAt, Expr::value(now))
            .filter(entity::account::Column::Id.eq(id))
            .filter(entity::account::Column::LockedBy.eq(worker))
            .exec(&self.db).await?;

        Ok(())
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: AccountStatus,
        error_code: Option<ErrorCode>,
        error_message: Option<String>
    ) -> Result<()> {
        let account = self.find_by_id(id).await?;

        let mut model: entity::account::ActiveModel = account.into();
        model.status = Set(status.as_str().to_string());
        model.error_code = Set(error_code.map(|c| c.as_str().to_string()));
        model.error_message = Set(error_message);
        model.updated_at = Set(chrono::Utc::now());
        model.update(&self.db).await?;

        Ok(())
    }

    /// Persist a freshly exported session blob.
    pub async fn save_session(
        &self,
        id: Uuid,
        encrypted_session: String,
        now: DateTimeUtc
    ) -> Result<()> {
        let account = self.find_by_id(id).await?;

        let mut model: entity::account::ActiveModel = account.into();
        model.encrypted_session = Set(Some(encrypted_session));
        model.last_verified_at = Set(Some(now));
        model.updated_at = Set(now);
        model.update(&self.db).await?;

        Ok(())
    }

    pub async fn mark_synced(&self, id: Uuid, now: DateTimeUtc) -> Result<()> {
        let account = self.find_by_id(id).await?;

        let mut model: entity::account::ActiveModel = account.into();
        model.last_synced_at = Set(Some(now));
        model.updated_at = Set(now);
        model.update(&self.db).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{ DbBackend, QueryTrait };

    use super::*;

    #[test]
    fn test_lease_renewal_only_touches_the_holders_row() {
        let id = Uuid::new_v4();
        let sql = AccountRepository::renew_lock_query(id, "host-1234-beef", chrono::Utc::now())
            .build(DbBackend::Postgres)
            .to_string();

        // The filter is the invariant: a worker that lost its lease
        // renews zero rows and knows to stand down.
        assert!(sql.contains(r#""locked_by" = 'host-1234-beef'"#), "{sql}");
        assert!(sql.contains(&id.to_string()), "{sql}");
        assert!(sql.contains(r#""locked_at""#), "{sql}");
    }
}
