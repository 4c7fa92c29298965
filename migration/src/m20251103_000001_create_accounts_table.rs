use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Account::Table)
                .if_not_exists()
                .col(ColumnDef::new(Account::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Account::TenantId).string().not_null())
                .col(ColumnDef::new(Account::DisplayName).string().not_null())
                .col(ColumnDef::new(Account::ProfileUrl).string().null())
                .col(ColumnDef::new(Account::Status).string_len(32).not_null())
                .col(ColumnDef::new(Account::EncryptedSession).text().null())
                .col(ColumnDef::new(Account::EncryptedCredentials).text().null())
                .col(ColumnDef::new(Account::ConnectionsToday).integer().not_null().default(0))
                .col(ColumnDef::new(Account::MessagesToday).integer().not_null().default(0))
                .col(ColumnDef::new(Account::ViewsToday).integer().not_null().default(0))
                .col(ColumnDef::new(Account::DailyConnectionLimit).integer().not_null())
                .col(ColumnDef::new(Account::DailyMessageLimit).integer().not_null())
                .col(ColumnDef::new(Account::DailyViewLimit).integer().not_null())
                .col(ColumnDef::new(Account::CountersResetOn).date().not_null())
                .col(ColumnDef::new(Account::WarmingUp).boolean().not_null().default(false))
                .col(ColumnDef::new(Account::WarmupDay).integer().not_null().default(0))
                .col(ColumnDef::new(Account::LastVerifiedAt).timestamp_with_time_zone().null())
                .col(ColumnDef::new(Account::LastSyncedAt).timestamp_with_time_zone().null())
                .col(ColumnDef::new(Account::ErrorCode).string().null())
                .col(ColumnDef::new(Account::ErrorMessage).text().null())
                .col(ColumnDef::new(Account::LockedAt).timestamp_with_time_zone().null())
                .col(ColumnDef::new(Account::LockedBy).string().null())
                .col(
                    ColumnDef::new(Account::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .col(
                    ColumnDef::new(Account::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .to_owned()
        ).await?;

        // Create index on tenant_id
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_accounts_tenant")
                .table(Account::Table)
                .col(Account::TenantId)
                .to_owned()
        ).await?;

        // Create index on status
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_accounts_status")
                .table(Account::Table)
                .col(Account::Status)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Account::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Account {
    Table,
    Id,
    TenantId,
    DisplayName,
    ProfileUrl,
    Status,
    EncryptedSession,
    EncryptedCredentials,
    ConnectionsToday,
    MessagesToday,
    ViewsToday,
    DailyConnectionLimit,
    DailyMessageLimit,
    DailyViewLimit,
    CountersResetOn,
    WarmingUp,
    WarmupDay,
    LastVerifiedAt,
    LastSyncedAt,
    ErrorCode,
    ErrorMessage,
    LockedAt,
    LockedBy,
    CreatedAt,
    UpdatedAt,
}
