use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Action::Table)
                .if_not_exists()
                .col(ColumnDef::new(Action::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Action::AccountId).uuid().not_null())
                .col(ColumnDef::new(Action::LeadId).uuid().null())
                .col(ColumnDef::new(Action::Kind).string_len(32).not_null())
                .col(ColumnDef::new(Action::TargetUrl).string().null())
                .col(ColumnDef::new(Action::Payload).text().null())
                .col(ColumnDef::new(Action::Status).string_len(32).not_null())
                .col(ColumnDef::new(Action::Priority).integer().not_null().default(0))
                .col(ColumnDef::new(Action::ScheduledAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(Action::AttemptCount).integer().not_null().default(0))
                .col(ColumnDef::new(Action::MaxAttempts).integer().not_null().default(3))
                .col(ColumnDef::new(Action::StartedAt).timestamp_with_time_zone().null())
                .col(ColumnDef::new(Action::CompletedAt).timestamp_with_time_zone().null())
                .col(ColumnDef::new(Action::Result).text().null())
                .col(ColumnDef::new(Action::ErrorCode).string().null())
                .col(ColumnDef::new(Action::ErrorMessage).text().null())
                .col(
                    ColumnDef::new(Action::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .col(
                    ColumnDef::new(Action::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_actions_account")
                        .from(Action::Table, Action::AccountId)
                        .to(Account::Table, Account::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_actions_lead")
                        .from(Action::Table, Action::LeadId)
                        .to(CampaignLead::Table, CampaignLead::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        // Executor pulls due work per account
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_actions_account_status")
                .table(Action::Table)
                .col(Action::AccountId)
                .col(Action::Status)
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_actions_status_scheduled")
                .table(Action::Table)
                .col(Action::Status)
                .col(Action::ScheduledAt)
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_actions_lead")
                .table(Action::Table)
                .col(Action::LeadId)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Action::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Action {
    Table,
    Id,
    AccountId,
    LeadId,
    Kind,
    TargetUrl,
    Payload,
    Status,
    Priority,
    ScheduledAt,
    AttemptCount,
    MaxAttempts,
    StartedAt,
    CompletedAt,
    Result,
    ErrorCode,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Account {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum CampaignLead {
    Table,
    Id,
}
