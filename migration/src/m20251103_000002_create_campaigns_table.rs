use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Campaign::Table)
                .if_not_exists()
                .col(ColumnDef::new(Campaign::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Campaign::TenantId).string().not_null())
                .col(ColumnDef::new(Campaign::AccountId).uuid().not_null())
                .col(ColumnDef::new(Campaign::Name).string().not_null())
                .col(ColumnDef::new(Campaign::Status).string_len(32).not_null())
                .col(ColumnDef::new(Campaign::DailyActionCap).integer().not_null())
                .col(ColumnDef::new(Campaign::TotalLeads).integer().not_null().default(0))
                .col(ColumnDef::new(Campaign::SentCount).integer().not_null().default(0))
                .col(ColumnDef::new(Campaign::AcceptedCount).integer().not_null().default(0))
                .col(ColumnDef::new(Campaign::RepliedCount).integer().not_null().default(0))
                .col(
                    ColumnDef::new(Campaign::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .col(
                    ColumnDef::new(Campaign::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_campaigns_account")
                        .from(Campaign::Table, Campaign::AccountId)
                        .to(Account::Table, Account::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_campaigns_account")
                .table(Campaign::Table)
                .col(Campaign::AccountId)
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_campaigns_status")
                .table(Campaign::Table)
                .col(Campaign::Status)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Campaign::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Campaign {
    Table,
    Id,
    TenantId,
    AccountId,
    Name,
    Status,
    DailyActionCap,
    TotalLeads,
    SentCount,
    AcceptedCount,
    RepliedCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Account {
    Table,
    Id,
}
