use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Message::Table)
                .if_not_exists()
                .col(ColumnDef::new(Message::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Message::AccountId).uuid().not_null())
                .col(ColumnDef::new(Message::LeadId).uuid().null())
                .col(ColumnDef::new(Message::ThreadId).string().not_null())
                .col(ColumnDef::new(Message::Direction).string_len(16).not_null())
                .col(ColumnDef::new(Message::Body).text().not_null())
                .col(ColumnDef::new(Message::SentAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(Message::DedupKey).string_len(64).not_null().unique_key())
                .col(
                    ColumnDef::new(Message::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_messages_account")
                        .from(Message::Table, Message::AccountId)
                        .to(Account::Table, Account::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_messages_lead")
                        .from(Message::Table, Message::LeadId)
                        .to(CampaignLead::Table, CampaignLead::Id)
                        .on_delete(ForeignKeyAction::SetNull)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_messages_account_thread")
                .table(Message::Table)
                .col(Message::AccountId)
                .col(Message::ThreadId)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Message::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Message {
    Table,
    Id,
    AccountId,
    LeadId,
    ThreadId,
    Direction,
    Body,
    SentAt,
    DedupKey,
    CreatedAt,
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
