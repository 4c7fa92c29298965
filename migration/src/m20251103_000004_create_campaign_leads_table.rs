use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(CampaignLead::Table)
                .if_not_exists()
                .col(ColumnDef::new(CampaignLead::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(CampaignLead::CampaignId).uuid().not_null())
                .col(ColumnDef::new(CampaignLead::ContactId).uuid().null())
                .col(ColumnDef::new(CampaignLead::ProfileUrl).string().not_null())
                .col(ColumnDef::new(CampaignLead::FullName).string().null())
                .col(ColumnDef::new(CampaignLead::Headline).string().null())
                .col(ColumnDef::new(CampaignLead::Status).string_len(32).not_null())
                .col(ColumnDef::new(CampaignLead::CurrentStep).integer().not_null().default(0))
                .col(ColumnDef::new(CampaignLead::AcceptanceChecks).integer().not_null().default(0))
                .col(ColumnDef::new(CampaignLead::ErrorCount).integer().not_null().default(0))
                .col(ColumnDef::new(CampaignLead::ErrorMessage).text().null())
                .col(ColumnDef::new(CampaignLead::LastActionAt).timestamp_with_time_zone().null())
                .col(ColumnDef::new(CampaignLead::NextActionAt).timestamp_with_time_zone().null())
                .col(ColumnDef::new(CampaignLead::RepliedAt).timestamp_with_time_zone().null())
                .col(
                    ColumnDef::new(CampaignLead::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .col(
                    ColumnDef::new(CampaignLead::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_campaign_leads_campaign")
                        .from(CampaignLead::Table, CampaignLead::CampaignId)
                        .to(Campaign::Table, Campaign::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_campaign_leads_campaign")
                .table(CampaignLead::Table)
                .col(CampaignLead::CampaignId)
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_campaign_leads_status")
                .table(CampaignLead::Table)
                .col(CampaignLead::Status)
                .to_owned()
        ).await?;

        // Scheduler scans on due leads
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_campaign_leads_next_action")
                .table(CampaignLead::Table)
                .col(CampaignLead::NextActionAt)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CampaignLead::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CampaignLead {
    Table,
    Id,
    CampaignId,
    ContactId,
    ProfileUrl,
    FullName,
    Headline,
    Status,
    CurrentStep,
    AcceptanceChecks,
    ErrorCount,
    ErrorMessage,
    LastActionAt,
    NextActionAt,
    RepliedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Campaign {
    Table,
    Id,
}
