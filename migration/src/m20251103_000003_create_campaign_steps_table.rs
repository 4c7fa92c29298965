use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(CampaignStep::Table)
                .if_not_exists()
                .col(ColumnDef::new(CampaignStep::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(CampaignStep::CampaignId).uuid().not_null())
                .col(ColumnDef::new(CampaignStep::StepOrder).integer().not_null())
                .col(ColumnDef::new(CampaignStep::Kind).string_len(32).not_null())
                .col(ColumnDef::new(CampaignStep::DelayDays).integer().not_null().default(0))
                .col(ColumnDef::new(CampaignStep::DelayHours).integer().not_null().default(0))
                .col(ColumnDef::new(CampaignStep::Template).text().null())
                .col(
                    ColumnDef::new(CampaignStep::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_campaign_steps_campaign")
                        .from(CampaignStep::Table, CampaignStep::CampaignId)
                        .to(Campaign::Table, Campaign::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_campaign_steps_campaign_order")
                .table(CampaignStep::Table)
                .col(CampaignStep::CampaignId)
                .col(CampaignStep::StepOrder)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CampaignStep::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CampaignStep {
    Table,
    Id,
    CampaignId,
    StepOrder,
    Kind,
    DelayDays,
    DelayHours,
    Template,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Campaign {
    Table,
    Id,
}
