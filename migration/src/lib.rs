pub use sea_orm_migration::prelude::*;

mod m20251103_000001_create_accounts_table;
mod m20251103_000002_create_campaigns_table;
mod m20251103_000003_create_campaign_steps_table;
mod m20251103_000004_create_campaign_leads_table;
mod m20251104_000001_create_actions_table;
mod m20251104_000002_create_messages_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251103_000001_create_accounts_table::Migration),
            Box::new(m20251103_000002_create_campaigns_table::Migration),
            Box::new(m20251103_000003_create_campaign_steps_table::Migration),
            Box::new(m20251103_000004_create_campaign_leads_table::Migration),
            Box::new(m20251104_000001_create_actions_table::Migration),
            Box::new(m20251104_000002_create_messages_table::Migration)
        ]
    }
}
