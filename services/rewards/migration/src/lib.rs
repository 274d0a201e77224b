use sea_orm_migration::prelude::*;

mod m20260801_000001_create_events;
mod m20260801_000002_create_jobs;
mod m20260801_000003_create_ledger_entries;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_events::Migration),
            Box::new(m20260801_000002_create_jobs::Migration),
            Box::new(m20260801_000003_create_ledger_entries::Migration),
        ]
    }
}
