pub use sea_orm_migration::prelude::*;

mod m20260301_000001_studio_core;
mod m20260301_000002_pipeline;
mod m20260301_000003_quotations;
mod m20260301_000004_offers;
mod m20260302_000001_quotation_closing_guard;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_studio_core::Migration),
            Box::new(m20260301_000002_pipeline::Migration),
            Box::new(m20260301_000003_quotations::Migration),
            Box::new(m20260301_000004_offers::Migration),
            Box::new(m20260302_000001_quotation_closing_guard::Migration),
        ]
    }
}
