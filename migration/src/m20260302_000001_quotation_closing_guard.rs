use sea_orm_migration::sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

// Partial indexes are shared syntax between Postgres and SQLite.
const UP_SQL: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS uq_quotations_active_per_promise
    ON quotations (promise_id)
    WHERE status = 'en_cierre'
       OR (status IN ('aprobada', 'autorizada', 'approved') AND event_id IS NOT NULL)
"#;

const DOWN_SQL: &str = "DROP INDEX IF EXISTS uq_quotations_active_per_promise";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(UP_SQL)
            .await
            .map(|_| ())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await
            .map(|_| ())
    }
}
