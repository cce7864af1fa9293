use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PipelineStages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PipelineStages::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PipelineStages::StudioId).uuid().not_null())
                    .col(ColumnDef::new(PipelineStages::Name).string_len(64).not_null())
                    .col(ColumnDef::new(PipelineStages::Slug).string_len(64).not_null())
                    .col(ColumnDef::new(PipelineStages::Color).string_len(16).not_null())
                    .col(ColumnDef::new(PipelineStages::SortOrder).integer().not_null())
                    .col(
                        ColumnDef::new(PipelineStages::IsSystem)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PipelineStages::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PipelineStages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PipelineStages::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pipeline_stages_studio")
                            .from(PipelineStages::Table, PipelineStages::StudioId)
                            .to(Studios::Table, Studios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_pipeline_stages_studio_slug")
                    .table(PipelineStages::Table)
                    .col(PipelineStages::StudioId)
                    .col(PipelineStages::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Promises::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Promises::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Promises::StudioId).uuid().not_null())
                    .col(ColumnDef::new(Promises::ContactId).uuid().not_null())
                    .col(ColumnDef::new(Promises::EventTypeId).uuid().null())
                    .col(ColumnDef::new(Promises::PipelineStageId).uuid().not_null())
                    .col(ColumnDef::new(Promises::EventDate).date().null())
                    .col(ColumnDef::new(Promises::TentativeDates).json_binary().not_null())
                    .col(ColumnDef::new(Promises::Notes).text().null())
                    .col(
                        ColumnDef::new(Promises::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promises::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_promises_studio")
                            .from(Promises::Table, Promises::StudioId)
                            .to(Studios::Table, Studios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_promises_contact")
                            .from(Promises::Table, Promises::ContactId)
                            .to(Contacts::Table, Contacts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_promises_event_type")
                            .from(Promises::Table, Promises::EventTypeId)
                            .to(EventTypes::Table, EventTypes::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_promises_stage")
                            .from(Promises::Table, Promises::PipelineStageId)
                            .to(PipelineStages::Table, PipelineStages::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promises_studio_stage")
                    .table(Promises::Table)
                    .col(Promises::StudioId)
                    .col(Promises::PipelineStageId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PromiseStatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromiseStatusHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PromiseStatusHistory::PromiseId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PromiseStatusHistory::FromStageId).uuid().null())
                    .col(
                        ColumnDef::new(PromiseStatusHistory::ToStageId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromiseStatusHistory::FromSlug)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PromiseStatusHistory::ToSlug)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PromiseStatusHistory::Reason).text().null())
                    .col(ColumnDef::new(PromiseStatusHistory::TriggeredBy).uuid().null())
                    .col(
                        ColumnDef::new(PromiseStatusHistory::Metadata)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromiseStatusHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_promise_status_history_promise")
                            .from(PromiseStatusHistory::Table, PromiseStatusHistory::PromiseId)
                            .to(Promises::Table, Promises::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PromiseLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromiseLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PromiseLogs::PromiseId).uuid().not_null())
                    .col(ColumnDef::new(PromiseLogs::UserId).uuid().null())
                    .col(ColumnDef::new(PromiseLogs::Content).text().not_null())
                    .col(ColumnDef::new(PromiseLogs::LogType).string_len(64).not_null())
                    .col(ColumnDef::new(PromiseLogs::Metadata).json_binary().not_null())
                    .col(
                        ColumnDef::new(PromiseLogs::OriginContext)
                            .string_len(16)
                            .not_null()
                            .default("PROMISE"),
                    )
                    .col(
                        ColumnDef::new(PromiseLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromiseLogs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_promise_logs_promise")
                            .from(PromiseLogs::Table, PromiseLogs::PromiseId)
                            .to(Promises::Table, Promises::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promise_logs_promise_created")
                    .table(PromiseLogs::Table)
                    .col(PromiseLogs::PromiseId)
                    .col(PromiseLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PromiseLogs::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(PromiseStatusHistory::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Promises::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PipelineStages::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Studios {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Contacts {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum EventTypes {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum PipelineStages {
    Table,
    Id,
    StudioId,
    Name,
    Slug,
    Color,
    SortOrder,
    IsSystem,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Promises {
    Table,
    Id,
    StudioId,
    ContactId,
    EventTypeId,
    PipelineStageId,
    EventDate,
    TentativeDates,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PromiseStatusHistory {
    Table,
    Id,
    PromiseId,
    FromStageId,
    ToStageId,
    FromSlug,
    ToSlug,
    Reason,
    TriggeredBy,
    Metadata,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PromiseLogs {
    Table,
    Id,
    PromiseId,
    UserId,
    Content,
    LogType,
    Metadata,
    OriginContext,
    CreatedAt,
    UpdatedAt,
}
