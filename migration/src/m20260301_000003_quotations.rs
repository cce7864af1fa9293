use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Quotations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Quotations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Quotations::StudioId).uuid().not_null())
                    .col(ColumnDef::new(Quotations::PromiseId).uuid().not_null())
                    .col(ColumnDef::new(Quotations::Name).string().not_null())
                    .col(
                        ColumnDef::new(Quotations::Status)
                            .string_len(32)
                            .not_null()
                            .default("pendiente"),
                    )
                    .col(
                        ColumnDef::new(Quotations::PriceCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Quotations::DiscountCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Quotations::BusinessTermId).uuid().null())
                    .col(
                        ColumnDef::new(Quotations::VisibleToClient)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Quotations::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Quotations::EventId).uuid().null())
                    .col(ColumnDef::new(Quotations::RevisionStatus).string_len(32).null())
                    .col(
                        ColumnDef::new(Quotations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Quotations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quotations_promise")
                            .from(Quotations::Table, Quotations::PromiseId)
                            .to(Promises::Table, Promises::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quotations_business_term")
                            .from(Quotations::Table, Quotations::BusinessTermId)
                            .to(BusinessTerms::Table, BusinessTerms::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_quotations_promise_order")
                    .table(Quotations::Table)
                    .col(Quotations::PromiseId)
                    .col(Quotations::SortOrder)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Events::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Events::StudioId).uuid().not_null())
                    .col(ColumnDef::new(Events::PromiseId).uuid().not_null())
                    .col(ColumnDef::new(Events::QuotationId).uuid().null())
                    .col(ColumnDef::new(Events::EventDate).date().null())
                    .col(
                        ColumnDef::new(Events::Status)
                            .string_len(16)
                            .not_null()
                            .default("activo"),
                    )
                    .col(
                        ColumnDef::new(Events::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_events_promise")
                            .from(Events::Table, Events::PromiseId)
                            .to(Promises::Table, Promises::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AgendaEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AgendaEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AgendaEntries::StudioId).uuid().not_null())
                    .col(ColumnDef::new(AgendaEntries::PromiseId).uuid().null())
                    .col(ColumnDef::new(AgendaEntries::EventId).uuid().null())
                    .col(
                        ColumnDef::new(AgendaEntries::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AgendaEntries::Subject).string().not_null())
                    .col(ColumnDef::new(AgendaEntries::Notes).text().null())
                    .col(
                        ColumnDef::new(AgendaEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_agenda_entries_promise")
                    .table(AgendaEntries::Table)
                    .col(AgendaEntries::PromiseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_agenda_entries_event")
                    .table(AgendaEntries::Table)
                    .col(AgendaEntries::EventId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AgendaEntries::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Quotations::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Promises {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum BusinessTerms {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Quotations {
    Table,
    Id,
    StudioId,
    PromiseId,
    Name,
    Status,
    PriceCents,
    DiscountCents,
    BusinessTermId,
    VisibleToClient,
    SortOrder,
    EventId,
    RevisionStatus,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    StudioId,
    PromiseId,
    QuotationId,
    EventDate,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AgendaEntries {
    Table,
    Id,
    StudioId,
    PromiseId,
    EventId,
    ScheduledAt,
    Subject,
    Notes,
    CreatedAt,
}
