use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Offers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Offers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Offers::StudioId).uuid().not_null())
                    .col(ColumnDef::new(Offers::Name).string().not_null())
                    .col(ColumnDef::new(Offers::Slug).string_len(96).not_null())
                    .col(ColumnDef::new(Offers::Description).text().null())
                    .col(ColumnDef::new(Offers::CoverMediaUrl).text().null())
                    .col(ColumnDef::new(Offers::CoverMediaType).string_len(16).null())
                    .col(
                        ColumnDef::new(Offers::IsPermanent)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Offers::StartsOn).date().null())
                    .col(ColumnDef::new(Offers::EndsOn).date().null())
                    .col(ColumnDef::new(Offers::LandingContent).json_binary().not_null())
                    .col(ColumnDef::new(Offers::LeadForm).json_binary().not_null())
                    .col(ColumnDef::new(Offers::BusinessTermId).uuid().null())
                    .col(
                        ColumnDef::new(Offers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Offers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Offers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offers_studio")
                            .from(Offers::Table, Offers::StudioId)
                            .to(Studios::Table, Studios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offers_business_term")
                            .from(Offers::Table, Offers::BusinessTermId)
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
                    .name("uq_offers_studio_slug")
                    .table(Offers::Table)
                    .col(Offers::StudioId)
                    .col(Offers::Slug)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Offers::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Studios {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum BusinessTerms {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Offers {
    Table,
    Id,
    StudioId,
    Name,
    Slug,
    Description,
    CoverMediaUrl,
    CoverMediaType,
    IsPermanent,
    StartsOn,
    EndsOn,
    LandingContent,
    LeadForm,
    BusinessTermId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
