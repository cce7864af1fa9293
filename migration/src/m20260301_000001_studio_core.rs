use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Studios::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Studios::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Studios::Slug)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Studios::Name).string().not_null())
                    .col(
                        ColumnDef::new(Studios::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StudioUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StudioUsers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StudioUsers::StudioId).uuid().not_null())
                    .col(
                        ColumnDef::new(StudioUsers::PlatformUserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StudioUsers::DisplayName).string().not_null())
                    .col(
                        ColumnDef::new(StudioUsers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(StudioUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_studio_users_studio")
                            .from(StudioUsers::Table, StudioUsers::StudioId)
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
                    .name("uq_studio_users_platform_user")
                    .table(StudioUsers::Table)
                    .col(StudioUsers::StudioId)
                    .col(StudioUsers::PlatformUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SocialNetworks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SocialNetworks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SocialNetworks::Name).string().not_null())
                    .col(
                        ColumnDef::new(SocialNetworks::Slug)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AcquisitionChannels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AcquisitionChannels::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AcquisitionChannels::StudioId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AcquisitionChannels::Name)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AcquisitionChannels::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_acquisition_channels_studio")
                            .from(AcquisitionChannels::Table, AcquisitionChannels::StudioId)
                            .to(Studios::Table, Studios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventTypes::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EventTypes::StudioId).uuid().not_null())
                    .col(ColumnDef::new(EventTypes::Name).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_types_studio")
                            .from(EventTypes::Table, EventTypes::StudioId)
                            .to(Studios::Table, Studios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BusinessTerms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BusinessTerms::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BusinessTerms::StudioId).uuid().not_null())
                    .col(ColumnDef::new(BusinessTerms::Name).string().not_null())
                    .col(
                        ColumnDef::new(BusinessTerms::DiscountPercent)
                            .small_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BusinessTerms::AdvancePercent)
                            .small_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BusinessTerms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_business_terms_studio")
                            .from(BusinessTerms::Table, BusinessTerms::StudioId)
                            .to(Studios::Table, Studios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Contacts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Contacts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Contacts::StudioId).uuid().not_null())
                    .col(ColumnDef::new(Contacts::Name).string().not_null())
                    .col(ColumnDef::new(Contacts::Phone).string_len(32).not_null())
                    .col(ColumnDef::new(Contacts::Email).string().null())
                    .col(ColumnDef::new(Contacts::AcquisitionChannelId).uuid().null())
                    .col(ColumnDef::new(Contacts::SocialNetworkId).uuid().null())
                    .col(
                        ColumnDef::new(Contacts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contacts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contacts_studio")
                            .from(Contacts::Table, Contacts::StudioId)
                            .to(Studios::Table, Studios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contacts_acquisition_channel")
                            .from(Contacts::Table, Contacts::AcquisitionChannelId)
                            .to(AcquisitionChannels::Table, AcquisitionChannels::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contacts_social_network")
                            .from(Contacts::Table, Contacts::SocialNetworkId)
                            .to(SocialNetworks::Table, SocialNetworks::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_contacts_studio_phone")
                    .table(Contacts::Table)
                    .col(Contacts::StudioId)
                    .col(Contacts::Phone)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contacts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BusinessTerms::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EventTypes::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(AcquisitionChannels::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(SocialNetworks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudioUsers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Studios::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Studios {
    Table,
    Id,
    Slug,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum StudioUsers {
    Table,
    Id,
    StudioId,
    PlatformUserId,
    DisplayName,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SocialNetworks {
    Table,
    Id,
    Name,
    Slug,
}

#[derive(DeriveIden)]
enum AcquisitionChannels {
    Table,
    Id,
    StudioId,
    Name,
    IsActive,
}

#[derive(DeriveIden)]
enum EventTypes {
    Table,
    Id,
    StudioId,
    Name,
}

#[derive(DeriveIden)]
enum BusinessTerms {
    Table,
    Id,
    StudioId,
    Name,
    DiscountPercent,
    AdvancePercent,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Contacts {
    Table,
    Id,
    StudioId,
    Name,
    Phone,
    Email,
    AcquisitionChannelId,
    SocialNetworkId,
    CreatedAt,
    UpdatedAt,
}
