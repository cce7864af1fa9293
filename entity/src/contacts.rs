use crate::{acquisition_channels, studios};
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "contacts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub studio_id: Uuid,
    pub name: String,
    /// Digits only; unique per studio.
    pub phone: String,
    pub email: Option<String>,
    pub acquisition_channel_id: Option<Uuid>,
    pub social_network_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "studios::Entity",
        from = "Column::StudioId",
        to = "studios::Column::Id",
        on_delete = "Cascade"
    )]
    Studio,
    #[sea_orm(
        belongs_to = "acquisition_channels::Entity",
        from = "Column::AcquisitionChannelId",
        to = "acquisition_channels::Column::Id",
        on_delete = "SetNull"
    )]
    AcquisitionChannel,
    #[sea_orm(has_many = "super::promises::Entity")]
    Promise,
}

impl Related<studios::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Studio.def()
    }
}

impl Related<acquisition_channels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AcquisitionChannel.def()
    }
}

impl Related<super::promises::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promise.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
