use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "studios")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub slug: String,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    PipelineStage,
    Promise,
    StudioUser,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::PipelineStage => Entity::has_many(super::pipeline_stages::Entity).into(),
            Self::Promise => Entity::has_many(super::promises::Entity).into(),
            Self::StudioUser => Entity::has_many(super::studio_users::Entity).into(),
        }
    }
}

impl Related<super::pipeline_stages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PipelineStage.def()
    }
}

impl Related<super::promises::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promise.def()
    }
}

impl Related<super::studio_users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudioUser.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
