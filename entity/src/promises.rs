use crate::{contacts, pipeline_stages, studios};
use sea_orm::prelude::{Date, DateTimeWithTimeZone, *};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "promises")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub studio_id: Uuid,
    #[sea_orm(indexed)]
    pub contact_id: Uuid,
    pub event_type_id: Option<Uuid>,
    #[sea_orm(indexed)]
    pub pipeline_stage_id: Uuid,
    pub event_date: Option<Date>,
    /// JSON array of ISO-8601 dates.
    pub tentative_dates: Json,
    pub notes: Option<String>,
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
        belongs_to = "contacts::Entity",
        from = "Column::ContactId",
        to = "contacts::Column::Id"
    )]
    Contact,
    #[sea_orm(
        belongs_to = "pipeline_stages::Entity",
        from = "Column::PipelineStageId",
        to = "pipeline_stages::Column::Id"
    )]
    PipelineStage,
    #[sea_orm(has_many = "super::quotations::Entity")]
    Quotation,
    #[sea_orm(has_many = "super::promise_logs::Entity")]
    PromiseLog,
}

impl Related<studios::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Studio.def()
    }
}

impl Related<contacts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contact.def()
    }
}

impl Related<pipeline_stages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PipelineStage.def()
    }
}

impl Related<super::quotations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotation.def()
    }
}

impl Related<super::promise_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PromiseLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
