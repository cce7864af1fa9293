use crate::promises;
use sea_orm::prelude::{Date, DateTimeWithTimeZone, *};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub studio_id: Uuid,
    #[sea_orm(indexed)]
    pub promise_id: Uuid,
    pub quotation_id: Option<Uuid>,
    pub event_date: Option<Date>,
    pub status: Status,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum Status {
    #[sea_orm(string_value = "activo")]
    Active,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "promises::Entity",
        from = "Column::PromiseId",
        to = "promises::Column::Id",
        on_delete = "Cascade"
    )]
    Promise,
}

impl Related<promises::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promise.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
