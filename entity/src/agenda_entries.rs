use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

/// Calendar entry linked to a promise, an event, or both.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "agenda_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub studio_id: Uuid,
    #[sea_orm(indexed)]
    pub promise_id: Option<Uuid>,
    #[sea_orm(indexed)]
    pub event_id: Option<Uuid>,
    pub scheduled_at: DateTimeWithTimeZone,
    pub subject: String,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
