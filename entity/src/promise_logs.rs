use crate::promises;
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only audit trail. Only `user_note` rows are ever edited or removed.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "promise_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub promise_id: Uuid,
    pub user_id: Option<Uuid>,
    pub content: String,
    pub log_type: String,
    pub metadata: Json,
    pub origin_context: OriginContext,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(
    Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum OriginContext {
    #[sea_orm(string_value = "PROMISE")]
    Promise,
    #[sea_orm(string_value = "EVENT")]
    Event,
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
