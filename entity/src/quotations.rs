use crate::promises;
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "quotations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub studio_id: Uuid,
    #[sea_orm(indexed)]
    pub promise_id: Uuid,
    pub name: String,
    pub status: Status,
    pub price_cents: i64,
    pub discount_cents: i64,
    pub business_term_id: Option<Uuid>,
    pub visible_to_client: bool,
    pub sort_order: i32,
    /// Set only once the quotation is authorized and an event is generated.
    pub event_id: Option<Uuid>,
    pub revision_status: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Closing, or authorized with an event attached. At most one per promise.
    pub fn is_active_with_event(&self) -> bool {
        self.status == Status::Closing || (self.status.is_authorized() && self.event_id.is_some())
    }
}

#[derive(
    Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum Status {
    #[sea_orm(string_value = "pendiente")]
    Pending,
    #[sea_orm(string_value = "negociacion")]
    Negotiation,
    #[sea_orm(string_value = "en_cierre")]
    Closing,
    #[sea_orm(string_value = "aprobada")]
    Approved,
    #[sea_orm(string_value = "autorizada")]
    Authorized,
    /// Legacy spelling still present in older rows.
    #[sea_orm(string_value = "approved")]
    ApprovedLegacy,
    #[sea_orm(string_value = "archivada")]
    Archived,
    #[sea_orm(string_value = "cancelada")]
    Cancelled,
}

impl Status {
    pub fn is_authorized(self) -> bool {
        matches!(
            self,
            Status::Approved | Status::Authorized | Status::ApprovedLegacy
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pendiente",
            Status::Negotiation => "negociacion",
            Status::Closing => "en_cierre",
            Status::Approved => "aprobada",
            Status::Authorized => "autorizada",
            Status::ApprovedLegacy => "approved",
            Status::Archived => "archivada",
            Status::Cancelled => "cancelada",
        }
    }
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
