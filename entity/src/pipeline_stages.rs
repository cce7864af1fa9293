use crate::studios;
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

/// Slug of the system stage a promise lands in once a quotation is authorized.
pub const APPROVED_SLUG: &str = "approved";
/// Slug of the system stage used for archived promises.
pub const ARCHIVED_SLUG: &str = "archived";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pipeline_stages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub studio_id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub sort_order: i32,
    pub is_system: bool,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_approved(&self) -> bool {
        self.is_system && self.slug == APPROVED_SLUG
    }

    pub fn is_archived(&self) -> bool {
        self.slug == ARCHIVED_SLUG
    }
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
    #[sea_orm(has_many = "super::promises::Entity")]
    Promise,
}

impl Related<studios::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Studio.def()
    }
}

impl Related<super::promises::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promise.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
