use crate::studios;
use sea_orm::prelude::{Date, DateTimeWithTimeZone, *};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "offers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub studio_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_media_url: Option<String>,
    pub cover_media_type: Option<String>,
    pub is_permanent: bool,
    pub starts_on: Option<Date>,
    pub ends_on: Option<Date>,
    pub landing_content: Json,
    pub lead_form: Json,
    pub business_term_id: Option<Uuid>,
    pub is_active: bool,
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
}

impl Related<studios::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Studio.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
