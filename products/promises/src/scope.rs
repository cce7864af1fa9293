use entity::studios;
use platform_db::{find_studio_by_slug, find_studio_user};
use sea_orm::ConnectionTrait;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

/// Tenant boundary for every pipeline operation: the studio plus the acting
/// studio user, when the caller could be resolved to one.
#[derive(Clone, Debug)]
pub struct StudioScope {
    pub studio: studios::Model,
    pub actor: Option<Uuid>,
}

impl StudioScope {
    pub fn new(studio: studios::Model, actor: Option<Uuid>) -> Self {
        Self { studio, actor }
    }

    /// Looks up the studio by slug and maps the platform user onto its studio
    /// user. Unknown users still get a scope, with no actor attached.
    pub async fn resolve<C>(
        conn: &C,
        studio_slug: &str,
        platform_user_id: Option<Uuid>,
    ) -> ServiceResult<Self>
    where
        C: ConnectionTrait,
    {
        let studio = find_studio_by_slug(conn, studio_slug)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("estudio {studio_slug} no existe")))?;
        let actor = match platform_user_id {
            Some(user_id) => find_studio_user(conn, studio.id, user_id)
                .await?
                .map(|user| user.id),
            None => None,
        };
        Ok(Self { studio, actor })
    }

    pub fn studio_id(&self) -> Uuid {
        self.studio.id
    }

    pub fn slug(&self) -> &str {
        &self.studio.slug
    }
}
