//! Offer drafts and the unsaved-changes guard of the offer editor.

use chrono::{NaiveDate, Utc};
use entity::offers;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::business_terms::find_business_term;
use crate::cache::CacheBus;
use crate::error::{ServiceError, ServiceResult};
use crate::scope::StudioScope;
use crate::stages::slugify;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// Permanent and dated availability exclude each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Permanent,
    Window { starts_on: NaiveDate, ends_on: NaiveDate },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub name: String,
    /// Derived from the name when left empty.
    pub slug: String,
    pub description: Option<String>,
    pub cover_media_url: Option<String>,
    pub cover_media_type: Option<MediaKind>,
    pub availability: Availability,
    pub business_term_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingBlock {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub content: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Phone,
    Email,
    Date,
    Select,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadFormField {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadFormConfig {
    pub title: Option<String>,
    pub fields: Vec<LeadFormField>,
    pub submit_label: Option<String>,
    pub success_message: Option<String>,
    /// Event types the prospect may choose from.
    #[serde(default)]
    pub event_type_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDraft {
    pub basic: BasicInfo,
    pub landing: Vec<LandingBlock>,
    pub lead_form: LeadFormConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DraftSection {
    Basic,
    Landing,
    LeadForm,
}

impl OfferDraft {
    /// Sections where `self` differs from `other`.
    pub fn diff(&self, other: &OfferDraft) -> Vec<DraftSection> {
        let mut sections = Vec::new();
        if self.basic != other.basic {
            sections.push(DraftSection::Basic);
        }
        if self.landing != other.landing {
            sections.push(DraftSection::Landing);
        }
        if self.lead_form != other.lead_form {
            sections.push(DraftSection::LeadForm);
        }
        sections
    }

    pub fn validate(&self) -> ServiceResult<()> {
        if self.basic.name.trim().is_empty() {
            return Err(ServiceError::validation("El nombre de la oferta es obligatorio"));
        }
        if let Availability::Window { starts_on, ends_on } = self.basic.availability {
            if ends_on < starts_on {
                return Err(ServiceError::validation(
                    "La fecha de fin no puede ser anterior a la de inicio",
                ));
            }
        }
        if self.basic.cover_media_url.is_some() != self.basic.cover_media_type.is_some() {
            return Err(ServiceError::validation(
                "La portada necesita URL y tipo de medio",
            ));
        }
        if self.resolved_slug().is_empty() {
            return Err(ServiceError::validation(
                "El slug debe contener letras o números",
            ));
        }
        Ok(())
    }

    pub fn resolved_slug(&self) -> String {
        if self.basic.slug.trim().is_empty() {
            slugify(&self.basic.name)
        } else {
            slugify(&self.basic.slug)
        }
    }

    pub fn from_model(model: &offers::Model) -> ServiceResult<Self> {
        let availability = match (model.is_permanent, model.starts_on, model.ends_on) {
            (true, _, _) => Availability::Permanent,
            (false, Some(starts_on), Some(ends_on)) => Availability::Window { starts_on, ends_on },
            _ => {
                return Err(ServiceError::validation(
                    "la oferta guardada no tiene vigencia válida",
                ));
            }
        };
        let landing = serde_json::from_value(model.landing_content.clone())
            .map_err(|err| ServiceError::validation(format!("contenido inválido: {err}")))?;
        let lead_form = serde_json::from_value(model.lead_form.clone())
            .map_err(|err| ServiceError::validation(format!("formulario inválido: {err}")))?;
        Ok(Self {
            basic: BasicInfo {
                name: model.name.clone(),
                slug: model.slug.clone(),
                description: model.description.clone(),
                cover_media_url: model.cover_media_url.clone(),
                cover_media_type: model.cover_media_type.as_deref().and_then(MediaKind::parse),
                availability,
                business_term_id: model.business_term_id,
                is_active: model.is_active,
            },
            landing,
            lead_form,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeaveDecision {
    Proceed,
    Blocked { dirty_sections: Vec<DraftSection> },
}

/// Editor state: the last persisted snapshot and the working draft.
#[derive(Clone, Debug)]
pub struct OfferEditor {
    offer_id: Option<Uuid>,
    snapshot: OfferDraft,
    draft: OfferDraft,
}

impl OfferEditor {
    pub fn new_offer() -> Self {
        Self {
            offer_id: None,
            snapshot: OfferDraft::default(),
            draft: OfferDraft::default(),
        }
    }

    pub fn open(model: &offers::Model) -> ServiceResult<Self> {
        let loaded = OfferDraft::from_model(model)?;
        Ok(Self {
            offer_id: Some(model.id),
            snapshot: loaded.clone(),
            draft: loaded,
        })
    }

    pub fn offer_id(&self) -> Option<Uuid> {
        self.offer_id
    }

    pub fn draft(&self) -> &OfferDraft {
        &self.draft
    }

    /// Replaces the working draft with a new value.
    pub fn replace(&mut self, next: OfferDraft) {
        self.draft = next;
    }

    /// Produces the next draft from the current one.
    pub fn edit(&mut self, change: impl FnOnce(&mut OfferDraft)) {
        let mut next = self.draft.clone();
        change(&mut next);
        self.draft = next;
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.snapshot
    }

    pub fn dirty_sections(&self) -> Vec<DraftSection> {
        self.draft.diff(&self.snapshot)
    }

    /// Navigation away is only allowed without unsaved changes.
    pub fn request_leave(&self) -> LeaveDecision {
        if self.is_dirty() {
            LeaveDecision::Blocked {
                dirty_sections: self.dirty_sections(),
            }
        } else {
            LeaveDecision::Proceed
        }
    }

    pub fn discard(&mut self) {
        self.draft = self.snapshot.clone();
    }

    /// Persists the draft; on success the editor is clean and navigation may continue.
    pub async fn save_then_continue(
        &mut self,
        db: &DatabaseConnection,
        cache: &CacheBus,
        scope: &StudioScope,
    ) -> ServiceResult<offers::Model> {
        let saved = match self.offer_id {
            Some(offer_id) => update_offer(db, cache, scope, offer_id, self.draft.clone()).await?,
            None => create_offer(db, cache, scope, self.draft.clone()).await?,
        };
        self.offer_id = Some(saved.id);
        self.snapshot = OfferDraft::from_model(&saved)?;
        self.draft = self.snapshot.clone();
        Ok(saved)
    }
}

async fn check_slug_free<C>(
    conn: &C,
    scope: &StudioScope,
    slug: &str,
    except: Option<Uuid>,
) -> ServiceResult<()>
where
    C: ConnectionTrait,
{
    let mut query = offers::Entity::find()
        .filter(offers::Column::StudioId.eq(scope.studio_id()))
        .filter(offers::Column::Slug.eq(slug));
    if let Some(id) = except {
        query = query.filter(offers::Column::Id.ne(id));
    }
    if query.one(conn).await?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "ya existe una oferta con el slug {slug}"
        )));
    }
    Ok(())
}

fn window(availability: Availability) -> (bool, Option<NaiveDate>, Option<NaiveDate>) {
    match availability {
        Availability::Permanent => (true, None, None),
        Availability::Window { starts_on, ends_on } => (false, Some(starts_on), Some(ends_on)),
    }
}

fn to_json<T: Serialize>(value: &T) -> ServiceResult<Value> {
    serde_json::to_value(value).map_err(|err| ServiceError::validation(err.to_string()))
}

async fn prepare(
    db: &DatabaseConnection,
    scope: &StudioScope,
    draft: &OfferDraft,
    except: Option<Uuid>,
) -> ServiceResult<String> {
    draft.validate()?;
    if let Some(term_id) = draft.basic.business_term_id {
        find_business_term(db, scope, term_id).await?;
    }
    let slug = draft.resolved_slug();
    check_slug_free(db, scope, &slug, except).await?;
    Ok(slug)
}

#[instrument(skip(db, cache, scope, draft), fields(studio = %scope.slug()))]
pub async fn create_offer(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    draft: OfferDraft,
) -> ServiceResult<offers::Model> {
    let slug = prepare(db, scope, &draft, None).await?;
    let (is_permanent, starts_on, ends_on) = window(draft.basic.availability);
    let now = Utc::now();
    let offer = offers::ActiveModel {
        id: Set(Uuid::new_v4()),
        studio_id: Set(scope.studio_id()),
        name: Set(draft.basic.name.trim().to_string()),
        slug: Set(slug),
        description: Set(draft.basic.description.clone()),
        cover_media_url: Set(draft.basic.cover_media_url.clone()),
        cover_media_type: Set(draft.basic.cover_media_type.map(|kind| kind.as_str().to_string())),
        is_permanent: Set(is_permanent),
        starts_on: Set(starts_on),
        ends_on: Set(ends_on),
        landing_content: Set(to_json(&draft.landing)?),
        lead_form: Set(to_json(&draft.lead_form)?),
        business_term_id: Set(draft.basic.business_term_id),
        is_active: Set(draft.basic.is_active),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .map_err(|err| ServiceError::from_db_with_conflict(err, "ya existe una oferta con ese slug"))?;

    info!(offer = %offer.slug, "offer created");
    cache.revalidate_path(&format!("/{}/offers/{}", scope.slug(), offer.slug));
    Ok(offer)
}

#[instrument(skip(db, cache, scope, draft), fields(studio = %scope.slug()))]
pub async fn update_offer(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    offer_id: Uuid,
    draft: OfferDraft,
) -> ServiceResult<offers::Model> {
    let existing = get_offer(db, scope, offer_id).await?;
    let slug = prepare(db, scope, &draft, Some(offer_id)).await?;
    let (is_permanent, starts_on, ends_on) = window(draft.basic.availability);

    let mut active: offers::ActiveModel = existing.into();
    active.name = Set(draft.basic.name.trim().to_string());
    active.slug = Set(slug);
    active.description = Set(draft.basic.description.clone());
    active.cover_media_url = Set(draft.basic.cover_media_url.clone());
    active.cover_media_type = Set(draft
        .basic
        .cover_media_type
        .map(|kind| kind.as_str().to_string()));
    active.is_permanent = Set(is_permanent);
    active.starts_on = Set(starts_on);
    active.ends_on = Set(ends_on);
    active.landing_content = Set(to_json(&draft.landing)?);
    active.lead_form = Set(to_json(&draft.lead_form)?);
    active.business_term_id = Set(draft.basic.business_term_id);
    active.is_active = Set(draft.basic.is_active);
    active.updated_at = Set(Utc::now().into());
    let offer = active.update(db).await.map_err(|err| {
        ServiceError::from_db_with_conflict(err, "ya existe una oferta con ese slug")
    })?;

    cache.revalidate_path(&format!("/{}/offers/{}", scope.slug(), offer.slug));
    Ok(offer)
}

pub async fn get_offer<C>(
    conn: &C,
    scope: &StudioScope,
    offer_id: Uuid,
) -> ServiceResult<offers::Model>
where
    C: ConnectionTrait,
{
    offers::Entity::find_by_id(offer_id)
        .filter(offers::Column::StudioId.eq(scope.studio_id()))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("la oferta no existe"))
}

pub async fn list_offers<C>(conn: &C, scope: &StudioScope) -> ServiceResult<Vec<offers::Model>>
where
    C: ConnectionTrait,
{
    let rows = offers::Entity::find()
        .filter(offers::Column::StudioId.eq(scope.studio_id()))
        .order_by_desc(offers::Column::UpdatedAt)
        .all(conn)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> OfferDraft {
        OfferDraft {
            basic: BasicInfo {
                name: "Sesión de primavera".into(),
                is_active: true,
                ..BasicInfo::default()
            },
            landing: vec![LandingBlock {
                id: "hero".into(),
                kind: "hero".into(),
                content: json!({ "title": "Primavera" }),
            }],
            lead_form: LeadFormConfig::default(),
        }
    }

    #[test]
    fn fresh_editor_is_clean() {
        let editor = OfferEditor::new_offer();
        assert!(!editor.is_dirty());
        assert_eq!(editor.request_leave(), LeaveDecision::Proceed);
    }

    #[test]
    fn editing_marks_only_touched_sections() {
        let mut editor = OfferEditor::new_offer();
        editor.replace(sample());
        editor.discard();
        assert!(!editor.is_dirty());

        editor.edit(|draft| draft.lead_form.title = Some("Agenda tu sesión".into()));
        assert_eq!(
            editor.request_leave(),
            LeaveDecision::Blocked {
                dirty_sections: vec![DraftSection::LeadForm]
            }
        );
    }

    #[test]
    fn reverting_an_edit_clears_dirty_state() {
        let mut editor = OfferEditor::new_offer();
        editor.edit(|draft| draft.basic.name = "x".into());
        assert!(editor.is_dirty());
        editor.edit(|draft| draft.basic.name.clear());
        assert!(!editor.is_dirty());
    }

    #[test]
    fn window_must_not_end_before_start() {
        let mut draft = sample();
        draft.basic.availability = Availability::Window {
            starts_on: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            ends_on: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        };
        assert!(matches!(draft.validate(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn slug_defaults_to_name() {
        assert_eq!(sample().resolved_slug(), "sesion-de-primavera");
    }
}
