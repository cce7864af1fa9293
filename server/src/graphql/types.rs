use async_graphql::{
    ComplexObject, Context, Enum, ID, InputObject, Json, MaybeUndefined, SimpleObject,
};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{
    acquisition_channels, agenda_entries, business_terms, contacts, event_types, events, offers,
    pipeline_stages, promise_logs, promise_status_history, promises, quotations, social_networks,
    studios,
};
use products_promises::lifecycle::{CancelMode, QuotationAction};
use products_promises::mover::MoveOutcome;
use products_promises::offers::{
    Availability, BasicInfo, LandingBlock, LeadFormConfig, MediaKind, OfferDraft,
};
use products_promises::promises::{
    ContactInput, DeletedPromise, NewAgendaEntry, NewPromise, PromiseUpdate, tentative_dates,
};
use products_promises::quotations::{Authorization, NewQuotation, QuotationUpdate};
use products_promises::stages::{NewStage, StageUpdate};
use products_promises::{ServiceError, quotations as quotation_service};
use sea_orm::{ActiveEnum, EntityTrait};
use uuid::Uuid;

use super::{database, parse_id, service_error};

fn id(value: Uuid) -> ID {
    ID::from(value.to_string())
}

pub(crate) fn parse_ids(ids: &[ID]) -> async_graphql::Result<Vec<Uuid>> {
    ids.iter().map(parse_id).collect()
}

pub(crate) fn parse_optional(value: &Option<ID>) -> async_graphql::Result<Option<Uuid>> {
    value.as_ref().map(parse_id).transpose()
}

/// `undefined` keeps the stored value, `null` clears it.
fn patch<T>(value: MaybeUndefined<T>) -> Option<Option<T>> {
    match value {
        MaybeUndefined::Undefined => None,
        MaybeUndefined::Null => Some(None),
        MaybeUndefined::Value(inner) => Some(Some(inner)),
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum QuotationStatus {
    Pending,
    Negotiation,
    Closing,
    Approved,
    Authorized,
    ApprovedLegacy,
    Archived,
    Cancelled,
}

impl From<quotations::Status> for QuotationStatus {
    fn from(value: quotations::Status) -> Self {
        match value {
            quotations::Status::Pending => QuotationStatus::Pending,
            quotations::Status::Negotiation => QuotationStatus::Negotiation,
            quotations::Status::Closing => QuotationStatus::Closing,
            quotations::Status::Approved => QuotationStatus::Approved,
            quotations::Status::Authorized => QuotationStatus::Authorized,
            quotations::Status::ApprovedLegacy => QuotationStatus::ApprovedLegacy,
            quotations::Status::Archived => QuotationStatus::Archived,
            quotations::Status::Cancelled => QuotationStatus::Cancelled,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum QuotationActionKind {
    MoveToClosing,
    CancelClosing,
    StartNegotiation,
    EndNegotiation,
    Authorize,
    Archive,
    Unarchive,
    CancelQuotationOnly,
    CancelWithEvent,
}

impl From<QuotationAction> for QuotationActionKind {
    fn from(value: QuotationAction) -> Self {
        match value {
            QuotationAction::MoveToClosing => QuotationActionKind::MoveToClosing,
            QuotationAction::CancelClosing => QuotationActionKind::CancelClosing,
            QuotationAction::StartNegotiation => QuotationActionKind::StartNegotiation,
            QuotationAction::EndNegotiation => QuotationActionKind::EndNegotiation,
            QuotationAction::Authorize => QuotationActionKind::Authorize,
            QuotationAction::Archive => QuotationActionKind::Archive,
            QuotationAction::Unarchive => QuotationActionKind::Unarchive,
            QuotationAction::Cancel(CancelMode::QuotationOnly) => {
                QuotationActionKind::CancelQuotationOnly
            }
            QuotationAction::Cancel(CancelMode::WithEvent) => QuotationActionKind::CancelWithEvent,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(name = "CancelMode")]
pub enum CancelModeKind {
    QuotationOnly,
    WithEvent,
}

impl From<CancelModeKind> for CancelMode {
    fn from(value: CancelModeKind) -> Self {
        match value {
            CancelModeKind::QuotationOnly => CancelMode::QuotationOnly,
            CancelModeKind::WithEvent => CancelMode::WithEvent,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum LogOrigin {
    #[default]
    Promise,
    Event,
}

impl From<promise_logs::OriginContext> for LogOrigin {
    fn from(value: promise_logs::OriginContext) -> Self {
        match value {
            promise_logs::OriginContext::Promise => LogOrigin::Promise,
            promise_logs::OriginContext::Event => LogOrigin::Event,
        }
    }
}

impl From<LogOrigin> for promise_logs::OriginContext {
    fn from(value: LogOrigin) -> Self {
        match value {
            LogOrigin::Promise => promise_logs::OriginContext::Promise,
            LogOrigin::Event => promise_logs::OriginContext::Event,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum CoverMediaKind {
    Image,
    Video,
}

impl From<CoverMediaKind> for MediaKind {
    fn from(value: CoverMediaKind) -> Self {
        match value {
            CoverMediaKind::Image => MediaKind::Image,
            CoverMediaKind::Video => MediaKind::Video,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Studio")]
pub struct StudioNode {
    pub id: ID,
    pub slug: String,
    pub name: String,
}

impl From<studios::Model> for StudioNode {
    fn from(model: studios::Model) -> Self {
        Self {
            id: id(model.id),
            slug: model.slug,
            name: model.name,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Stage")]
pub struct StageNode {
    pub id: ID,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub order: i32,
    pub is_system: bool,
    pub is_active: bool,
}

impl From<pipeline_stages::Model> for StageNode {
    fn from(model: pipeline_stages::Model) -> Self {
        Self {
            id: id(model.id),
            name: model.name,
            slug: model.slug,
            color: model.color,
            order: model.sort_order,
            is_system: model.is_system,
            is_active: model.is_active,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Contact")]
pub struct ContactNode {
    pub id: ID,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub acquisition_channel_id: Option<ID>,
    pub social_network_id: Option<ID>,
}

impl From<contacts::Model> for ContactNode {
    fn from(model: contacts::Model) -> Self {
        Self {
            id: id(model.id),
            name: model.name,
            phone: model.phone,
            email: model.email,
            acquisition_channel_id: model.acquisition_channel_id.map(id),
            social_network_id: model.social_network_id.map(id),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Promise", complex)]
pub struct PromiseNode {
    pub id: ID,
    pub contact_id: ID,
    pub event_type_id: Option<ID>,
    pub pipeline_stage_id: ID,
    pub event_date: Option<NaiveDate>,
    pub tentative_dates: Vec<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[graphql(skip)]
    contact_uuid: Uuid,
}

#[ComplexObject]
impl PromiseNode {
    async fn contact(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<ContactNode>> {
        let db = database(ctx)?;
        let contact = contacts::Entity::find_by_id(self.contact_uuid)
            .one(db)
            .await
            .map_err(|err| service_error(ServiceError::from(err)))?;
        Ok(contact.map(Into::into))
    }
}

impl From<promises::Model> for PromiseNode {
    fn from(model: promises::Model) -> Self {
        Self {
            id: id(model.id),
            contact_id: id(model.contact_id),
            event_type_id: model.event_type_id.map(id),
            pipeline_stage_id: id(model.pipeline_stage_id),
            event_date: model.event_date,
            tentative_dates: tentative_dates(&model),
            notes: model.notes,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            contact_uuid: model.contact_id,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Quotation", complex)]
pub struct QuotationNode {
    pub id: ID,
    pub promise_id: ID,
    pub name: String,
    pub status: QuotationStatus,
    pub price_cents: i64,
    pub discount_cents: i64,
    pub business_term_id: Option<ID>,
    pub visible_to_client: bool,
    pub order: i32,
    pub event_id: Option<ID>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[graphql(skip)]
    model: quotations::Model,
}

#[ComplexObject]
impl QuotationNode {
    /// Transitions the lifecycle currently allows for this quotation.
    async fn available_actions(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<QuotationActionKind>> {
        let db = database(ctx)?;
        let actions = quotation_service::available_actions(db, &self.model)
            .await
            .map_err(service_error)?;
        Ok(actions.into_iter().map(Into::into).collect())
    }
}

impl From<quotations::Model> for QuotationNode {
    fn from(model: quotations::Model) -> Self {
        Self {
            id: id(model.id),
            promise_id: id(model.promise_id),
            name: model.name.clone(),
            status: model.status.into(),
            price_cents: model.price_cents,
            discount_cents: model.discount_cents,
            business_term_id: model.business_term_id.map(id),
            visible_to_client: model.visible_to_client,
            order: model.sort_order,
            event_id: model.event_id.map(id),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
            model,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Event")]
pub struct EventNode {
    pub id: ID,
    pub promise_id: ID,
    pub quotation_id: Option<ID>,
    pub event_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<events::Model> for EventNode {
    fn from(model: events::Model) -> Self {
        Self {
            id: id(model.id),
            promise_id: id(model.promise_id),
            quotation_id: model.quotation_id.map(id),
            event_date: model.event_date,
            status: model.status.to_value(),
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PromiseLog")]
pub struct LogNode {
    pub id: ID,
    pub promise_id: ID,
    pub user_id: Option<ID>,
    pub content: String,
    pub log_type: String,
    pub metadata: Json<serde_json::Value>,
    pub origin: LogOrigin,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<promise_logs::Model> for LogNode {
    fn from(model: promise_logs::Model) -> Self {
        Self {
            id: id(model.id),
            promise_id: id(model.promise_id),
            user_id: model.user_id.map(id),
            content: model.content,
            log_type: model.log_type,
            metadata: Json(model.metadata),
            origin: model.origin_context.into(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "StageHistory")]
pub struct HistoryNode {
    pub id: ID,
    pub promise_id: ID,
    pub from_stage_id: Option<ID>,
    pub to_stage_id: ID,
    pub from_slug: Option<String>,
    pub to_slug: String,
    pub reason: Option<String>,
    pub triggered_by: Option<ID>,
    pub metadata: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<promise_status_history::Model> for HistoryNode {
    fn from(model: promise_status_history::Model) -> Self {
        Self {
            id: id(model.id),
            promise_id: id(model.promise_id),
            from_stage_id: model.from_stage_id.map(id),
            to_stage_id: id(model.to_stage_id),
            from_slug: model.from_slug,
            to_slug: model.to_slug,
            reason: model.reason,
            triggered_by: model.triggered_by.map(id),
            metadata: Json(model.metadata),
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "AgendaEntry")]
pub struct AgendaNode {
    pub id: ID,
    pub promise_id: Option<ID>,
    pub event_id: Option<ID>,
    pub scheduled_at: DateTime<Utc>,
    pub subject: String,
    pub notes: Option<String>,
}

impl From<agenda_entries::Model> for AgendaNode {
    fn from(model: agenda_entries::Model) -> Self {
        Self {
            id: id(model.id),
            promise_id: model.promise_id.map(id),
            event_id: model.event_id.map(id),
            scheduled_at: model.scheduled_at.into(),
            subject: model.subject,
            notes: model.notes,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "BusinessTerm")]
pub struct BusinessTermNode {
    pub id: ID,
    pub name: String,
    pub discount_percent: i16,
    pub advance_percent: i16,
}

impl From<business_terms::Model> for BusinessTermNode {
    fn from(model: business_terms::Model) -> Self {
        Self {
            id: id(model.id),
            name: model.name,
            discount_percent: model.discount_percent,
            advance_percent: model.advance_percent,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Offer")]
pub struct OfferNode {
    pub id: ID,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub cover_media_url: Option<String>,
    pub cover_media_type: Option<String>,
    pub is_permanent: bool,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub landing: Json<serde_json::Value>,
    pub lead_form: Json<serde_json::Value>,
    pub business_term_id: Option<ID>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<offers::Model> for OfferNode {
    fn from(model: offers::Model) -> Self {
        Self {
            id: id(model.id),
            name: model.name,
            slug: model.slug,
            description: model.description,
            cover_media_url: model.cover_media_url,
            cover_media_type: model.cover_media_type,
            is_permanent: model.is_permanent,
            starts_on: model.starts_on,
            ends_on: model.ends_on,
            landing: Json(model.landing_content),
            lead_form: Json(model.lead_form),
            business_term_id: model.business_term_id.map(id),
            is_active: model.is_active,
            updated_at: model.updated_at.into(),
        }
    }
}

/// Lookup rows the intake form offers.
#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "CatalogEntry")]
pub struct CatalogNode {
    pub id: ID,
    pub name: String,
}

impl From<acquisition_channels::Model> for CatalogNode {
    fn from(model: acquisition_channels::Model) -> Self {
        Self {
            id: id(model.id),
            name: model.name,
        }
    }
}

impl From<social_networks::Model> for CatalogNode {
    fn from(model: social_networks::Model) -> Self {
        Self {
            id: id(model.id),
            name: model.name,
        }
    }
}

impl From<event_types::Model> for CatalogNode {
    fn from(model: event_types::Model) -> Self {
        Self {
            id: id(model.id),
            name: model.name,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct MoveResult {
    pub promise: PromiseNode,
    pub from_stage: Option<StageNode>,
    pub to_stage: StageNode,
    pub changed: bool,
}

impl From<MoveOutcome> for MoveResult {
    fn from(outcome: MoveOutcome) -> Self {
        Self {
            promise: outcome.promise.into(),
            from_stage: outcome.from_stage.map(Into::into),
            to_stage: outcome.to_stage.into(),
            changed: outcome.changed,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AuthorizationResult {
    pub quotation: QuotationNode,
    pub event: EventNode,
    pub stage_move: Option<MoveResult>,
}

impl From<Authorization> for AuthorizationResult {
    fn from(value: Authorization) -> Self {
        Self {
            quotation: value.quotation.into(),
            event: value.event.into(),
            stage_move: value.stage_move.map(Into::into),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct DeletedPromiseResult {
    pub quotations: u64,
    pub events: u64,
    pub agenda_entries: u64,
    pub logs: u64,
}

impl From<DeletedPromise> for DeletedPromiseResult {
    fn from(value: DeletedPromise) -> Self {
        Self {
            quotations: value.quotations,
            events: value.events,
            agenda_entries: value.agenda_entries,
            logs: value.logs,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct ContactFields {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl From<ContactFields> for ContactInput {
    fn from(value: ContactFields) -> Self {
        Self {
            name: value.name,
            phone: value.phone,
            email: value.email,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct NewPromiseInput {
    pub contact_id: Option<ID>,
    pub contact: Option<ContactFields>,
    pub acquisition_channel_id: Option<ID>,
    pub social_network_id: Option<ID>,
    pub event_type_id: Option<ID>,
    pub pipeline_stage_id: Option<ID>,
    pub event_date: Option<NaiveDate>,
    #[graphql(default)]
    pub tentative_dates: Vec<NaiveDate>,
    pub notes: Option<String>,
}

impl NewPromiseInput {
    pub fn into_new_promise(self) -> async_graphql::Result<NewPromise> {
        Ok(NewPromise {
            contact_id: parse_optional(&self.contact_id)?,
            contact: self.contact.map(Into::into),
            acquisition_channel_id: parse_optional(&self.acquisition_channel_id)?,
            social_network_id: parse_optional(&self.social_network_id)?,
            event_type_id: parse_optional(&self.event_type_id)?,
            pipeline_stage_id: parse_optional(&self.pipeline_stage_id)?,
            event_date: self.event_date,
            tentative_dates: self.tentative_dates,
            notes: self.notes,
        })
    }
}

#[derive(InputObject, Clone, Default)]
pub struct UpdatePromiseInput {
    pub event_type_id: MaybeUndefined<ID>,
    pub event_date: MaybeUndefined<NaiveDate>,
    pub tentative_dates: Option<Vec<NaiveDate>>,
    pub notes: MaybeUndefined<String>,
    pub contact: Option<ContactFields>,
}

impl UpdatePromiseInput {
    pub fn into_update(self) -> async_graphql::Result<PromiseUpdate> {
        let event_type_id = match patch(self.event_type_id) {
            Some(Some(raw)) => Some(Some(parse_id(&raw)?)),
            Some(None) => Some(None),
            None => None,
        };
        Ok(PromiseUpdate {
            event_type_id,
            event_date: patch(self.event_date),
            tentative_dates: self.tentative_dates,
            notes: patch(self.notes),
            contact: self.contact.map(Into::into),
        })
    }
}

#[derive(InputObject, Clone)]
pub struct AgendaInput {
    pub scheduled_at: DateTime<Utc>,
    pub subject: String,
    pub notes: Option<String>,
}

impl From<AgendaInput> for NewAgendaEntry {
    fn from(value: AgendaInput) -> Self {
        Self {
            scheduled_at: value.scheduled_at,
            subject: value.subject,
            notes: value.notes,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct NewStageInput {
    pub name: String,
    pub color: Option<String>,
}

impl From<NewStageInput> for NewStage {
    fn from(value: NewStageInput) -> Self {
        Self {
            name: value.name,
            color: value.color,
        }
    }
}

#[derive(InputObject, Clone, Default)]
pub struct UpdateStageInput {
    pub name: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdateStageInput> for StageUpdate {
    fn from(value: UpdateStageInput) -> Self {
        Self {
            name: value.name,
            color: value.color,
            is_active: value.is_active,
        }
    }
}

#[derive(InputObject, Clone)]
pub struct NewQuotationInput {
    pub promise_id: ID,
    pub name: String,
    pub price_cents: i64,
    #[graphql(default)]
    pub discount_cents: i64,
    pub business_term_id: Option<ID>,
    #[graphql(default)]
    pub visible_to_client: bool,
}

impl NewQuotationInput {
    pub fn into_new_quotation(self) -> async_graphql::Result<NewQuotation> {
        Ok(NewQuotation {
            promise_id: parse_id(&self.promise_id)?,
            name: self.name,
            price_cents: self.price_cents,
            discount_cents: self.discount_cents,
            business_term_id: parse_optional(&self.business_term_id)?,
            visible_to_client: self.visible_to_client,
        })
    }
}

#[derive(InputObject, Clone, Default)]
pub struct UpdateQuotationInput {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub business_term_id: MaybeUndefined<ID>,
}

impl UpdateQuotationInput {
    pub fn into_update(self) -> async_graphql::Result<QuotationUpdate> {
        let business_term_id = match patch(self.business_term_id) {
            Some(Some(raw)) => Some(Some(parse_id(&raw)?)),
            Some(None) => Some(None),
            None => None,
        };
        Ok(QuotationUpdate {
            name: self.name,
            price_cents: self.price_cents,
            discount_cents: self.discount_cents,
            business_term_id,
        })
    }
}

#[derive(InputObject, Clone)]
pub struct BusinessTermInput {
    pub name: String,
    #[graphql(default)]
    pub discount_percent: i16,
    #[graphql(default)]
    pub advance_percent: i16,
}

/// Full offer draft. `isPermanent` excludes `startsOn`/`endsOn`.
#[derive(InputObject, Clone)]
pub struct OfferInput {
    pub name: String,
    #[graphql(default)]
    pub slug: String,
    pub description: Option<String>,
    pub cover_media_url: Option<String>,
    pub cover_media_type: Option<CoverMediaKind>,
    #[graphql(default = true)]
    pub is_permanent: bool,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub business_term_id: Option<ID>,
    #[graphql(default = true)]
    pub is_active: bool,
    pub landing: Option<Json<Vec<LandingBlock>>>,
    pub lead_form: Option<Json<LeadFormConfig>>,
}

impl OfferInput {
    pub fn into_draft(self) -> async_graphql::Result<OfferDraft> {
        let availability = match (self.is_permanent, self.starts_on, self.ends_on) {
            (true, None, None) => Availability::Permanent,
            (false, Some(starts_on), Some(ends_on)) => Availability::Window { starts_on, ends_on },
            (true, _, _) => {
                return Err(service_error(ServiceError::validation(
                    "Una oferta permanente no lleva fechas de vigencia",
                )));
            }
            (false, _, _) => {
                return Err(service_error(ServiceError::validation(
                    "Indica la fecha de inicio y de fin de la oferta",
                )));
            }
        };
        Ok(OfferDraft {
            basic: BasicInfo {
                name: self.name,
                slug: self.slug,
                description: self.description,
                cover_media_url: self.cover_media_url,
                cover_media_type: self.cover_media_type.map(Into::into),
                availability,
                business_term_id: parse_optional(&self.business_term_id)?,
                is_active: self.is_active,
            },
            landing: self.landing.map(|blocks| blocks.0).unwrap_or_default(),
            lead_form: self.lead_form.map(|form| form.0).unwrap_or_default(),
        })
    }
}
