//! Promise intake, edits, agenda and removal.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use entity::{
    acquisition_channels, agenda_entries, contacts, event_types, events, pipeline_stages,
    promise_logs, promise_status_history, promises, quotations, social_networks,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::{Value, json};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::cache::CacheBus;
use crate::error::{ServiceError, ServiceResult};
use crate::logs::{self, LogAction, LogEntry};
use crate::scope::StudioScope;
use crate::stages::first_open_stage;

pub const SOCIAL_NETWORK_REQUIRED: &str = "Selecciona la red social por la que llegó el prospecto";
pub const MIN_PHONE_DIGITS: usize = 10;

#[derive(Clone, Debug, Default)]
pub struct ContactInput {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct NewPromise {
    /// Reuse an existing contact; otherwise `contact` is created.
    pub contact_id: Option<Uuid>,
    pub contact: Option<ContactInput>,
    pub acquisition_channel_id: Option<Uuid>,
    pub social_network_id: Option<Uuid>,
    pub event_type_id: Option<Uuid>,
    pub pipeline_stage_id: Option<Uuid>,
    pub event_date: Option<NaiveDate>,
    pub tentative_dates: Vec<NaiveDate>,
    pub notes: Option<String>,
}

/// `None` leaves a field untouched; `Some(None)` clears nullable ones.
#[derive(Clone, Debug, Default)]
pub struct PromiseUpdate {
    pub event_type_id: Option<Option<Uuid>>,
    pub event_date: Option<Option<NaiveDate>>,
    pub tentative_dates: Option<Vec<NaiveDate>>,
    pub notes: Option<Option<String>>,
    pub contact: Option<ContactInput>,
}

#[derive(Clone, Debug)]
pub struct NewAgendaEntry {
    pub scheduled_at: DateTime<Utc>,
    pub subject: String,
    pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeletedPromise {
    pub quotations: u64,
    pub events: u64,
    pub agenda_entries: u64,
    pub logs: u64,
}

/// Keeps digits only; shorter numbers are rejected.
pub fn normalize_phone(raw: &str) -> ServiceResult<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(ServiceError::validation(format!(
            "El teléfono debe tener al menos {MIN_PHONE_DIGITS} dígitos"
        )));
    }
    Ok(digits)
}

pub fn tentative_dates(promise: &promises::Model) -> Vec<NaiveDate> {
    serde_json::from_value(promise.tentative_dates.clone()).unwrap_or_default()
}

fn dates_json(dates: &[NaiveDate]) -> Value {
    let mut sorted: Vec<NaiveDate> = dates.to_vec();
    sorted.sort();
    sorted.dedup();
    json!(sorted)
}

fn clean(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn is_social_channel(channel: &acquisition_channels::Model) -> bool {
    let name = channel.name.to_lowercase();
    name.contains("social") || name.contains("redes")
}

pub async fn find_promise<C>(
    conn: &C,
    scope: &StudioScope,
    promise_id: Uuid,
) -> ServiceResult<promises::Model>
where
    C: ConnectionTrait,
{
    promises::Entity::find_by_id(promise_id)
        .filter(promises::Column::StudioId.eq(scope.studio_id()))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("la promesa no existe"))
}

pub async fn find_contact<C>(
    conn: &C,
    scope: &StudioScope,
    contact_id: Uuid,
) -> ServiceResult<contacts::Model>
where
    C: ConnectionTrait,
{
    contacts::Entity::find_by_id(contact_id)
        .filter(contacts::Column::StudioId.eq(scope.studio_id()))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("el contacto no existe"))
}

async fn check_event_type<C>(
    conn: &C,
    scope: &StudioScope,
    event_type_id: Uuid,
) -> ServiceResult<()>
where
    C: ConnectionTrait,
{
    event_types::Entity::find_by_id(event_type_id)
        .filter(event_types::Column::StudioId.eq(scope.studio_id()))
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::not_found("el tipo de evento no existe"))
}

/// Validated contact source for a new promise.
enum ContactSource {
    Existing(contacts::Model),
    New {
        input: ContactInput,
        phone: String,
        acquisition_channel_id: Option<Uuid>,
        social_network_id: Option<Uuid>,
    },
}

async fn validate_new_promise<C>(
    conn: &C,
    scope: &StudioScope,
    input: &NewPromise,
) -> ServiceResult<(ContactSource, pipeline_stages::Model)>
where
    C: ConnectionTrait,
{
    if let Some(channel_id) = input.acquisition_channel_id {
        let channel = acquisition_channels::Entity::find_by_id(channel_id)
            .filter(acquisition_channels::Column::StudioId.eq(scope.studio_id()))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("el canal de adquisición no existe"))?;
        if is_social_channel(&channel) && input.social_network_id.is_none() {
            return Err(ServiceError::validation(SOCIAL_NETWORK_REQUIRED));
        }
    }
    if let Some(network_id) = input.social_network_id {
        social_networks::Entity::find_by_id(network_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("la red social no existe"))?;
    }
    if let Some(event_type_id) = input.event_type_id {
        check_event_type(conn, scope, event_type_id).await?;
    }

    let source = match (input.contact_id, &input.contact) {
        (Some(contact_id), _) => {
            ContactSource::Existing(find_contact(conn, scope, contact_id).await?)
        }
        (None, Some(contact)) => {
            if contact.name.trim().is_empty() {
                return Err(ServiceError::validation("El nombre del contacto es obligatorio"));
            }
            ContactSource::New {
                phone: normalize_phone(&contact.phone)?,
                input: contact.clone(),
                acquisition_channel_id: input.acquisition_channel_id,
                social_network_id: input.social_network_id,
            }
        }
        (None, None) => {
            return Err(ServiceError::validation(
                "Selecciona un contacto o captura uno nuevo",
            ));
        }
    };

    let stage = match input.pipeline_stage_id {
        Some(stage_id) => {
            let stage = pipeline_stages::Entity::find_by_id(stage_id)
                .filter(pipeline_stages::Column::StudioId.eq(scope.studio_id()))
                .one(conn)
                .await?
                .ok_or_else(|| ServiceError::not_found("la etapa no existe"))?;
            if !stage.is_active {
                return Err(ServiceError::BusinessRule("la etapa está inactiva".to_string()));
            }
            stage
        }
        None => first_open_stage(conn, scope.studio_id())
            .await?
            .ok_or_else(|| ServiceError::not_found("el estudio no tiene etapas configuradas"))?,
    };

    Ok((source, stage))
}

#[instrument(skip(db, cache, scope, input), fields(studio = %scope.slug()))]
pub async fn create_promise(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    input: NewPromise,
) -> ServiceResult<promises::Model> {
    let (source, stage) = validate_new_promise(db, scope, &input).await?;

    let txn = db.begin().await?;
    let now = Utc::now();
    let contact = match source {
        ContactSource::Existing(contact) => contact,
        ContactSource::New {
            input: contact,
            phone,
            acquisition_channel_id,
            social_network_id,
        } => {
            let duplicate = contacts::Entity::find()
                .filter(contacts::Column::StudioId.eq(scope.studio_id()))
                .filter(contacts::Column::Phone.eq(phone.as_str()))
                .one(&txn)
                .await?;
            if duplicate.is_some() {
                return Err(ServiceError::Conflict(
                    "ya existe un contacto con ese teléfono".to_string(),
                ));
            }
            contacts::ActiveModel {
                id: Set(Uuid::new_v4()),
                studio_id: Set(scope.studio_id()),
                name: Set(contact.name.trim().to_string()),
                phone: Set(phone),
                email: Set(clean(contact.email)),
                acquisition_channel_id: Set(acquisition_channel_id),
                social_network_id: Set(social_network_id),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await
            .map_err(|err| {
                ServiceError::from_db_with_conflict(err, "ya existe un contacto con ese teléfono")
            })?
        }
    };

    let promise = promises::ActiveModel {
        id: Set(Uuid::new_v4()),
        studio_id: Set(scope.studio_id()),
        contact_id: Set(contact.id),
        event_type_id: Set(input.event_type_id),
        pipeline_stage_id: Set(stage.id),
        event_date: Set(input.event_date),
        tentative_dates: Set(dates_json(&input.tentative_dates)),
        notes: Set(clean(input.notes)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    logs::append(
        &txn,
        LogEntry::new(
            promise.id,
            LogAction::PromiseCreated,
            json!({ "contact_name": contact.name, "stage": stage.slug }),
        )
        .by(scope.actor),
    )
    .await?;
    txn.commit().await?;

    info!(promise_id = %promise.id, stage = %stage.slug, "promise created");
    cache.revalidate_pipeline(scope.slug());
    Ok(promise)
}

pub async fn list_promises<C>(
    conn: &C,
    scope: &StudioScope,
    stage_id: Option<Uuid>,
) -> ServiceResult<Vec<promises::Model>>
where
    C: ConnectionTrait,
{
    let mut query = promises::Entity::find()
        .filter(promises::Column::StudioId.eq(scope.studio_id()))
        .order_by_desc(promises::Column::UpdatedAt);
    if let Some(stage_id) = stage_id {
        query = query.filter(promises::Column::PipelineStageId.eq(stage_id));
    }
    Ok(query.all(conn).await?)
}

#[instrument(skip(db, cache, scope, update), fields(studio = %scope.slug()))]
pub async fn update_promise(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    promise_id: Uuid,
    update: PromiseUpdate,
) -> ServiceResult<promises::Model> {
    if let Some(Some(event_type_id)) = update.event_type_id {
        check_event_type(db, scope, event_type_id).await?;
    }
    let contact_phone = match &update.contact {
        Some(contact) => {
            if contact.name.trim().is_empty() {
                return Err(ServiceError::validation("El nombre del contacto es obligatorio"));
            }
            Some(normalize_phone(&contact.phone)?)
        }
        None => None,
    };

    let txn = db.begin().await?;
    let existing = find_promise(&txn, scope, promise_id).await?;
    let now = Utc::now();
    let mut fields: Vec<&str> = Vec::new();
    let event_date_change = update
        .event_date
        .filter(|date| *date != existing.event_date);

    let mut active: promises::ActiveModel = existing.clone().into();
    if let Some(event_type_id) = update.event_type_id {
        active.event_type_id = Set(event_type_id);
        fields.push("event_type");
    }
    if let Some(event_date) = event_date_change {
        active.event_date = Set(event_date);
    }
    if let Some(dates) = &update.tentative_dates {
        active.tentative_dates = Set(dates_json(dates));
        fields.push("tentative_dates");
    }
    if let Some(notes) = update.notes {
        active.notes = Set(clean(notes));
        fields.push("notes");
    }
    active.updated_at = Set(now.into());
    let promise = active.update(&txn).await?;

    if let (Some(contact), Some(phone)) = (update.contact, contact_phone) {
        let current = find_contact(&txn, scope, existing.contact_id).await?;
        if current.phone != phone {
            let taken = contacts::Entity::find()
                .filter(contacts::Column::StudioId.eq(scope.studio_id()))
                .filter(contacts::Column::Phone.eq(phone.as_str()))
                .filter(contacts::Column::Id.ne(current.id))
                .one(&txn)
                .await?;
            if taken.is_some() {
                return Err(ServiceError::Conflict(
                    "ya existe un contacto con ese teléfono".to_string(),
                ));
            }
        }
        let mut contact_active: contacts::ActiveModel = current.into();
        contact_active.name = Set(contact.name.trim().to_string());
        contact_active.phone = Set(phone);
        contact_active.email = Set(clean(contact.email));
        contact_active.updated_at = Set(now.into());
        contact_active.update(&txn).await.map_err(|err| {
            ServiceError::from_db_with_conflict(err, "ya existe un contacto con ese teléfono")
        })?;
        logs::append(
            &txn,
            LogEntry::new(promise_id, LogAction::ContactUpdated, json!({})).by(scope.actor),
        )
        .await?;
    }

    if let Some(event_date) = event_date_change {
        logs::append(
            &txn,
            LogEntry::new(
                promise_id,
                LogAction::EventDateUpdated,
                json!({ "event_date": event_date.map(|date| date.to_string()) }),
            )
            .by(scope.actor),
        )
        .await?;
    }
    if !fields.is_empty() {
        logs::append(
            &txn,
            LogEntry::new(promise_id, LogAction::PromiseUpdated, json!({ "fields": fields }))
                .by(scope.actor),
        )
        .await?;
    }
    txn.commit().await?;

    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(promise)
}

/// Removes the promise with its quotations, events, agenda, history and logs.
/// The contact stays.
#[instrument(skip(db, cache, scope), fields(studio = %scope.slug()))]
pub async fn delete_promise(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    promise_id: Uuid,
) -> ServiceResult<DeletedPromise> {
    let txn = db.begin().await?;
    let promise = find_promise(&txn, scope, promise_id).await?;

    let event_ids: Vec<Uuid> = events::Entity::find()
        .filter(events::Column::PromiseId.eq(promise.id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|event| event.id)
        .collect();

    let mut agenda_scope = Condition::any().add(agenda_entries::Column::PromiseId.eq(promise.id));
    if !event_ids.is_empty() {
        agenda_scope = agenda_scope.add(agenda_entries::Column::EventId.is_in(event_ids));
    }
    let agenda = agenda_entries::Entity::delete_many()
        .filter(agenda_scope)
        .exec(&txn)
        .await?;
    let quotations = quotations::Entity::delete_many()
        .filter(quotations::Column::PromiseId.eq(promise.id))
        .exec(&txn)
        .await?;
    let events = events::Entity::delete_many()
        .filter(events::Column::PromiseId.eq(promise.id))
        .exec(&txn)
        .await?;
    promise_status_history::Entity::delete_many()
        .filter(promise_status_history::Column::PromiseId.eq(promise.id))
        .exec(&txn)
        .await?;
    let logs = promise_logs::Entity::delete_many()
        .filter(promise_logs::Column::PromiseId.eq(promise.id))
        .exec(&txn)
        .await?;
    promises::Entity::delete_by_id(promise.id).exec(&txn).await?;
    txn.commit().await?;

    let deleted = DeletedPromise {
        quotations: quotations.rows_affected,
        events: events.rows_affected,
        agenda_entries: agenda.rows_affected,
        logs: logs.rows_affected,
    };
    info!(%promise_id, ?deleted, "promise deleted");
    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(deleted)
}

#[instrument(skip(db, cache, scope, input), fields(studio = %scope.slug()))]
pub async fn add_agenda_entry(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    promise_id: Uuid,
    input: NewAgendaEntry,
) -> ServiceResult<agenda_entries::Model> {
    let subject = input.subject.trim().to_string();
    if subject.is_empty() {
        return Err(ServiceError::validation("El asunto de la cita es obligatorio"));
    }

    let txn = db.begin().await?;
    find_promise(&txn, scope, promise_id).await?;
    let entry = agenda_entries::ActiveModel {
        id: Set(Uuid::new_v4()),
        studio_id: Set(scope.studio_id()),
        promise_id: Set(Some(promise_id)),
        event_id: Set(None),
        scheduled_at: Set(input.scheduled_at.into()),
        subject: Set(subject),
        notes: Set(clean(input.notes)),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;
    logs::append(
        &txn,
        LogEntry::new(
            promise_id,
            LogAction::ReminderCreated,
            json!({
                "agenda_entry_id": entry.id,
                "subject": entry.subject,
                "scheduled_at": input.scheduled_at.format("%Y-%m-%d %H:%M").to_string(),
            }),
        )
        .by(scope.actor),
    )
    .await?;
    txn.commit().await?;

    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(entry)
}

/// Agenda of a promise, including entries of its events, soonest first.
pub async fn list_agenda<C>(
    conn: &C,
    scope: &StudioScope,
    promise_id: Uuid,
) -> ServiceResult<Vec<agenda_entries::Model>>
where
    C: ConnectionTrait,
{
    find_promise(conn, scope, promise_id).await?;
    let event_ids: HashSet<Uuid> = events::Entity::find()
        .filter(events::Column::PromiseId.eq(promise_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|event| event.id)
        .collect();
    let mut condition = Condition::any().add(agenda_entries::Column::PromiseId.eq(promise_id));
    if !event_ids.is_empty() {
        condition = condition.add(agenda_entries::Column::EventId.is_in(event_ids));
    }
    let entries = agenda_entries::Entity::find()
        .filter(condition)
        .order_by_asc(agenda_entries::Column::ScheduledAt)
        .all(conn)
        .await?;
    Ok(entries)
}

/// Channels, networks and event types offered by the intake form.
pub async fn list_acquisition_channels<C>(
    conn: &C,
    scope: &StudioScope,
) -> ServiceResult<Vec<acquisition_channels::Model>>
where
    C: ConnectionTrait,
{
    let rows = acquisition_channels::Entity::find()
        .filter(acquisition_channels::Column::StudioId.eq(scope.studio_id()))
        .filter(acquisition_channels::Column::IsActive.eq(true))
        .order_by_asc(acquisition_channels::Column::Name)
        .all(conn)
        .await?;
    Ok(rows)
}

pub async fn list_social_networks<C>(conn: &C) -> ServiceResult<Vec<social_networks::Model>>
where
    C: ConnectionTrait,
{
    let rows = social_networks::Entity::find()
        .order_by_asc(social_networks::Column::Name)
        .all(conn)
        .await?;
    Ok(rows)
}

pub async fn list_event_types<C>(
    conn: &C,
    scope: &StudioScope,
) -> ServiceResult<Vec<event_types::Model>>
where
    C: ConnectionTrait,
{
    let rows = event_types::Entity::find()
        .filter(event_types::Column::StudioId.eq(scope.studio_id()))
        .order_by_asc(event_types::Column::Name)
        .all(conn)
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phones_keep_digits_only() {
        assert_eq!(normalize_phone("(55) 1234-5678").unwrap(), "5512345678");
        assert!(matches!(
            normalize_phone("123-45"),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn tentative_dates_are_sorted_and_unique() {
        let a = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        assert_eq!(dates_json(&[a, b, a]), json!(["2026-04-01", "2026-05-02"]));
    }
}
