//! Append-only audit trail attached to each promise.

use chrono::Utc;
use entity::promise_logs::{self, OriginContext};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::{Value, json};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::cache::CacheBus;
use crate::error::{ServiceError, ServiceResult};
use crate::promises::find_promise;
use crate::scope::StudioScope;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogAction {
    PromiseCreated,
    PromiseUpdated,
    StageChange,
    PromiseArchived,
    PromiseUnarchived,
    ContactUpdated,
    EventDateUpdated,
    QuotationCreated,
    QuotationUpdated,
    QuotationNegotiationStarted,
    QuotationNegotiationEnded,
    QuotationClosingStarted,
    QuotationClosingCancelled,
    QuotationAuthorized,
    QuotationArchived,
    QuotationUnarchived,
    QuotationCancelled,
    QuotationDeleted,
    QuotationVisibilityChanged,
    QuotationsReordered,
    ReminderCreated,
    UserNote,
}

impl LogAction {
    pub const ALL: [LogAction; 22] = [
        LogAction::PromiseCreated,
        LogAction::PromiseUpdated,
        LogAction::StageChange,
        LogAction::PromiseArchived,
        LogAction::PromiseUnarchived,
        LogAction::ContactUpdated,
        LogAction::EventDateUpdated,
        LogAction::QuotationCreated,
        LogAction::QuotationUpdated,
        LogAction::QuotationNegotiationStarted,
        LogAction::QuotationNegotiationEnded,
        LogAction::QuotationClosingStarted,
        LogAction::QuotationClosingCancelled,
        LogAction::QuotationAuthorized,
        LogAction::QuotationArchived,
        LogAction::QuotationUnarchived,
        LogAction::QuotationCancelled,
        LogAction::QuotationDeleted,
        LogAction::QuotationVisibilityChanged,
        LogAction::QuotationsReordered,
        LogAction::ReminderCreated,
        LogAction::UserNote,
    ];

    pub fn key(self) -> &'static str {
        match self {
            LogAction::PromiseCreated => "promise_created",
            LogAction::PromiseUpdated => "promise_updated",
            LogAction::StageChange => "stage_change",
            LogAction::PromiseArchived => "promise_archived",
            LogAction::PromiseUnarchived => "promise_unarchived",
            LogAction::ContactUpdated => "contact_updated",
            LogAction::EventDateUpdated => "event_date_updated",
            LogAction::QuotationCreated => "quotation_created",
            LogAction::QuotationUpdated => "quotation_updated",
            LogAction::QuotationNegotiationStarted => "quotation_negotiation_started",
            LogAction::QuotationNegotiationEnded => "quotation_negotiation_ended",
            LogAction::QuotationClosingStarted => "quotation_closing_started",
            LogAction::QuotationClosingCancelled => "quotation_closing_cancelled",
            LogAction::QuotationAuthorized => "quotation_authorized",
            LogAction::QuotationArchived => "quotation_archived",
            LogAction::QuotationUnarchived => "quotation_unarchived",
            LogAction::QuotationCancelled => "quotation_cancelled",
            LogAction::QuotationDeleted => "quotation_deleted",
            LogAction::QuotationVisibilityChanged => "quotation_visibility_changed",
            LogAction::QuotationsReordered => "quotations_reordered",
            LogAction::ReminderCreated => "reminder_created",
            LogAction::UserNote => "user_note",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        // Older rows still carry the agenda spelling.
        if key == "agenda_created" {
            return Some(LogAction::ReminderCreated);
        }
        Self::ALL.into_iter().find(|action| action.key() == key)
    }

    /// Human-readable line shown in the promise timeline.
    pub fn render(self, metadata: &Value) -> String {
        let quotation = text(metadata, "quotation_name").unwrap_or("sin nombre");
        match self {
            LogAction::PromiseCreated => match text(metadata, "contact_name") {
                Some(name) => format!("Promesa creada para {name}"),
                None => "Promesa creada".to_string(),
            },
            LogAction::PromiseUpdated => {
                let fields: Vec<&str> = metadata
                    .get("fields")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                if fields.is_empty() {
                    "Promesa actualizada".to_string()
                } else {
                    format!("Promesa actualizada ({})", fields.join(", "))
                }
            }
            LogAction::StageChange => {
                let to = text(metadata, "to_stage").unwrap_or("otra etapa");
                match text(metadata, "from_stage") {
                    Some(from) => format!("Movida de {from} a {to}"),
                    None => format!("Movida a {to}"),
                }
            }
            LogAction::PromiseArchived => match text(metadata, "reason") {
                Some(reason) => format!("Promesa archivada: {reason}"),
                None => "Promesa archivada".to_string(),
            },
            LogAction::PromiseUnarchived => match text(metadata, "to_stage") {
                Some(stage) => format!("Promesa desarchivada, regresa a {stage}"),
                None => "Promesa desarchivada".to_string(),
            },
            LogAction::ContactUpdated => "Datos de contacto actualizados".to_string(),
            LogAction::EventDateUpdated => match text(metadata, "event_date") {
                Some(date) => format!("Fecha del evento cambiada a {date}"),
                None => "Fecha del evento eliminada".to_string(),
            },
            LogAction::QuotationCreated => {
                let price = metadata
                    .get("price_cents")
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                format!(
                    "Cotización \"{quotation}\" creada por {}",
                    format_money(price)
                )
            }
            LogAction::QuotationUpdated => format!("Cotización \"{quotation}\" actualizada"),
            LogAction::QuotationNegotiationStarted => {
                format!("Cotización \"{quotation}\" en negociación")
            }
            LogAction::QuotationNegotiationEnded => {
                format!("Negociación de \"{quotation}\" terminada")
            }
            LogAction::QuotationClosingStarted => {
                format!("Cotización \"{quotation}\" pasó a cierre")
            }
            LogAction::QuotationClosingCancelled => {
                format!("Se canceló el cierre de \"{quotation}\"")
            }
            LogAction::QuotationAuthorized => {
                format!("Cotización \"{quotation}\" autorizada; evento creado")
            }
            LogAction::QuotationArchived => format!("Cotización \"{quotation}\" archivada"),
            LogAction::QuotationUnarchived => format!("Cotización \"{quotation}\" desarchivada"),
            LogAction::QuotationCancelled => {
                if text(metadata, "mode") == Some("with_event") {
                    format!("Cotización \"{quotation}\" cancelada junto con su evento")
                } else {
                    format!("Cotización \"{quotation}\" cancelada")
                }
            }
            LogAction::QuotationDeleted => format!("Cotización \"{quotation}\" eliminada"),
            LogAction::QuotationVisibilityChanged => {
                if metadata.get("visible").and_then(Value::as_bool) == Some(true) {
                    format!("Cotización \"{quotation}\" visible para el cliente")
                } else {
                    format!("Cotización \"{quotation}\" oculta para el cliente")
                }
            }
            LogAction::QuotationsReordered => "Cotizaciones reordenadas".to_string(),
            LogAction::ReminderCreated => {
                let subject = text(metadata, "subject").unwrap_or("Recordatorio");
                match text(metadata, "scheduled_at") {
                    Some(at) => format!("Recordatorio agendado: {subject} ({at})"),
                    None => format!("Recordatorio agendado: {subject}"),
                }
            }
            LogAction::UserNote => text(metadata, "text").unwrap_or_default().to_string(),
        }
    }
}

fn text<'a>(metadata: &'a Value, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// Formats cents as `$1,234.56`.
pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{:02}", abs % 100)
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub promise_id: Uuid,
    pub action: LogAction,
    pub metadata: Value,
    pub origin: OriginContext,
    pub user_id: Option<Uuid>,
}

impl LogEntry {
    pub fn new(promise_id: Uuid, action: LogAction, metadata: Value) -> Self {
        Self {
            promise_id,
            action,
            metadata,
            origin: OriginContext::Promise,
            user_id: None,
        }
    }

    pub fn by(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn origin(mut self, origin: OriginContext) -> Self {
        self.origin = origin;
        self
    }
}

/// Writes one log row on `conn`, usually the caller's open transaction.
pub async fn append<C>(conn: &C, entry: LogEntry) -> Result<promise_logs::Model, DbErr>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let model = promise_logs::ActiveModel {
        id: Set(Uuid::new_v4()),
        promise_id: Set(entry.promise_id),
        user_id: Set(entry.user_id),
        content: Set(entry.action.render(&entry.metadata)),
        log_type: Set(entry.action.key().to_string()),
        metadata: Set(entry.metadata),
        origin_context: Set(entry.origin),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    model.insert(conn).await
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogQuery {
    pub origin: Option<OriginContext>,
    /// Bypass the cache and refresh it.
    pub fresh: bool,
    pub limit: Option<usize>,
}

/// Newest first.
#[instrument(skip(db, cache, scope), fields(studio = %scope.slug()))]
pub async fn list_logs(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    promise_id: Uuid,
    query: LogQuery,
) -> ServiceResult<Vec<promise_logs::Model>> {
    find_promise(db, scope, promise_id).await?;

    let generation = cache.logs_generation(promise_id);
    let cached = if query.fresh {
        None
    } else {
        cache.cached_logs(promise_id).await
    };
    let all = match cached {
        Some(hit) => {
            debug!(%promise_id, "promise logs served from cache");
            hit.as_ref().clone()
        }
        None => {
            let rows = promise_logs::Entity::find()
                .filter(promise_logs::Column::PromiseId.eq(promise_id))
                .order_by_desc(promise_logs::Column::CreatedAt)
                .all(db)
                .await?;
            cache.store_logs(promise_id, generation, rows.clone()).await;
            rows
        }
    };

    let filtered = all
        .into_iter()
        .filter(|log| query.origin.is_none_or(|origin| log.origin_context == origin));
    Ok(match query.limit {
        Some(limit) => filtered.take(limit).collect(),
        None => filtered.collect(),
    })
}

fn note_text(raw: &str) -> ServiceResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation("La nota no puede estar vacía"));
    }
    Ok(trimmed.to_string())
}

#[instrument(skip(db, cache, scope, text), fields(studio = %scope.slug()))]
pub async fn add_note(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    promise_id: Uuid,
    text: &str,
    origin: OriginContext,
) -> ServiceResult<promise_logs::Model> {
    let text = note_text(text)?;
    find_promise(db, scope, promise_id).await?;
    let log = append(
        db,
        LogEntry::new(promise_id, LogAction::UserNote, json!({ "text": text }))
            .by(scope.actor)
            .origin(origin),
    )
    .await?;
    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(log)
}

async fn find_note(
    db: &DatabaseConnection,
    scope: &StudioScope,
    log_id: Uuid,
) -> ServiceResult<promise_logs::Model> {
    let log = promise_logs::Entity::find_by_id(log_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("la nota no existe"))?;
    find_promise(db, scope, log.promise_id)
        .await
        .map_err(|_| ServiceError::not_found("la nota no existe"))?;
    if log.log_type != LogAction::UserNote.key() {
        return Err(ServiceError::BusinessRule(
            "solo las notas pueden editarse o eliminarse".to_string(),
        ));
    }
    Ok(log)
}

#[instrument(skip(db, cache, scope, text), fields(studio = %scope.slug()))]
pub async fn edit_note(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    log_id: Uuid,
    text: &str,
) -> ServiceResult<promise_logs::Model> {
    let text = note_text(text)?;
    let log = find_note(db, scope, log_id).await?;
    let promise_id = log.promise_id;
    let mut active: promise_logs::ActiveModel = log.into();
    active.content = Set(text.clone());
    active.metadata = Set(json!({ "text": text }));
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db).await?;
    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(updated)
}

#[instrument(skip(db, cache, scope), fields(studio = %scope.slug()))]
pub async fn delete_note(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    log_id: Uuid,
) -> ServiceResult<()> {
    let log = find_note(db, scope, log_id).await?;
    let promise_id = log.promise_id;
    log.delete(db).await?;
    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for action in LogAction::ALL {
            assert_eq!(LogAction::from_key(action.key()), Some(action));
        }
        assert_eq!(LogAction::from_key("nope"), None);
        assert_eq!(
            LogAction::from_key("agenda_created"),
            Some(LogAction::ReminderCreated)
        );
    }

    #[test]
    fn stage_change_mentions_both_stages() {
        let line = LogAction::StageChange.render(&json!({
            "from_stage": "Pendiente",
            "to_stage": "En cierre",
        }));
        assert_eq!(line, "Movida de Pendiente a En cierre");
    }

    #[test]
    fn quotation_created_formats_price() {
        let line = LogAction::QuotationCreated.render(&json!({
            "quotation_name": "Paquete oro",
            "price_cents": 1_234_567,
        }));
        assert_eq!(line, "Cotización \"Paquete oro\" creada por $12,345.67");
    }

    #[test]
    fn cancel_wording_depends_on_mode() {
        let with_event = LogAction::QuotationCancelled.render(&json!({
            "quotation_name": "A",
            "mode": "with_event",
        }));
        assert!(with_event.ends_with("junto con su evento"));
        let only = LogAction::QuotationCancelled.render(&json!({ "quotation_name": "A" }));
        assert_eq!(only, "Cotización \"A\" cancelada");
    }

    #[test]
    fn money_formatting() {
        assert_eq!(format_money(0), "$0.00");
        assert_eq!(format_money(99), "$0.99");
        assert_eq!(format_money(100_000), "$1,000.00");
        assert_eq!(format_money(-250), "-$2.50");
    }
}
