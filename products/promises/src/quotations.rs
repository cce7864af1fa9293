//! Quotations attached to a promise and their lifecycle side effects.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use entity::pipeline_stages::APPROVED_SLUG;
use entity::{agenda_entries, events, quotations};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::business_terms::find_business_term;
use crate::cache::CacheBus;
use crate::error::{ServiceError, ServiceResult};
use crate::lifecycle::{self, CancelMode, QuotationAction, Siblings};
use crate::logs::{self, LogAction, LogEntry};
use crate::mover::{self, MoveOutcome, MoveTrigger};
use crate::promises::find_promise;
use crate::scope::StudioScope;
use crate::stages::find_stage_by_slug;

/// Raised when `uq_quotations_active_per_promise` rejects a concurrent write.
pub const ACTIVE_CONFLICT: &str =
    "la promesa ya tiene otra cotización en cierre o autorizada con evento";

#[derive(Clone, Debug, Default)]
pub struct NewQuotation {
    pub promise_id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub discount_cents: i64,
    pub business_term_id: Option<Uuid>,
    pub visible_to_client: bool,
}

#[derive(Clone, Debug, Default)]
pub struct QuotationUpdate {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub business_term_id: Option<Option<Uuid>>,
}

#[derive(Clone, Debug)]
pub struct Authorization {
    pub quotation: quotations::Model,
    pub event: events::Model,
    /// Present when the studio has an approved stage to move the promise into.
    pub stage_move: Option<MoveOutcome>,
}

fn check_amounts(price_cents: i64, discount_cents: i64) -> ServiceResult<()> {
    if price_cents < 0 || discount_cents < 0 {
        return Err(ServiceError::validation("Los montos no pueden ser negativos"));
    }
    if discount_cents > price_cents {
        return Err(ServiceError::validation(
            "El descuento no puede ser mayor que el precio",
        ));
    }
    Ok(())
}

fn cancel_mode_key(mode: CancelMode) -> &'static str {
    match mode {
        CancelMode::QuotationOnly => "quotation_only",
        CancelMode::WithEvent => "with_event",
    }
}

fn log_action_for(action: QuotationAction) -> LogAction {
    match action {
        QuotationAction::MoveToClosing => LogAction::QuotationClosingStarted,
        QuotationAction::CancelClosing => LogAction::QuotationClosingCancelled,
        QuotationAction::StartNegotiation => LogAction::QuotationNegotiationStarted,
        QuotationAction::EndNegotiation => LogAction::QuotationNegotiationEnded,
        QuotationAction::Authorize => LogAction::QuotationAuthorized,
        QuotationAction::Archive => LogAction::QuotationArchived,
        QuotationAction::Unarchive => LogAction::QuotationUnarchived,
        QuotationAction::Cancel(_) => LogAction::QuotationCancelled,
    }
}

pub async fn find_quotation<C>(
    conn: &C,
    scope: &StudioScope,
    quotation_id: Uuid,
) -> ServiceResult<quotations::Model>
where
    C: ConnectionTrait,
{
    quotations::Entity::find_by_id(quotation_id)
        .filter(quotations::Column::StudioId.eq(scope.studio_id()))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("la cotización no existe"))
}

async fn promise_quotations<C>(conn: &C, promise_id: Uuid) -> Result<Vec<quotations::Model>, DbErr>
where
    C: ConnectionTrait,
{
    quotations::Entity::find()
        .filter(quotations::Column::PromiseId.eq(promise_id))
        .order_by_asc(quotations::Column::SortOrder)
        .order_by_asc(quotations::Column::CreatedAt)
        .all(conn)
        .await
}

pub async fn list_for_promise<C>(
    conn: &C,
    scope: &StudioScope,
    promise_id: Uuid,
) -> ServiceResult<Vec<quotations::Model>>
where
    C: ConnectionTrait,
{
    find_promise(conn, scope, promise_id).await?;
    Ok(promise_quotations(conn, promise_id).await?)
}

/// Menu entries the quotation card may show right now.
pub async fn available_actions<C>(
    conn: &C,
    quotation: &quotations::Model,
) -> ServiceResult<Vec<QuotationAction>>
where
    C: ConnectionTrait,
{
    let all = promise_quotations(conn, quotation.promise_id).await?;
    let siblings = Siblings::of(quotation.id, &all);
    Ok(lifecycle::allowed_actions(quotation.status, siblings))
}

#[instrument(skip(db, cache, scope, input), fields(studio = %scope.slug()))]
pub async fn create_quotation(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    input: NewQuotation,
) -> ServiceResult<quotations::Model> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("El nombre de la cotización es obligatorio"));
    }
    check_amounts(input.price_cents, input.discount_cents)?;
    if let Some(term_id) = input.business_term_id {
        find_business_term(db, scope, term_id).await?;
    }

    let txn = db.begin().await?;
    let promise = find_promise(&txn, scope, input.promise_id).await?;
    let next_order = promise_quotations(&txn, promise.id)
        .await?
        .iter()
        .map(|q| q.sort_order)
        .max()
        .map_or(0, |max| max + 1);
    let now = Utc::now();
    let quotation = quotations::ActiveModel {
        id: Set(Uuid::new_v4()),
        studio_id: Set(scope.studio_id()),
        promise_id: Set(promise.id),
        name: Set(name),
        status: Set(quotations::Status::Pending),
        price_cents: Set(input.price_cents),
        discount_cents: Set(input.discount_cents),
        business_term_id: Set(input.business_term_id),
        visible_to_client: Set(input.visible_to_client),
        sort_order: Set(next_order),
        event_id: Set(None),
        revision_status: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    logs::append(
        &txn,
        LogEntry::new(
            promise.id,
            LogAction::QuotationCreated,
            json!({
                "quotation_id": quotation.id,
                "quotation_name": quotation.name,
                "price_cents": quotation.price_cents,
            }),
        )
        .by(scope.actor),
    )
    .await?;
    txn.commit().await?;

    cache.revalidate_promise(scope.slug(), promise.id).await;
    Ok(quotation)
}

#[instrument(skip(db, cache, scope, update), fields(studio = %scope.slug()))]
pub async fn update_quotation(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
    update: QuotationUpdate,
) -> ServiceResult<quotations::Model> {
    if let Some(Some(term_id)) = update.business_term_id {
        find_business_term(db, scope, term_id).await?;
    }

    let txn = db.begin().await?;
    let existing = find_quotation(&txn, scope, quotation_id).await?;
    if existing.status.is_authorized() || existing.status == quotations::Status::Cancelled {
        return Err(ServiceError::BusinessRule(format!(
            "una cotización en estado {} ya no puede editarse",
            existing.status.as_str()
        )));
    }
    let price = update.price_cents.unwrap_or(existing.price_cents);
    let discount = update.discount_cents.unwrap_or(existing.discount_cents);
    check_amounts(price, discount)?;

    let promise_id = existing.promise_id;
    let mut active: quotations::ActiveModel = existing.into();
    if let Some(name) = update.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::validation("El nombre de la cotización es obligatorio"));
        }
        active.name = Set(name);
    }
    active.price_cents = Set(price);
    active.discount_cents = Set(discount);
    if let Some(term_id) = update.business_term_id {
        active.business_term_id = Set(term_id);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;
    logs::append(
        &txn,
        LogEntry::new(
            promise_id,
            LogAction::QuotationUpdated,
            json!({ "quotation_id": updated.id, "quotation_name": updated.name }),
        )
        .by(scope.actor),
    )
    .await?;
    txn.commit().await?;

    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(updated)
}

struct Applied {
    quotation: quotations::Model,
    event: Option<events::Model>,
    stage_move: Option<MoveOutcome>,
}

/// Runs one lifecycle action inside a transaction: guard, status change, side
/// effects and log entry commit together.
async fn apply_action(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
    action: QuotationAction,
    event_date: Option<NaiveDate>,
) -> ServiceResult<Applied> {
    let txn = db.begin().await?;
    let existing = find_quotation(&txn, scope, quotation_id).await?;
    let all = promise_quotations(&txn, existing.promise_id).await?;
    let next = lifecycle::transition(existing.status, action, Siblings::of(existing.id, &all))?;

    let now = Utc::now();
    let promise_id = existing.promise_id;
    let from = existing.status;
    let mut event = None;
    let mut metadata = json!({
        "quotation_id": existing.id,
        "quotation_name": existing.name,
        "from_status": from.as_str(),
        "to_status": next.as_str(),
    });

    let mut active: quotations::ActiveModel = existing.clone().into();
    active.status = Set(next);
    active.updated_at = Set(now.into());

    match action {
        QuotationAction::Authorize => {
            let promise = find_promise(&txn, scope, promise_id).await?;
            let created = events::ActiveModel {
                id: Set(Uuid::new_v4()),
                studio_id: Set(scope.studio_id()),
                promise_id: Set(promise_id),
                quotation_id: Set(Some(existing.id)),
                event_date: Set(event_date.or(promise.event_date)),
                status: Set(events::Status::Active),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            active.event_id = Set(Some(created.id));
            metadata["event_id"] = json!(created.id);
            event = Some(created);
        }
        QuotationAction::Cancel(mode) => {
            metadata["mode"] = json!(cancel_mode_key(mode));
            if let Some(event_id) = existing.event_id {
                detach_or_remove_event(&txn, event_id, mode).await?;
                metadata["event_id"] = json!(event_id);
            }
            active.event_id = Set(None);
        }
        _ => {}
    }

    let quotation = active
        .update(&txn)
        .await
        .map_err(|err| ServiceError::from_db_with_conflict(err, ACTIVE_CONFLICT))?;

    let stage_move = if action == QuotationAction::Authorize {
        match find_stage_by_slug(&txn, scope.studio_id(), APPROVED_SLUG).await? {
            Some(approved) => Some(
                mover::move_promise_in(
                    &txn,
                    scope,
                    promise_id,
                    approved.id,
                    Some("Cotización autorizada".to_string()),
                    MoveTrigger::QuotationAuthorized,
                )
                .await?,
            ),
            None => {
                warn!(studio = %scope.slug(), "no approved stage; promise left in place");
                None
            }
        }
    } else {
        None
    };

    logs::append(
        &txn,
        LogEntry::new(promise_id, log_action_for(action), metadata).by(scope.actor),
    )
    .await?;
    txn.commit().await?;

    info!(
        %quotation_id,
        from = from.as_str(),
        to = next.as_str(),
        "quotation status changed"
    );
    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(Applied {
        quotation,
        event,
        stage_move,
    })
}

async fn detach_or_remove_event<C>(conn: &C, event_id: Uuid, mode: CancelMode) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let Some(event) = events::Entity::find_by_id(event_id).one(conn).await? else {
        return Ok(());
    };
    match mode {
        CancelMode::QuotationOnly => {
            let mut active: events::ActiveModel = event.into();
            active.quotation_id = Set(None);
            active.update(conn).await?;
        }
        CancelMode::WithEvent => {
            agenda_entries::Entity::delete_many()
                .filter(agenda_entries::Column::EventId.eq(event_id))
                .exec(conn)
                .await?;
            events::Entity::delete_by_id(event_id).exec(conn).await?;
        }
    }
    Ok(())
}

async fn simple_action(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
    action: QuotationAction,
) -> ServiceResult<quotations::Model> {
    apply_action(db, cache, scope, quotation_id, action, None)
        .await
        .map(|applied| applied.quotation)
}

pub async fn move_to_closing(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
) -> ServiceResult<quotations::Model> {
    simple_action(db, cache, scope, quotation_id, QuotationAction::MoveToClosing).await
}

pub async fn cancel_closing(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
) -> ServiceResult<quotations::Model> {
    simple_action(db, cache, scope, quotation_id, QuotationAction::CancelClosing).await
}

pub async fn start_negotiation(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
) -> ServiceResult<quotations::Model> {
    simple_action(db, cache, scope, quotation_id, QuotationAction::StartNegotiation).await
}

pub async fn end_negotiation(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
) -> ServiceResult<quotations::Model> {
    simple_action(db, cache, scope, quotation_id, QuotationAction::EndNegotiation).await
}

pub async fn archive_quotation(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
) -> ServiceResult<quotations::Model> {
    simple_action(db, cache, scope, quotation_id, QuotationAction::Archive).await
}

pub async fn unarchive_quotation(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
) -> ServiceResult<quotations::Model> {
    simple_action(db, cache, scope, quotation_id, QuotationAction::Unarchive).await
}

/// Authorizes a quotation in closing: creates its event and moves the promise
/// to the approved stage.
#[instrument(skip(db, cache, scope), fields(studio = %scope.slug()))]
pub async fn authorize_quotation(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
    event_date: Option<NaiveDate>,
) -> ServiceResult<Authorization> {
    let applied = apply_action(
        db,
        cache,
        scope,
        quotation_id,
        QuotationAction::Authorize,
        event_date,
    )
    .await?;
    let event = applied.event.ok_or_else(|| {
        ServiceError::Db(DbErr::Custom("authorization produced no event".to_string()))
    })?;
    Ok(Authorization {
        quotation: applied.quotation,
        event,
        stage_move: applied.stage_move,
    })
}

#[instrument(skip(db, cache, scope), fields(studio = %scope.slug()))]
pub async fn cancel_quotation(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
    mode: CancelMode,
) -> ServiceResult<quotations::Model> {
    simple_action(db, cache, scope, quotation_id, QuotationAction::Cancel(mode)).await
}

#[instrument(skip(db, cache, scope), fields(studio = %scope.slug()))]
pub async fn set_visibility(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
    visible: bool,
) -> ServiceResult<quotations::Model> {
    let txn = db.begin().await?;
    let existing = find_quotation(&txn, scope, quotation_id).await?;
    if existing.visible_to_client == visible {
        txn.commit().await?;
        return Ok(existing);
    }
    let promise_id = existing.promise_id;
    let mut active: quotations::ActiveModel = existing.into();
    active.visible_to_client = Set(visible);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;
    logs::append(
        &txn,
        LogEntry::new(
            promise_id,
            LogAction::QuotationVisibilityChanged,
            json!({
                "quotation_id": updated.id,
                "quotation_name": updated.name,
                "visible": visible,
            }),
        )
        .by(scope.actor),
    )
    .await?;
    txn.commit().await?;

    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(updated)
}

/// `ordered_ids` must contain every quotation of the promise exactly once.
#[instrument(skip(db, cache, scope, ordered_ids), fields(studio = %scope.slug()))]
pub async fn reorder_quotations(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    promise_id: Uuid,
    ordered_ids: &[Uuid],
) -> ServiceResult<Vec<quotations::Model>> {
    let txn = db.begin().await?;
    find_promise(&txn, scope, promise_id).await?;
    let known: HashSet<Uuid> = promise_quotations(&txn, promise_id)
        .await?
        .into_iter()
        .map(|q| q.id)
        .collect();
    let requested: HashSet<Uuid> = ordered_ids.iter().copied().collect();
    if requested.len() != ordered_ids.len() || requested != known {
        return Err(ServiceError::validation(
            "el nuevo orden debe incluir cada cotización exactamente una vez",
        ));
    }

    let now = Utc::now();
    for (position, id) in ordered_ids.iter().enumerate() {
        quotations::ActiveModel {
            id: Set(*id),
            sort_order: Set(position as i32),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .update(&txn)
        .await?;
    }
    logs::append(
        &txn,
        LogEntry::new(
            promise_id,
            LogAction::QuotationsReordered,
            json!({ "order": ordered_ids }),
        )
        .by(scope.actor),
    )
    .await?;
    let reordered = promise_quotations(&txn, promise_id).await?;
    txn.commit().await?;

    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(reordered)
}

#[instrument(skip(db, cache, scope), fields(studio = %scope.slug()))]
pub async fn delete_quotation(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    quotation_id: Uuid,
) -> ServiceResult<()> {
    let txn = db.begin().await?;
    let existing = find_quotation(&txn, scope, quotation_id).await?;
    if existing.is_active_with_event() {
        return Err(ServiceError::BusinessRule(
            "no se puede eliminar una cotización en cierre o autorizada con evento".to_string(),
        ));
    }
    let promise_id = existing.promise_id;
    quotations::Entity::delete_by_id(existing.id)
        .exec(&txn)
        .await?;
    logs::append(
        &txn,
        LogEntry::new(
            promise_id,
            LogAction::QuotationDeleted,
            json!({ "quotation_id": existing.id, "quotation_name": existing.name }),
        )
        .by(scope.actor),
    )
    .await?;
    txn.commit().await?;

    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_cannot_exceed_price() {
        assert!(check_amounts(10_000, 2_500).is_ok());
        assert!(matches!(
            check_amounts(100, 200),
            Err(ServiceError::Validation(_))
        ));
        assert!(check_amounts(-1, 0).is_err());
    }

    #[test]
    fn every_action_has_a_log_key() {
        for action in QuotationAction::ALL {
            assert!(log_action_for(action).key().starts_with("quotation_"));
        }
    }
}
