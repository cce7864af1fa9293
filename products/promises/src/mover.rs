//! Moves promises between pipeline stages, recording the structured history
//! and the timeline entry in the same transaction.

use chrono::Utc;
use entity::pipeline_stages::{self, ARCHIVED_SLUG};
use entity::{events, promise_status_history, promises, quotations};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::cache::CacheBus;
use crate::error::{ServiceResult, StageMoveError};
use crate::logs::{self, LogAction, LogEntry};
use crate::promises::find_promise;
use crate::scope::StudioScope;
use crate::stages::{find_stage_by_slug, first_open_stage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveTrigger {
    Manual,
    Archive,
    Unarchive,
    QuotationAuthorized,
}

impl MoveTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            MoveTrigger::Manual => "manual",
            MoveTrigger::Archive => "archive",
            MoveTrigger::Unarchive => "unarchive",
            MoveTrigger::QuotationAuthorized => "quotation_authorized",
        }
    }

    fn log_action(self) -> LogAction {
        match self {
            MoveTrigger::Archive => LogAction::PromiseArchived,
            MoveTrigger::Unarchive => LogAction::PromiseUnarchived,
            MoveTrigger::Manual | MoveTrigger::QuotationAuthorized => LogAction::StageChange,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MoveOutcome {
    pub promise: promises::Model,
    pub from_stage: Option<pipeline_stages::Model>,
    pub to_stage: pipeline_stages::Model,
    /// False when the promise already sat in the target stage.
    pub changed: bool,
}

fn parse_id(raw: &str) -> Result<Uuid, StageMoveError> {
    Uuid::parse_str(raw.trim()).map_err(|_| StageMoveError::InvalidId(raw.to_string()))
}

/// Manual drag between columns. Ids arrive as raw strings from the board.
#[instrument(skip(db, cache, scope, reason), fields(studio = %scope.slug()))]
pub async fn move_promise(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    promise_id: &str,
    target_stage_id: &str,
    reason: Option<String>,
) -> Result<MoveOutcome, StageMoveError> {
    let promise_id = parse_id(promise_id)?;
    let target_stage_id = parse_id(target_stage_id)?;

    let txn = db.begin().await?;
    let outcome = move_promise_in(
        &txn,
        scope,
        promise_id,
        target_stage_id,
        reason,
        MoveTrigger::Manual,
    )
    .await?;
    txn.commit().await?;

    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(outcome)
}

#[instrument(skip(db, cache, scope, reason), fields(studio = %scope.slug()))]
pub async fn archive_promise(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    promise_id: Uuid,
    reason: Option<String>,
) -> Result<MoveOutcome, StageMoveError> {
    let txn = db.begin().await?;
    let archived = find_stage_by_slug(&txn, scope.studio_id(), ARCHIVED_SLUG)
        .await?
        .ok_or(StageMoveError::StageNotFound)?;
    let outcome =
        move_promise_in(&txn, scope, promise_id, archived.id, reason, MoveTrigger::Archive).await?;
    txn.commit().await?;

    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(outcome)
}

/// Sends an archived promise back to the first open stage. Promises that are
/// not archived are returned untouched.
#[instrument(skip(db, cache, scope), fields(studio = %scope.slug()))]
pub async fn unarchive_promise(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    promise_id: Uuid,
) -> Result<MoveOutcome, StageMoveError> {
    let txn = db.begin().await?;
    let promise = load_promise(&txn, scope, promise_id).await?;
    let current = pipeline_stages::Entity::find_by_id(promise.pipeline_stage_id)
        .one(&txn)
        .await?
        .ok_or(StageMoveError::StageNotFound)?;
    if !current.is_archived() {
        txn.commit().await?;
        return Ok(MoveOutcome {
            promise,
            from_stage: Some(current.clone()),
            to_stage: current,
            changed: false,
        });
    }

    let target = first_open_stage(&txn, scope.studio_id())
        .await?
        .ok_or(StageMoveError::StageNotFound)?;
    let outcome =
        move_promise_in(&txn, scope, promise_id, target.id, None, MoveTrigger::Unarchive).await?;
    txn.commit().await?;

    cache.revalidate_promise(scope.slug(), promise_id).await;
    Ok(outcome)
}

async fn load_promise<C>(
    conn: &C,
    scope: &StudioScope,
    promise_id: Uuid,
) -> Result<promises::Model, StageMoveError>
where
    C: ConnectionTrait,
{
    promises::Entity::find_by_id(promise_id)
        .filter(promises::Column::StudioId.eq(scope.studio_id()))
        .one(conn)
        .await?
        .ok_or(StageMoveError::PromiseNotFound)
}

/// Core move on an open connection or transaction. Callers own the commit.
pub(crate) async fn move_promise_in<C>(
    conn: &C,
    scope: &StudioScope,
    promise_id: Uuid,
    target_stage_id: Uuid,
    reason: Option<String>,
    trigger: MoveTrigger,
) -> Result<MoveOutcome, StageMoveError>
where
    C: ConnectionTrait,
{
    let existing = load_promise(conn, scope, promise_id).await?;
    let target = pipeline_stages::Entity::find_by_id(target_stage_id)
        .one(conn)
        .await?
        .ok_or(StageMoveError::StageNotFound)?;
    if target.studio_id != scope.studio_id() {
        return Err(StageMoveError::StageWrongTenant);
    }
    if !target.is_active {
        return Err(StageMoveError::StageInactive);
    }
    let current = pipeline_stages::Entity::find_by_id(existing.pipeline_stage_id)
        .one(conn)
        .await?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    if existing.pipeline_stage_id == target.id {
        let mut active: promises::ActiveModel = existing.into();
        active.updated_at = Set(now);
        let promise = active.update(conn).await?;
        return Ok(MoveOutcome {
            promise,
            from_stage: current,
            to_stage: target,
            changed: false,
        });
    }

    let leaving_approved = current.as_ref().is_some_and(|stage| stage.is_approved());
    if leaving_approved
        && !target.is_archived()
        && has_valid_linked_event(conn, promise_id).await?
    {
        return Err(StageMoveError::RestrictedByLinkedEvent);
    }

    let mut active: promises::ActiveModel = existing.into();
    active.pipeline_stage_id = Set(target.id);
    active.updated_at = Set(now);
    let promise = active.update(conn).await?;

    let from_slug = current.as_ref().map(|stage| stage.slug.clone());
    let from_name = current.as_ref().map(|stage| stage.name.clone());
    promise_status_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        promise_id: Set(promise_id),
        from_stage_id: Set(current.as_ref().map(|stage| stage.id)),
        to_stage_id: Set(target.id),
        from_slug: Set(from_slug.clone()),
        to_slug: Set(target.slug.clone()),
        reason: Set(reason.clone()),
        triggered_by: Set(scope.actor),
        metadata: Set(json!({ "trigger": trigger.as_str() })),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;

    logs::append(
        conn,
        LogEntry::new(
            promise_id,
            trigger.log_action(),
            json!({
                "from_stage": from_name,
                "from_slug": from_slug,
                "to_stage": target.name,
                "to_slug": target.slug,
                "reason": reason,
                "trigger": trigger.as_str(),
            }),
        )
        .by(scope.actor),
    )
    .await?;

    info!(
        %promise_id,
        from = from_slug.as_deref().unwrap_or("-"),
        to = %target.slug,
        trigger = trigger.as_str(),
        "promise stage changed"
    );
    Ok(MoveOutcome {
        promise,
        from_stage: current,
        to_stage: target,
        changed: true,
    })
}

/// True when an event of the promise is tied to one of its authorized quotations.
pub async fn has_valid_linked_event<C>(conn: &C, promise_id: Uuid) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let quotation_ids: Vec<Uuid> = events::Entity::find()
        .filter(events::Column::PromiseId.eq(promise_id))
        .filter(events::Column::QuotationId.is_not_null())
        .all(conn)
        .await?
        .into_iter()
        .filter_map(|event| event.quotation_id)
        .collect();
    if quotation_ids.is_empty() {
        return Ok(false);
    }
    let authorized = quotations::Entity::find()
        .filter(quotations::Column::Id.is_in(quotation_ids))
        .filter(quotations::Column::PromiseId.eq(promise_id))
        .filter(quotations::Column::Status.is_in([
            quotations::Status::Approved,
            quotations::Status::Authorized,
            quotations::Status::ApprovedLegacy,
        ]))
        .count(conn)
        .await?;
    Ok(authorized > 0)
}

/// Newest first.
pub async fn stage_history<C>(
    conn: &C,
    scope: &StudioScope,
    promise_id: Uuid,
) -> ServiceResult<Vec<promise_status_history::Model>>
where
    C: ConnectionTrait,
{
    find_promise(conn, scope, promise_id).await?;
    let rows = promise_status_history::Entity::find()
        .filter(promise_status_history::Column::PromiseId.eq(promise_id))
        .order_by_desc(promise_status_history::Column::CreatedAt)
        .all(conn)
        .await?;
    Ok(rows)
}
