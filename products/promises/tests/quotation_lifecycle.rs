mod common;

use chrono::{NaiveDate, Utc};
use entity::quotations::Status;
use entity::{agenda_entries, events, promise_logs, promises, quotations};
use products_promises::ServiceError;
use products_promises::lifecycle::{CancelMode, QuotationAction};
use products_promises::quotations::{
    ACTIVE_CONFLICT, QuotationUpdate, archive_quotation, authorize_quotation, available_actions,
    cancel_closing, cancel_quotation, delete_quotation, end_negotiation, list_for_promise,
    move_to_closing, reorder_quotations, set_visibility, start_negotiation, unarchive_quotation,
    update_quotation,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
};
use uuid::Uuid;

use common::{promise, quotation, setup};

#[tokio::test]
async fn second_quotation_cannot_enter_closing() {
    let env = setup().await;
    let p = promise(&env).await;
    let q1 = quotation(&env, p.id, "Q1").await;
    let q2 = quotation(&env, p.id, "Q2").await;

    let closed = move_to_closing(&env.db, &env.cache, &env.scope, q1.id)
        .await
        .unwrap();
    assert_eq!(closed.status, Status::Closing);

    let err = move_to_closing(&env.db, &env.cache, &env.scope, q2.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));

    let q1_after = quotations::Entity::find_by_id(q1.id)
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();
    let q2_after = quotations::Entity::find_by_id(q2.id)
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(q1_after.status, Status::Closing);
    assert_eq!(q2_after.status, Status::Pending);
}

#[tokio::test]
async fn unique_index_rejects_a_racing_closing_write() {
    let env = setup().await;
    let p = promise(&env).await;
    let q1 = quotation(&env, p.id, "Q1").await;
    let q2 = quotation(&env, p.id, "Q2").await;
    move_to_closing(&env.db, &env.cache, &env.scope, q1.id)
        .await
        .unwrap();

    // A writer that skipped the sibling check.
    let mut racing: quotations::ActiveModel = q2.clone().into();
    racing.status = Set(Status::Closing);
    let err = racing.update(&env.db).await.unwrap_err();
    assert!(matches!(
        err.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(_))
    ));

    let mapped = ServiceError::from_db_with_conflict(err, ACTIVE_CONFLICT);
    assert!(matches!(&mapped, ServiceError::Conflict(msg) if msg == ACTIVE_CONFLICT));
    assert_eq!(mapped.reason(), Some("conflict"));

    let q2_after = quotations::Entity::find_by_id(q2.id)
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(q2_after.status, Status::Pending);
}

#[tokio::test]
async fn closing_can_be_cancelled_back_to_pending() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;

    move_to_closing(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    let back = cancel_closing(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    assert_eq!(back.status, Status::Pending);

    let other = quotation(&env, p.id, "Otra").await;
    let closing = move_to_closing(&env.db, &env.cache, &env.scope, other.id)
        .await
        .unwrap();
    assert_eq!(closing.status, Status::Closing);
}

#[tokio::test]
async fn negotiation_toggles_both_ways() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;

    let negotiating = start_negotiation(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    assert_eq!(negotiating.status, Status::Negotiation);
    assert!(
        start_negotiation(&env.db, &env.cache, &env.scope, q.id)
            .await
            .is_err()
    );
    let pending = end_negotiation(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    assert_eq!(pending.status, Status::Pending);
}

#[tokio::test]
async fn authorize_creates_event_and_moves_promise_to_approved() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Paquete boda").await;
    move_to_closing(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();

    let date = NaiveDate::from_ymd_opt(2026, 11, 14).unwrap();
    let auth = authorize_quotation(&env.db, &env.cache, &env.scope, q.id, Some(date))
        .await
        .unwrap();

    assert_eq!(auth.quotation.status, Status::Authorized);
    assert_eq!(auth.quotation.event_id, Some(auth.event.id));
    assert_eq!(auth.event.quotation_id, Some(q.id));
    assert_eq!(auth.event.event_date, Some(date));
    assert!(auth.stage_move.as_ref().unwrap().changed);

    let promise_after = promises::Entity::find_by_id(p.id)
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(promise_after.pipeline_stage_id, env.stage("approved").id);

    let log_types: Vec<String> = promise_logs::Entity::find()
        .filter(promise_logs::Column::PromiseId.eq(p.id))
        .all(&env.db)
        .await
        .unwrap()
        .into_iter()
        .map(|log| log.log_type)
        .collect();
    assert!(log_types.contains(&"quotation_authorized".to_string()));
    assert!(log_types.contains(&"stage_change".to_string()));
}

#[tokio::test]
async fn authorize_requires_closing() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;

    let err = authorize_quotation(&env.db, &env.cache, &env.scope, q.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));
    assert_eq!(events::Entity::find().count(&env.db).await.unwrap(), 0);
}

#[tokio::test]
async fn archive_blocked_while_sibling_is_authorized_with_event() {
    let env = setup().await;
    let p = promise(&env).await;
    let winner = quotation(&env, p.id, "Ganadora").await;
    let other = quotation(&env, p.id, "Otra").await;
    move_to_closing(&env.db, &env.cache, &env.scope, winner.id)
        .await
        .unwrap();
    authorize_quotation(&env.db, &env.cache, &env.scope, winner.id, None)
        .await
        .unwrap();

    let err = archive_quotation(&env.db, &env.cache, &env.scope, other.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));

    let actions = available_actions(&env.db, &other).await.unwrap();
    assert!(!actions.contains(&QuotationAction::Archive));
    assert!(!actions.contains(&QuotationAction::MoveToClosing));
}

#[tokio::test]
async fn archive_and_unarchive_round_trip() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;

    let archived = archive_quotation(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    assert_eq!(archived.status, Status::Archived);
    let restored = unarchive_quotation(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    assert_eq!(restored.status, Status::Pending);
}

#[tokio::test]
async fn cancel_quotation_only_keeps_the_event() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;
    move_to_closing(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    let auth = authorize_quotation(&env.db, &env.cache, &env.scope, q.id, None)
        .await
        .unwrap();

    let cancelled = cancel_quotation(
        &env.db,
        &env.cache,
        &env.scope,
        q.id,
        CancelMode::QuotationOnly,
    )
    .await
    .unwrap();
    assert_eq!(cancelled.status, Status::Cancelled);
    assert_eq!(cancelled.event_id, None);

    let event = events::Entity::find_by_id(auth.event.id)
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.quotation_id, None);

    // The slot is free again for another quotation.
    let next = quotation(&env, p.id, "Nueva").await;
    move_to_closing(&env.db, &env.cache, &env.scope, next.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn cancel_with_event_removes_event_and_agenda() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;
    move_to_closing(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    let auth = authorize_quotation(&env.db, &env.cache, &env.scope, q.id, None)
        .await
        .unwrap();

    agenda_entries::ActiveModel {
        id: Set(Uuid::new_v4()),
        studio_id: Set(env.scope.studio_id()),
        promise_id: Set(None),
        event_id: Set(Some(auth.event.id)),
        scheduled_at: Set(Utc::now().into()),
        subject: Set("Sesión".into()),
        notes: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&env.db)
    .await
    .unwrap();

    cancel_quotation(&env.db, &env.cache, &env.scope, q.id, CancelMode::WithEvent)
        .await
        .unwrap();

    assert!(
        events::Entity::find_by_id(auth.event.id)
            .one(&env.db)
            .await
            .unwrap()
            .is_none()
    );
    let remaining = agenda_entries::Entity::find()
        .filter(agenda_entries::Column::EventId.eq(auth.event.id))
        .count(&env.db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    let cancel_log = promise_logs::Entity::find()
        .filter(promise_logs::Column::PromiseId.eq(p.id))
        .filter(promise_logs::Column::LogType.eq("quotation_cancelled"))
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();
    assert!(cancel_log.content.ends_with("junto con su evento"));
}

#[tokio::test]
async fn cancel_is_only_for_authorized_quotations() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;
    let err = cancel_quotation(&env.db, &env.cache, &env.scope, q.id, CancelMode::WithEvent)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));
}

#[tokio::test]
async fn active_quotation_cannot_be_deleted() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;
    move_to_closing(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();

    assert!(matches!(
        delete_quotation(&env.db, &env.cache, &env.scope, q.id).await,
        Err(ServiceError::BusinessRule(_))
    ));
    cancel_closing(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    delete_quotation(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    assert!(
        list_for_promise(&env.db, &env.scope, p.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn authorized_quotation_is_read_only() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;
    move_to_closing(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    authorize_quotation(&env.db, &env.cache, &env.scope, q.id, None)
        .await
        .unwrap();

    let err = update_quotation(
        &env.db,
        &env.cache,
        &env.scope,
        q.id,
        QuotationUpdate {
            price_cents: Some(1),
            ..QuotationUpdate::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::BusinessRule(_)));
}

#[tokio::test]
async fn reorder_and_visibility() {
    let env = setup().await;
    let p = promise(&env).await;
    let a = quotation(&env, p.id, "A").await;
    let b = quotation(&env, p.id, "B").await;
    let c = quotation(&env, p.id, "C").await;

    let reordered = reorder_quotations(&env.db, &env.cache, &env.scope, p.id, &[c.id, a.id, b.id])
        .await
        .unwrap();
    let names: Vec<&str> = reordered.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(names, ["C", "A", "B"]);

    assert!(matches!(
        reorder_quotations(&env.db, &env.cache, &env.scope, p.id, &[a.id, b.id]).await,
        Err(ServiceError::Validation(_))
    ));

    let visible = set_visibility(&env.db, &env.cache, &env.scope, a.id, true)
        .await
        .unwrap();
    assert!(visible.visible_to_client);
}

#[tokio::test]
async fn quotations_of_another_studio_are_invisible() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;
    let (other_scope, _) = env.other_studio().await;

    let err = move_to_closing(&env.db, &env.cache, &other_scope, q.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
