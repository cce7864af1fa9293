mod common;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use entity::promise_logs::OriginContext;
use entity::{agenda_entries, contacts, events, promise_logs, promises, quotations};
use platform_db::ensure_studio_user;
use products_promises::{ServiceError, StudioScope};
use products_promises::logs::{LogQuery, add_note, delete_note, edit_note, list_logs};
use products_promises::promises::{
    ContactInput, NewAgendaEntry, NewPromise, PromiseUpdate, SOCIAL_NETWORK_REQUIRED,
    add_agenda_entry, create_promise, delete_promise, list_agenda, list_promises,
    tentative_dates, update_promise,
};
use products_promises::quotations::{authorize_quotation, move_to_closing};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{promise, promise_with_phone, quotation, setup};

#[tokio::test]
async fn social_channel_requires_network_and_writes_nothing() {
    let env = setup().await;
    let err = create_promise(
        &env.db,
        &env.cache,
        &env.scope,
        NewPromise {
            contact: Some(ContactInput {
                name: "Luis".into(),
                phone: "5511112222".into(),
                email: None,
            }),
            acquisition_channel_id: Some(env.channel("Redes sociales")),
            ..NewPromise::default()
        },
    )
    .await
    .unwrap_err();

    match err {
        ServiceError::Validation(message) => assert_eq!(message, SOCIAL_NETWORK_REQUIRED),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(contacts::Entity::find().count(&env.db).await.unwrap(), 0);
    assert_eq!(promises::Entity::find().count(&env.db).await.unwrap(), 0);
}

#[tokio::test]
async fn social_channel_with_network_lands_in_first_stage() {
    let env = setup().await;
    let date = NaiveDate::from_ymd_opt(2026, 12, 5).unwrap();
    let created = create_promise(
        &env.db,
        &env.cache,
        &env.scope,
        NewPromise {
            contact: Some(ContactInput {
                name: "Luis".into(),
                phone: "+52 (55) 1111-2222".into(),
                email: Some("luis@example.com".into()),
            }),
            acquisition_channel_id: Some(env.channel("Redes sociales")),
            social_network_id: Some(env.seeded.social_networks[0].id),
            event_type_id: Some(env.seeded.event_types[0].id),
            tentative_dates: vec![date],
            ..NewPromise::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(created.pipeline_stage_id, env.stage("pending").id);
    assert_eq!(tentative_dates(&created), vec![date]);
    let contact = contacts::Entity::find_by_id(created.contact_id)
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contact.phone, "525511112222");

    let log = promise_logs::Entity::find()
        .filter(promise_logs::Column::PromiseId.eq(created.id))
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(log.log_type, "promise_created");
    assert_eq!(log.content, "Promesa creada para Luis");
}

#[tokio::test]
async fn duplicate_phone_is_a_conflict() {
    let env = setup().await;
    promise_with_phone(&env, "55 1234 5678").await;

    let err = create_promise(
        &env.db,
        &env.cache,
        &env.scope,
        NewPromise {
            contact: Some(ContactInput {
                name: "Otra persona".into(),
                phone: "5512345678".into(),
                email: None,
            }),
            ..NewPromise::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(promises::Entity::find().count(&env.db).await.unwrap(), 1);
}

#[tokio::test]
async fn existing_contact_can_open_another_promise() {
    let env = setup().await;
    let first = promise(&env).await;
    let second = create_promise(
        &env.db,
        &env.cache,
        &env.scope,
        NewPromise {
            contact_id: Some(first.contact_id),
            pipeline_stage_id: Some(env.stage("negotiation").id),
            ..NewPromise::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(second.contact_id, first.contact_id);
    assert_eq!(second.pipeline_stage_id, env.stage("negotiation").id);

    let in_negotiation = list_promises(&env.db, &env.scope, Some(env.stage("negotiation").id))
        .await
        .unwrap();
    assert_eq!(in_negotiation.len(), 1);
}

#[tokio::test]
async fn missing_contact_is_rejected() {
    let env = setup().await;
    let err = create_promise(&env.db, &env.cache, &env.scope, NewPromise::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn update_logs_changed_fields() {
    let env = setup().await;
    let p = promise(&env).await;
    let date = NaiveDate::from_ymd_opt(2027, 2, 14).unwrap();

    let updated = update_promise(
        &env.db,
        &env.cache,
        &env.scope,
        p.id,
        PromiseUpdate {
            event_date: Some(Some(date)),
            notes: Some(Some("Quiere dron".into())),
            ..PromiseUpdate::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.event_date, Some(date));
    assert_eq!(updated.notes.as_deref(), Some("Quiere dron"));

    let types: Vec<String> = promise_logs::Entity::find()
        .filter(promise_logs::Column::PromiseId.eq(p.id))
        .all(&env.db)
        .await
        .unwrap()
        .into_iter()
        .map(|log| log.log_type)
        .collect();
    assert!(types.contains(&"event_date_updated".to_string()));
    assert!(types.contains(&"promise_updated".to_string()));
}

#[tokio::test]
async fn delete_cascades_everything_but_the_contact() {
    let env = setup().await;
    let p = promise(&env).await;
    let q = quotation(&env, p.id, "Q").await;
    quotation(&env, p.id, "Alternativa").await;
    move_to_closing(&env.db, &env.cache, &env.scope, q.id)
        .await
        .unwrap();
    let auth = authorize_quotation(&env.db, &env.cache, &env.scope, q.id, None)
        .await
        .unwrap();
    add_agenda_entry(
        &env.db,
        &env.cache,
        &env.scope,
        p.id,
        NewAgendaEntry {
            scheduled_at: Utc::now() + ChronoDuration::days(3),
            subject: "Llamada de seguimiento".into(),
            notes: None,
        },
    )
    .await
    .unwrap();

    let deleted = delete_promise(&env.db, &env.cache, &env.scope, p.id)
        .await
        .unwrap();
    assert_eq!(deleted.quotations, 2);
    assert_eq!(deleted.events, 1);
    assert_eq!(deleted.agenda_entries, 1);

    assert!(promises::Entity::find_by_id(p.id).one(&env.db).await.unwrap().is_none());
    let orphans = quotations::Entity::find()
        .filter(quotations::Column::PromiseId.eq(p.id))
        .count(&env.db)
        .await
        .unwrap();
    assert_eq!(orphans, 0);
    assert!(events::Entity::find_by_id(auth.event.id).one(&env.db).await.unwrap().is_none());
    assert_eq!(agenda_entries::Entity::find().count(&env.db).await.unwrap(), 0);
    assert!(
        contacts::Entity::find_by_id(p.contact_id)
            .one(&env.db)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn agenda_entry_is_logged_as_reminder() {
    let env = setup().await;
    let p = promise(&env).await;
    let entry = add_agenda_entry(
        &env.db,
        &env.cache,
        &env.scope,
        p.id,
        NewAgendaEntry {
            scheduled_at: Utc::now(),
            subject: "Visita al salón".into(),
            notes: Some("Llevar catálogo".into()),
        },
    )
    .await
    .unwrap();

    let agenda = list_agenda(&env.db, &env.scope, p.id).await.unwrap();
    assert_eq!(agenda.len(), 1);
    assert_eq!(agenda[0].id, entry.id);

    let reminder = promise_logs::Entity::find()
        .filter(promise_logs::Column::LogType.eq("reminder_created"))
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();
    assert!(reminder.content.starts_with("Recordatorio agendado: Visita al salón"));
}

#[tokio::test]
async fn cached_logs_refresh_after_mutation() {
    let env = setup().await;
    let p = promise(&env).await;

    let first = list_logs(&env.db, &env.cache, &env.scope, p.id, LogQuery::default())
        .await
        .unwrap();
    assert_eq!(first.len(), 1);

    add_note(
        &env.db,
        &env.cache,
        &env.scope,
        p.id,
        "Prefiere WhatsApp",
        OriginContext::Promise,
    )
    .await
    .unwrap();
    let second = list_logs(&env.db, &env.cache, &env.scope, p.id, LogQuery::default())
        .await
        .unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].log_type, "user_note");
}

#[tokio::test]
async fn fresh_read_bypasses_a_stale_cache() {
    let env = setup().await;
    let p = promise(&env).await;
    list_logs(&env.db, &env.cache, &env.scope, p.id, LogQuery::default())
        .await
        .unwrap();

    // Written behind the cache's back.
    products_promises::logs::append(
        &env.db,
        products_promises::logs::LogEntry::new(
            p.id,
            products_promises::logs::LogAction::ContactUpdated,
            serde_json::json!({}),
        ),
    )
    .await
    .unwrap();

    let cached = list_logs(&env.db, &env.cache, &env.scope, p.id, LogQuery::default())
        .await
        .unwrap();
    assert_eq!(cached.len(), 1);
    let fresh = list_logs(
        &env.db,
        &env.cache,
        &env.scope,
        p.id,
        LogQuery {
            fresh: true,
            ..LogQuery::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(fresh.len(), 2);
}

#[tokio::test]
async fn origin_filter_and_note_editing() {
    let env = setup().await;
    let p = promise(&env).await;
    let note = add_note(
        &env.db,
        &env.cache,
        &env.scope,
        p.id,
        "Confirmó locación",
        OriginContext::Event,
    )
    .await
    .unwrap();

    let event_side = list_logs(
        &env.db,
        &env.cache,
        &env.scope,
        p.id,
        LogQuery {
            origin: Some(OriginContext::Event),
            ..LogQuery::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(event_side.len(), 1);
    assert_eq!(event_side[0].id, note.id);

    let edited = edit_note(&env.db, &env.cache, &env.scope, note.id, "Confirmó jardín")
        .await
        .unwrap();
    assert_eq!(edited.content, "Confirmó jardín");

    assert!(matches!(
        edit_note(&env.db, &env.cache, &env.scope, note.id, "   ").await,
        Err(ServiceError::Validation(_))
    ));

    delete_note(&env.db, &env.cache, &env.scope, note.id)
        .await
        .unwrap();
    assert!(
        promise_logs::Entity::find_by_id(note.id)
            .one(&env.db)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn system_entries_are_immutable() {
    let env = setup().await;
    let p = promise(&env).await;
    let created = promise_logs::Entity::find()
        .filter(promise_logs::Column::PromiseId.eq(p.id))
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(
        edit_note(&env.db, &env.cache, &env.scope, created.id, "otra cosa").await,
        Err(ServiceError::BusinessRule(_))
    ));
    assert!(matches!(
        delete_note(&env.db, &env.cache, &env.scope, created.id).await,
        Err(ServiceError::BusinessRule(_))
    ));
}

#[tokio::test]
async fn notes_are_attributed_to_the_resolved_studio_user() {
    let env = setup().await;
    let platform_user = Uuid::new_v4();
    let member = ensure_studio_user(&env.db, env.seeded.studio.id, platform_user, "Carla")
        .await
        .unwrap();
    let again = ensure_studio_user(&env.db, env.seeded.studio.id, platform_user, "Carla")
        .await
        .unwrap();
    assert_eq!(again.id, member.id);

    let scope = StudioScope::resolve(&env.db, "demo", Some(platform_user))
        .await
        .unwrap();
    assert_eq!(scope.actor, Some(member.id));
    let stranger = StudioScope::resolve(&env.db, "demo", Some(Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(stranger.actor, None);

    let p = promise(&env).await;
    let note = add_note(
        &env.db,
        &env.cache,
        &scope,
        p.id,
        "Llamar el lunes",
        OriginContext::Promise,
    )
    .await
    .unwrap();
    assert_eq!(note.user_id, Some(member.id));
}
