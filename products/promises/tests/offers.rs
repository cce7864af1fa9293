mod common;

use chrono::NaiveDate;
use products_promises::ServiceError;
use products_promises::business_terms::{NewBusinessTerm, create_business_term, list_business_terms};
use products_promises::offers::{
    Availability, DraftSection, FieldKind, LeadFormField, LeaveDecision, OfferDraft, OfferEditor,
    create_offer, get_offer, list_offers,
};
use uuid::Uuid;

use common::setup;

fn draft(name: &str) -> OfferDraft {
    let mut draft = OfferDraft::default();
    draft.basic.name = name.into();
    draft.basic.is_active = true;
    draft
}

#[tokio::test]
async fn save_then_continue_clears_dirty_state() {
    let env = setup().await;
    let mut editor = OfferEditor::new_offer();
    editor.edit(|d| {
        d.basic.name = "Mini sesión navideña".into();
        d.basic.availability = Availability::Window {
            starts_on: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            ends_on: NaiveDate::from_ymd_opt(2026, 12, 20).unwrap(),
        };
        d.lead_form.fields.push(LeadFormField {
            key: "phone".into(),
            label: "Teléfono".into(),
            kind: FieldKind::Phone,
            required: true,
        });
    });
    assert!(matches!(editor.request_leave(), LeaveDecision::Blocked { .. }));

    let saved = editor
        .save_then_continue(&env.db, &env.cache, &env.scope)
        .await
        .unwrap();
    assert_eq!(saved.slug, "mini-sesion-navidena");
    assert!(!saved.is_permanent);
    assert_eq!(editor.offer_id(), Some(saved.id));
    assert_eq!(editor.request_leave(), LeaveDecision::Proceed);

    editor.edit(|d| d.basic.description = Some("Fondo rojo".into()));
    assert_eq!(editor.dirty_sections(), vec![DraftSection::Basic]);
    editor
        .save_then_continue(&env.db, &env.cache, &env.scope)
        .await
        .unwrap();

    let stored = get_offer(&env.db, &env.scope, saved.id).await.unwrap();
    assert_eq!(stored.description.as_deref(), Some("Fondo rojo"));
    let reopened = OfferEditor::open(&stored).unwrap();
    assert_eq!(reopened.draft(), editor.draft());
    assert!(!reopened.is_dirty());
}

#[tokio::test]
async fn discard_restores_snapshot() {
    let env = setup().await;
    let saved = create_offer(&env.db, &env.cache, &env.scope, draft("Retratos"))
        .await
        .unwrap();
    let mut editor = OfferEditor::open(&saved).unwrap();
    editor.edit(|d| d.basic.name = "Retratos 2".into());
    assert!(editor.is_dirty());
    editor.discard();
    assert!(!editor.is_dirty());
    assert_eq!(editor.draft().basic.name, "Retratos");
}

#[tokio::test]
async fn slug_is_unique_per_studio() {
    let env = setup().await;
    create_offer(&env.db, &env.cache, &env.scope, draft("Boda completa"))
        .await
        .unwrap();
    let err = create_offer(&env.db, &env.cache, &env.scope, draft("Boda  completa"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let (other_scope, _) = env.other_studio().await;
    create_offer(&env.db, &env.cache, &other_scope, draft("Boda completa"))
        .await
        .unwrap();
    assert_eq!(list_offers(&env.db, &env.scope).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_business_term_is_rejected() {
    let env = setup().await;
    let mut d = draft("Con condiciones");
    d.basic.business_term_id = Some(Uuid::new_v4());
    let err = create_offer(&env.db, &env.cache, &env.scope, d)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let term = create_business_term(
        &env.db,
        &env.scope,
        NewBusinessTerm {
            name: "Anticipo 30%".into(),
            discount_percent: 0,
            advance_percent: 30,
        },
    )
    .await
    .unwrap();
    let mut d = draft("Con condiciones");
    d.basic.business_term_id = Some(term.id);
    let saved = create_offer(&env.db, &env.cache, &env.scope, d).await.unwrap();
    assert_eq!(saved.business_term_id, Some(term.id));
    assert_eq!(list_business_terms(&env.db, &env.scope).await.unwrap().len(), 1);
}

#[tokio::test]
async fn business_term_percent_out_of_range() {
    let env = setup().await;
    let err = create_business_term(
        &env.db,
        &env.scope,
        NewBusinessTerm {
            name: "Imposible".into(),
            discount_percent: 120,
            advance_percent: 0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}
