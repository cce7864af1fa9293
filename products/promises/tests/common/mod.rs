#![allow(dead_code)]

use std::time::Duration;

use entity::{pipeline_stages, promises, quotations};
use migration::{Migrator, MigratorTrait};
use products_promises::promises::{ContactInput, NewPromise, create_promise};
use products_promises::quotations::{NewQuotation, create_quotation};
use products_promises::seed::{SeededStudio, seed_studio};
use products_promises::{CacheBus, StudioScope};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

pub struct TestEnv {
    pub db: DatabaseConnection,
    pub cache: CacheBus,
    pub scope: StudioScope,
    pub seeded: SeededStudio,
}

impl TestEnv {
    pub fn stage(&self, slug: &str) -> pipeline_stages::Model {
        self.seeded
            .stages
            .iter()
            .find(|stage| stage.slug == slug)
            .cloned()
            .unwrap()
    }

    pub fn channel(&self, name: &str) -> Uuid {
        self.seeded
            .channels
            .iter()
            .find(|channel| channel.name == name)
            .unwrap()
            .id
    }

    /// Scope of a second studio sharing the same database.
    pub async fn other_studio(&self) -> (StudioScope, SeededStudio) {
        let seeded = seed_studio(&self.db, "otro", "Otro estudio").await.unwrap();
        (StudioScope::new(seeded.studio.clone(), None), seeded)
    }
}

pub async fn setup() -> TestEnv {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let seeded = seed_studio(&db, "demo", "Estudio Demo").await.unwrap();
    let scope = StudioScope::new(seeded.studio.clone(), None);
    TestEnv {
        db,
        cache: CacheBus::new(Duration::from_secs(60)),
        scope,
        seeded,
    }
}

pub async fn promise_with_phone(env: &TestEnv, phone: &str) -> promises::Model {
    create_promise(
        &env.db,
        &env.cache,
        &env.scope,
        NewPromise {
            contact: Some(ContactInput {
                name: "Ana López".into(),
                phone: phone.into(),
                email: None,
            }),
            ..NewPromise::default()
        },
    )
    .await
    .unwrap()
}

pub async fn promise(env: &TestEnv) -> promises::Model {
    let phone = format!("55{:08}", Uuid::new_v4().as_u128() % 100_000_000);
    promise_with_phone(env, &phone).await
}

pub async fn quotation(env: &TestEnv, promise_id: Uuid, name: &str) -> quotations::Model {
    create_quotation(
        &env.db,
        &env.cache,
        &env.scope,
        NewQuotation {
            promise_id,
            name: name.into(),
            price_cents: 100_000,
            ..NewQuotation::default()
        },
    )
    .await
    .unwrap()
}
