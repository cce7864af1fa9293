mod mutation;
mod query;
mod types;

use async_graphql::{
    Context, EmptySubscription, Error, ErrorExtensions, ID, Schema, SimpleObject,
};
use platform_api::ApiError;
use platform_db::DbPool;
use products_promises::{CacheBus, ServiceError, StudioScope};
use serde::Serialize;
use uuid::Uuid;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Shared handles injected into every GraphQL request.
#[derive(Clone)]
pub struct GraphqlData {
    pub pool: DbPool,
    pub cache: CacheBus,
}

/// Caller identity forwarded by the gateway, if any.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestUser {
    pub platform_user_id: Option<Uuid>,
}

pub fn build_schema(data: GraphqlData) -> SchemaType {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(data)
        .finish()
}

/// SDL snapshot; resolvers are never invoked so no data is attached.
pub fn schema_sdl() -> String {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .finish()
        .sdl()
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
}

fn error_with_code(code: &'static str, message: impl Into<String>) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

pub(crate) fn shared<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a GraphqlData> {
    ctx.data::<GraphqlData>()
        .map_err(|_| error_with_code("INTERNAL", "Database not configured"))
}

pub(crate) fn database<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a DbPool> {
    Ok(&shared(ctx)?.pool)
}

pub(crate) fn parse_id(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| {
        ApiError::InvalidInput(format!("identificador inválido: {}", id.as_str()))
            .with_reason("validation-shape-error")
    })
}

/// Maps a rules failure onto the GraphQL error payload, keeping the
/// machine-readable reason when there is one.
pub(crate) fn service_error(err: ServiceError) -> Error {
    let reason = err.reason();
    let api = ApiError::from(err);
    match reason {
        Some(reason) => api.with_reason(reason),
        None => api.extend(),
    }
}

/// Resolves `slug` plus the forwarded caller into a tenant scope.
pub(crate) async fn resolve_scope(
    ctx: &Context<'_>,
    slug: &str,
) -> async_graphql::Result<StudioScope> {
    let db = database(ctx)?;
    let platform_user_id = ctx
        .data_opt::<RequestUser>()
        .and_then(|user| user.platform_user_id);
    StudioScope::resolve(db, slug, platform_user_id)
        .await
        .map_err(service_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::{Request, Variables};
    use migration::{Migrator, MigratorTrait};
    use products_promises::seed::seed_studio;
    use sea_orm::Database;
    use serde_json::{Value, json};
    use std::time::Duration;

    async fn test_schema() -> SchemaType {
        let pool = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&pool, None).await.unwrap();
        seed_studio(&pool, "demo", "Estudio Demo").await.unwrap();
        build_schema(GraphqlData {
            pool,
            cache: CacheBus::new(Duration::from_secs(60)),
        })
    }

    async fn run(schema: &SchemaType, query: &str, variables: Value) -> async_graphql::Response {
        schema
            .execute(Request::new(query).variables(Variables::from_json(variables)))
            .await
    }

    fn error_code(response: &async_graphql::Response) -> Option<String> {
        let err = response.errors.first()?;
        let value = err.extensions.as_ref()?.get("code")?;
        match value {
            async_graphql::Value::String(code) => Some(code.clone()),
            _ => None,
        }
    }

    fn error_reason(response: &async_graphql::Response) -> Option<String> {
        let err = response.errors.first()?;
        let value = err.extensions.as_ref()?.get("reason")?;
        match value {
            async_graphql::Value::String(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    const CREATE_PROMISE: &str = r#"
        mutation($input: NewPromiseInput!) {
            studio(slug: "demo") {
                createPromise(input: $input) { id pipelineStageId contact { phone } }
            }
        }
    "#;

    async fn create_promise(schema: &SchemaType, phone: &str) -> String {
        let response = run(
            schema,
            CREATE_PROMISE,
            json!({ "input": { "contact": { "name": "Ana", "phone": phone } } }),
        )
        .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        body["studio"]["createPromise"]["id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn create_quotation(schema: &SchemaType, promise_id: &str, name: &str) -> String {
        let response = run(
            schema,
            r#"mutation($input: NewQuotationInput!) {
                studio(slug: "demo") { createQuotation(input: $input) { id status } }
            }"#,
            json!({ "input": { "promiseId": promise_id, "name": name, "priceCents": 150000 } }),
        )
        .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        body["studio"]["createQuotation"]["id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn health_query_returns_ok() {
        let schema = test_schema().await;
        let response = schema.execute(Request::new("{ health { ok } }")).await;
        assert!(response.errors.is_empty());
        let body = response.data.into_json().unwrap();
        assert_eq!(body, json!({"health": {"ok": true}}));
    }

    #[tokio::test]
    async fn seeded_stages_are_listed_in_order() {
        let schema = test_schema().await;
        let response = schema
            .execute(Request::new(
                r#"{ studio(slug: "demo") { stages { slug order isSystem } } }"#,
            ))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        let slugs: Vec<&str> = body["studio"]["stages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|stage| stage["slug"].as_str().unwrap())
            .collect();
        assert_eq!(slugs, vec!["pending", "negotiation", "closing", "approved", "archived"]);
    }

    #[tokio::test]
    async fn unknown_studio_is_not_found() {
        let schema = test_schema().await;
        let response = schema
            .execute(Request::new(r#"{ studio(slug: "nope") { stages { id } } }"#))
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("NOT_FOUND"));
    }

    #[tokio::test]
    async fn created_promise_lands_in_first_stage_with_normalized_phone() {
        let schema = test_schema().await;
        let response = run(
            &schema,
            CREATE_PROMISE,
            json!({ "input": { "contact": { "name": "Ana", "phone": "(55) 1234-5678" } } }),
        )
        .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(body["studio"]["createPromise"]["contact"]["phone"], json!("5512345678"));

        let promise_id = body["studio"]["createPromise"]["id"].as_str().unwrap();
        let logs = run(
            &schema,
            r#"query($id: ID!) { studio(slug: "demo") { logs(promiseId: $id) { logType } } }"#,
            json!({ "id": promise_id }),
        )
        .await;
        assert!(logs.errors.is_empty(), "{:?}", logs.errors);
        let logs = logs.data.into_json().unwrap();
        assert_eq!(logs["studio"]["logs"][0]["logType"], json!("promise_created"));
    }

    #[tokio::test]
    async fn second_closing_quotation_is_a_business_rule_error() {
        let schema = test_schema().await;
        let promise_id = create_promise(&schema, "5510000001").await;
        let first = create_quotation(&schema, &promise_id, "Paquete A").await;
        let second = create_quotation(&schema, &promise_id, "Paquete B").await;

        let to_closing = r#"mutation($id: ID!) {
            studio(slug: "demo") { moveQuotationToClosing(id: $id) { status } }
        }"#;
        let ok = run(&schema, to_closing, json!({ "id": first })).await;
        assert!(ok.errors.is_empty(), "{:?}", ok.errors);
        assert_eq!(
            ok.data.into_json().unwrap()["studio"]["moveQuotationToClosing"]["status"],
            json!("CLOSING")
        );

        let rejected = run(&schema, to_closing, json!({ "id": second })).await;
        assert_eq!(error_code(&rejected).as_deref(), Some("BUSINESS_RULE"));
        assert_eq!(error_reason(&rejected).as_deref(), Some("business-rule"));
    }

    #[tokio::test]
    async fn available_actions_follow_the_lifecycle() {
        let schema = test_schema().await;
        let promise_id = create_promise(&schema, "5510000002").await;
        create_quotation(&schema, &promise_id, "Paquete A").await;

        let response = run(
            &schema,
            r#"query($id: ID!) {
                studio(slug: "demo") { quotations(promiseId: $id) { availableActions } }
            }"#,
            json!({ "id": promise_id }),
        )
        .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let body = response.data.into_json().unwrap();
        assert_eq!(
            body["studio"]["quotations"][0]["availableActions"],
            json!(["MOVE_TO_CLOSING", "START_NEGOTIATION", "ARCHIVE"])
        );
    }

    #[tokio::test]
    async fn malformed_move_ids_report_a_shape_error() {
        let schema = test_schema().await;
        let response = run(
            &schema,
            r#"mutation {
                studio(slug: "demo") { movePromise(promiseId: "nope", stageId: "also-nope") { changed } }
            }"#,
            json!({}),
        )
        .await;
        assert_eq!(error_code(&response).as_deref(), Some("VALIDATION"));
        assert_eq!(error_reason(&response).as_deref(), Some("validation-shape-error"));
    }

    #[test]
    fn sdl_exposes_the_studio_namespace() {
        let sdl = schema_sdl();
        assert!(sdl.contains("studio(slug: String!)"));
        assert!(sdl.contains("availableActions"));
    }
}
