use async_graphql::{Context, ID, Object};
use chrono::NaiveDate;
use products_promises::business_terms::{self, NewBusinessTerm};
use products_promises::logs;
use products_promises::{ServiceError, StudioScope, mover, offers, promises, quotations, stages};
use tracing::instrument;

use super::types::{
    AgendaInput, AgendaNode, AuthorizationResult, BusinessTermInput, BusinessTermNode,
    CancelModeKind, DeletedPromiseResult, LogNode, LogOrigin, MoveResult, NewPromiseInput,
    NewQuotationInput, NewStageInput, OfferInput, OfferNode, PromiseNode, QuotationNode, StageNode,
    UpdatePromiseInput, UpdateQuotationInput, UpdateStageInput, parse_ids,
};
use super::{GraphqlData, parse_id, resolve_scope, service_error, shared};

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Every write is scoped to one studio.
    #[instrument(name = "graphql.studio_mutation", skip(self, ctx))]
    async fn studio(
        &self,
        ctx: &Context<'_>,
        slug: String,
    ) -> async_graphql::Result<StudioMutation> {
        let scope = resolve_scope(ctx, &slug).await?;
        Ok(StudioMutation { scope })
    }
}

pub struct StudioMutation {
    scope: StudioScope,
}

fn moved(
    result: Result<mover::MoveOutcome, products_promises::StageMoveError>,
) -> async_graphql::Result<MoveResult> {
    result
        .map(Into::into)
        .map_err(|err| service_error(ServiceError::from(err)))
}

#[Object]
impl StudioMutation {
    #[instrument(name = "graphql.create_promise", skip_all)]
    async fn create_promise(
        &self,
        ctx: &Context<'_>,
        input: NewPromiseInput,
    ) -> async_graphql::Result<PromiseNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let promise = promises::create_promise(pool, cache, &self.scope, input.into_new_promise()?)
            .await
            .map_err(service_error)?;
        Ok(promise.into())
    }

    async fn update_promise(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: UpdatePromiseInput,
    ) -> async_graphql::Result<PromiseNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let promise =
            promises::update_promise(pool, cache, &self.scope, parse_id(&id)?, input.into_update()?)
                .await
                .map_err(service_error)?;
        Ok(promise.into())
    }

    #[instrument(name = "graphql.delete_promise", skip(self, ctx))]
    async fn delete_promise(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<DeletedPromiseResult> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let deleted = promises::delete_promise(pool, cache, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(deleted.into())
    }

    /// Board drag. Ids are taken verbatim so malformed ones surface as a
    /// shape error instead of a schema error.
    #[instrument(name = "graphql.move_promise", skip(self, ctx))]
    async fn move_promise(
        &self,
        ctx: &Context<'_>,
        promise_id: String,
        stage_id: String,
        reason: Option<String>,
    ) -> async_graphql::Result<MoveResult> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        moved(mover::move_promise(pool, cache, &self.scope, &promise_id, &stage_id, reason).await)
    }

    async fn archive_promise(
        &self,
        ctx: &Context<'_>,
        id: ID,
        reason: Option<String>,
    ) -> async_graphql::Result<MoveResult> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        moved(mover::archive_promise(pool, cache, &self.scope, parse_id(&id)?, reason).await)
    }

    async fn unarchive_promise(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<MoveResult> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        moved(mover::unarchive_promise(pool, cache, &self.scope, parse_id(&id)?).await)
    }

    async fn add_agenda_entry(
        &self,
        ctx: &Context<'_>,
        promise_id: ID,
        input: AgendaInput,
    ) -> async_graphql::Result<AgendaNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let entry = promises::add_agenda_entry(
            pool,
            cache,
            &self.scope,
            parse_id(&promise_id)?,
            input.into(),
        )
        .await
        .map_err(service_error)?;
        Ok(entry.into())
    }

    async fn add_note(
        &self,
        ctx: &Context<'_>,
        promise_id: ID,
        text: String,
        #[graphql(default)] origin: LogOrigin,
    ) -> async_graphql::Result<LogNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let log = logs::add_note(
            pool,
            cache,
            &self.scope,
            parse_id(&promise_id)?,
            &text,
            origin.into(),
        )
        .await
        .map_err(service_error)?;
        Ok(log.into())
    }

    async fn edit_note(
        &self,
        ctx: &Context<'_>,
        id: ID,
        text: String,
    ) -> async_graphql::Result<LogNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let log = logs::edit_note(pool, cache, &self.scope, parse_id(&id)?, &text)
            .await
            .map_err(service_error)?;
        Ok(log.into())
    }

    async fn delete_note(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        logs::delete_note(pool, cache, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(true)
    }

    async fn create_stage(
        &self,
        ctx: &Context<'_>,
        input: NewStageInput,
    ) -> async_graphql::Result<StageNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let stage = stages::create_stage(pool, cache, &self.scope, input.into())
            .await
            .map_err(service_error)?;
        Ok(stage.into())
    }

    async fn update_stage(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: UpdateStageInput,
    ) -> async_graphql::Result<StageNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let stage = stages::update_stage(pool, cache, &self.scope, parse_id(&id)?, input.into())
            .await
            .map_err(service_error)?;
        Ok(stage.into())
    }

    async fn reorder_stages(
        &self,
        ctx: &Context<'_>,
        ordered_ids: Vec<ID>,
    ) -> async_graphql::Result<Vec<StageNode>> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let rows = stages::reorder_stages(pool, cache, &self.scope, &parse_ids(&ordered_ids)?)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_quotation(
        &self,
        ctx: &Context<'_>,
        input: NewQuotationInput,
    ) -> async_graphql::Result<QuotationNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let quotation =
            quotations::create_quotation(pool, cache, &self.scope, input.into_new_quotation()?)
                .await
                .map_err(service_error)?;
        Ok(quotation.into())
    }

    async fn update_quotation(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: UpdateQuotationInput,
    ) -> async_graphql::Result<QuotationNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let quotation = quotations::update_quotation(
            pool,
            cache,
            &self.scope,
            parse_id(&id)?,
            input.into_update()?,
        )
        .await
        .map_err(service_error)?;
        Ok(quotation.into())
    }

    async fn move_quotation_to_closing(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<QuotationNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let quotation = quotations::move_to_closing(pool, cache, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(quotation.into())
    }

    async fn cancel_quotation_closing(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<QuotationNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let quotation = quotations::cancel_closing(pool, cache, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(quotation.into())
    }

    async fn start_quotation_negotiation(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<QuotationNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let quotation = quotations::start_negotiation(pool, cache, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(quotation.into())
    }

    async fn end_quotation_negotiation(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<QuotationNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let quotation = quotations::end_negotiation(pool, cache, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(quotation.into())
    }

    async fn archive_quotation(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<QuotationNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let quotation = quotations::archive_quotation(pool, cache, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(quotation.into())
    }

    async fn unarchive_quotation(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<QuotationNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let quotation = quotations::unarchive_quotation(pool, cache, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(quotation.into())
    }

    /// Creates the event and moves the promise into the approved stage.
    #[instrument(name = "graphql.authorize_quotation", skip(self, ctx))]
    async fn authorize_quotation(
        &self,
        ctx: &Context<'_>,
        id: ID,
        event_date: Option<NaiveDate>,
    ) -> async_graphql::Result<AuthorizationResult> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let authorization =
            quotations::authorize_quotation(pool, cache, &self.scope, parse_id(&id)?, event_date)
                .await
                .map_err(service_error)?;
        Ok(authorization.into())
    }

    #[instrument(name = "graphql.cancel_quotation", skip(self, ctx))]
    async fn cancel_quotation(
        &self,
        ctx: &Context<'_>,
        id: ID,
        mode: CancelModeKind,
    ) -> async_graphql::Result<QuotationNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let quotation =
            quotations::cancel_quotation(pool, cache, &self.scope, parse_id(&id)?, mode.into())
                .await
                .map_err(service_error)?;
        Ok(quotation.into())
    }

    async fn set_quotation_visibility(
        &self,
        ctx: &Context<'_>,
        id: ID,
        visible: bool,
    ) -> async_graphql::Result<QuotationNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let quotation =
            quotations::set_visibility(pool, cache, &self.scope, parse_id(&id)?, visible)
                .await
                .map_err(service_error)?;
        Ok(quotation.into())
    }

    async fn reorder_quotations(
        &self,
        ctx: &Context<'_>,
        promise_id: ID,
        ordered_ids: Vec<ID>,
    ) -> async_graphql::Result<Vec<QuotationNode>> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let rows = quotations::reorder_quotations(
            pool,
            cache,
            &self.scope,
            parse_id(&promise_id)?,
            &parse_ids(&ordered_ids)?,
        )
        .await
        .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_quotation(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        quotations::delete_quotation(pool, cache, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(true)
    }

    async fn create_business_term(
        &self,
        ctx: &Context<'_>,
        input: BusinessTermInput,
    ) -> async_graphql::Result<BusinessTermNode> {
        let GraphqlData { pool, .. } = shared(ctx)?;
        let term = business_terms::create_business_term(
            pool,
            &self.scope,
            NewBusinessTerm {
                name: input.name,
                discount_percent: input.discount_percent,
                advance_percent: input.advance_percent,
            },
        )
        .await
        .map_err(service_error)?;
        Ok(term.into())
    }

    #[instrument(name = "graphql.save_offer", skip_all)]
    async fn save_offer(
        &self,
        ctx: &Context<'_>,
        id: Option<ID>,
        input: OfferInput,
    ) -> async_graphql::Result<OfferNode> {
        let GraphqlData { pool, cache } = shared(ctx)?;
        let draft = input.into_draft()?;
        let offer = match id {
            Some(id) => offers::update_offer(pool, cache, &self.scope, parse_id(&id)?, draft).await,
            None => offers::create_offer(pool, cache, &self.scope, draft).await,
        }
        .map_err(service_error)?;
        Ok(offer.into())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{GraphqlData, SchemaType, build_schema};
    use async_graphql::{Request, Variables};
    use migration::{Migrator, MigratorTrait};
    use products_promises::CacheBus;
    use products_promises::seed::seed_studio;
    use sea_orm::Database;
    use serde_json::{Value, json};
    use std::time::Duration;

    async fn schema() -> SchemaType {
        let pool = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&pool, None).await.unwrap();
        seed_studio(&pool, "demo", "Estudio Demo").await.unwrap();
        build_schema(GraphqlData {
            pool,
            cache: CacheBus::new(Duration::from_secs(60)),
        })
    }

    async fn exec(schema: &SchemaType, query: &str, variables: Value) -> Value {
        let response = schema
            .execute(Request::new(query).variables(Variables::from_json(variables)))
            .await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        response.data.into_json().unwrap()
    }

    #[tokio::test]
    async fn authorization_moves_the_promise_to_approved() {
        let schema = schema().await;
        let created = exec(
            &schema,
            r#"mutation {
                studio(slug: "demo") {
                    createPromise(input: { contact: { name: "Luis", phone: "5522223333" } }) { id }
                }
            }"#,
            json!({}),
        )
        .await;
        let promise_id = created["studio"]["createPromise"]["id"].as_str().unwrap().to_string();

        let quotation = exec(
            &schema,
            r#"mutation($promise: ID!) {
                studio(slug: "demo") {
                    createQuotation(input: { promiseId: $promise, name: "Boda completa", priceCents: 2500000 }) { id }
                }
            }"#,
            json!({ "promise": promise_id }),
        )
        .await;
        let quotation_id = quotation["studio"]["createQuotation"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        exec(
            &schema,
            r#"mutation($id: ID!) { studio(slug: "demo") { moveQuotationToClosing(id: $id) { id } } }"#,
            json!({ "id": quotation_id }),
        )
        .await;

        let authorized = exec(
            &schema,
            r#"mutation($id: ID!) {
                studio(slug: "demo") {
                    authorizeQuotation(id: $id, eventDate: "2027-05-14") {
                        quotation { status eventId }
                        event { eventDate status }
                        stageMove { toStage { slug } changed }
                    }
                }
            }"#,
            json!({ "id": quotation_id }),
        )
        .await;
        let payload = &authorized["studio"]["authorizeQuotation"];
        assert_eq!(payload["quotation"]["status"], json!("AUTHORIZED"));
        assert!(payload["quotation"]["eventId"].is_string());
        assert_eq!(payload["event"]["eventDate"], json!("2027-05-14"));
        assert_eq!(payload["event"]["status"], json!("activo"));
        assert_eq!(payload["stageMove"]["toStage"]["slug"], json!("approved"));
        assert_eq!(payload["stageMove"]["changed"], json!(true));
    }

    #[tokio::test]
    async fn notes_round_trip_through_the_timeline() {
        let schema = schema().await;
        let created = exec(
            &schema,
            r#"mutation {
                studio(slug: "demo") {
                    createPromise(input: { contact: { name: "Eva", phone: "5533334444" } }) { id }
                }
            }"#,
            json!({}),
        )
        .await;
        let promise_id = created["studio"]["createPromise"]["id"].as_str().unwrap().to_string();

        let note = exec(
            &schema,
            r#"mutation($id: ID!) {
                studio(slug: "demo") { addNote(promiseId: $id, text: "Llamar el lunes") { id logType } }
            }"#,
            json!({ "id": promise_id }),
        )
        .await;
        assert_eq!(note["studio"]["addNote"]["logType"], json!("user_note"));

        let timeline = exec(
            &schema,
            r#"query($id: ID!) {
                studio(slug: "demo") { logs(promiseId: $id, origin: PROMISE) { content } }
            }"#,
            json!({ "id": promise_id }),
        )
        .await;
        let contents: Vec<&str> = timeline["studio"]["logs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|log| log["content"].as_str().unwrap())
            .collect();
        assert!(contents.contains(&"Llamar el lunes"));
    }
}
