use async_graphql::{Context, ID, Object};
use platform_api::ApiResult;
use products_promises::logs::{self, LogQuery};
use products_promises::{
    StudioScope, business_terms, mover, offers, promises, quotations, stages,
};
use tracing::instrument;

use super::types::{
    AgendaNode, BusinessTermNode, CatalogNode, HistoryNode, LogNode, LogOrigin, OfferNode,
    PromiseNode, QuotationNode, StageNode, StudioNode, parse_optional,
};
use super::{HealthPayload, database, parse_id, resolve_scope, service_error, shared};

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> ApiResult<HealthPayload> {
        Ok(HealthPayload { ok: true })
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> ApiResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    /// Every read is scoped to one studio.
    #[instrument(name = "graphql.studio", skip(self, ctx))]
    async fn studio(&self, ctx: &Context<'_>, slug: String) -> async_graphql::Result<StudioQuery> {
        let scope = resolve_scope(ctx, &slug).await?;
        Ok(StudioQuery { scope })
    }
}

pub struct StudioQuery {
    scope: StudioScope,
}

#[Object]
impl StudioQuery {
    async fn studio(&self) -> StudioNode {
        self.scope.studio.clone().into()
    }

    async fn stages(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] include_inactive: bool,
    ) -> async_graphql::Result<Vec<StageNode>> {
        let db = database(ctx)?;
        let rows = stages::list_stages(db, self.scope.studio_id(), include_inactive)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(name = "graphql.promises", skip(self, ctx))]
    async fn promises(
        &self,
        ctx: &Context<'_>,
        stage_id: Option<ID>,
    ) -> async_graphql::Result<Vec<PromiseNode>> {
        let db = database(ctx)?;
        let stage_id = parse_optional(&stage_id)?;
        let rows = promises::list_promises(db, &self.scope, stage_id)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn promise(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<PromiseNode> {
        let db = database(ctx)?;
        let promise = promises::find_promise(db, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(promise.into())
    }

    async fn quotations(
        &self,
        ctx: &Context<'_>,
        promise_id: ID,
    ) -> async_graphql::Result<Vec<QuotationNode>> {
        let db = database(ctx)?;
        let rows = quotations::list_for_promise(db, &self.scope, parse_id(&promise_id)?)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn quotation(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<QuotationNode> {
        let db = database(ctx)?;
        let quotation = quotations::find_quotation(db, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(quotation.into())
    }

    /// Promise timeline, newest first. `fresh` skips the cached copy.
    #[instrument(name = "graphql.logs", skip(self, ctx))]
    async fn logs(
        &self,
        ctx: &Context<'_>,
        promise_id: ID,
        origin: Option<LogOrigin>,
        #[graphql(default)] fresh: bool,
        limit: Option<u32>,
    ) -> async_graphql::Result<Vec<LogNode>> {
        let data = shared(ctx)?;
        let query = LogQuery {
            origin: origin.map(Into::into),
            fresh,
            limit: limit.map(|value| value as usize),
        };
        let rows = logs::list_logs(
            &data.pool,
            &data.cache,
            &self.scope,
            parse_id(&promise_id)?,
            query,
        )
        .await
        .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn stage_history(
        &self,
        ctx: &Context<'_>,
        promise_id: ID,
    ) -> async_graphql::Result<Vec<HistoryNode>> {
        let db = database(ctx)?;
        let rows = mover::stage_history(db, &self.scope, parse_id(&promise_id)?)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn agenda(
        &self,
        ctx: &Context<'_>,
        promise_id: ID,
    ) -> async_graphql::Result<Vec<AgendaNode>> {
        let db = database(ctx)?;
        let rows = promises::list_agenda(db, &self.scope, parse_id(&promise_id)?)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn offers(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<OfferNode>> {
        let db = database(ctx)?;
        let rows = offers::list_offers(db, &self.scope)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn offer(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<OfferNode> {
        let db = database(ctx)?;
        let offer = offers::get_offer(db, &self.scope, parse_id(&id)?)
            .await
            .map_err(service_error)?;
        Ok(offer.into())
    }

    async fn business_terms(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<BusinessTermNode>> {
        let db = database(ctx)?;
        let rows = business_terms::list_business_terms(db, &self.scope)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn acquisition_channels(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<CatalogNode>> {
        let db = database(ctx)?;
        let rows = promises::list_acquisition_channels(db, &self.scope)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn social_networks(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<CatalogNode>> {
        let db = database(ctx)?;
        let rows = promises::list_social_networks(db)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn event_types(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<CatalogNode>> {
        let db = database(ctx)?;
        let rows = promises::list_event_types(db, &self.scope)
            .await
            .map_err(service_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
