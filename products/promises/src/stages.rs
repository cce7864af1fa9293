//! Per-studio pipeline stages: the kanban columns promises move through.

use std::collections::HashSet;

use chrono::Utc;
use entity::pipeline_stages::{self, APPROVED_SLUG, ARCHIVED_SLUG};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::cache::CacheBus;
use crate::error::{ServiceError, ServiceResult};
use crate::scope::StudioScope;

pub const DEFAULT_COLOR: &str = "#64748b";

/// Stages every studio starts with: `(slug, name, color, is_system)`.
pub const DEFAULT_STAGES: [(&str, &str, &str, bool); 5] = [
    ("pending", "Pendiente", "#94a3b8", false),
    ("negotiation", "En negociación", "#f59e0b", false),
    ("closing", "En cierre", "#3b82f6", false),
    (APPROVED_SLUG, "Aprobada", "#22c55e", true),
    (ARCHIVED_SLUG, "Archivada", "#6b7280", true),
];

#[derive(Clone, Debug, Default)]
pub struct NewStage {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct StageUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

/// Lowercase ASCII slug; accents are folded and separators collapse to `-`.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for ch in raw.trim().chars().flat_map(char::to_lowercase) {
        let folded = match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        };
        if folded.is_ascii_alphanumeric() {
            slug.push(folded);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub async fn list_stages<C>(
    conn: &C,
    studio_id: Uuid,
    include_inactive: bool,
) -> ServiceResult<Vec<pipeline_stages::Model>>
where
    C: ConnectionTrait,
{
    let mut query = pipeline_stages::Entity::find()
        .filter(pipeline_stages::Column::StudioId.eq(studio_id))
        .order_by_asc(pipeline_stages::Column::SortOrder);
    if !include_inactive {
        query = query.filter(pipeline_stages::Column::IsActive.eq(true));
    }
    Ok(query.all(conn).await?)
}

pub async fn find_stage_by_slug<C>(
    conn: &C,
    studio_id: Uuid,
    slug: &str,
) -> Result<Option<pipeline_stages::Model>, DbErr>
where
    C: ConnectionTrait,
{
    pipeline_stages::Entity::find()
        .filter(pipeline_stages::Column::StudioId.eq(studio_id))
        .filter(pipeline_stages::Column::Slug.eq(slug))
        .one(conn)
        .await
}

/// First active, non-archived stage by order. New and unarchived promises land here.
pub async fn first_open_stage<C>(
    conn: &C,
    studio_id: Uuid,
) -> Result<Option<pipeline_stages::Model>, DbErr>
where
    C: ConnectionTrait,
{
    pipeline_stages::Entity::find()
        .filter(pipeline_stages::Column::StudioId.eq(studio_id))
        .filter(pipeline_stages::Column::IsActive.eq(true))
        .filter(pipeline_stages::Column::Slug.ne(ARCHIVED_SLUG))
        .order_by_asc(pipeline_stages::Column::SortOrder)
        .one(conn)
        .await
}

async fn find_in_studio<C>(
    conn: &C,
    scope: &StudioScope,
    stage_id: Uuid,
) -> ServiceResult<pipeline_stages::Model>
where
    C: ConnectionTrait,
{
    pipeline_stages::Entity::find_by_id(stage_id)
        .filter(pipeline_stages::Column::StudioId.eq(scope.studio_id()))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("la etapa no existe"))
}

async fn unique_slug<C>(conn: &C, studio_id: Uuid, base: &str) -> ServiceResult<String>
where
    C: ConnectionTrait,
{
    let taken: HashSet<String> = list_stages(conn, studio_id, true)
        .await?
        .into_iter()
        .map(|stage| stage.slug)
        .collect();
    if !taken.contains(base) {
        return Ok(base.to_string());
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

#[instrument(skip(db, cache, scope, input), fields(studio = %scope.slug()))]
pub async fn create_stage(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    input: NewStage,
) -> ServiceResult<pipeline_stages::Model> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("El nombre de la etapa es obligatorio"));
    }
    let base = slugify(&name);
    if base.is_empty() {
        return Err(ServiceError::validation(
            "El nombre de la etapa debe contener letras o números",
        ));
    }

    let txn = db.begin().await?;
    let slug = unique_slug(&txn, scope.studio_id(), &base).await?;
    let next_order = list_stages(&txn, scope.studio_id(), true)
        .await?
        .iter()
        .map(|stage| stage.sort_order)
        .max()
        .map_or(0, |max| max + 1);
    let now = Utc::now();
    let stage = pipeline_stages::ActiveModel {
        id: Set(Uuid::new_v4()),
        studio_id: Set(scope.studio_id()),
        name: Set(name),
        slug: Set(slug),
        color: Set(input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
        sort_order: Set(next_order),
        is_system: Set(false),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await
    .map_err(|err| ServiceError::from_db_with_conflict(err, "ya existe una etapa con ese nombre"))?;
    txn.commit().await?;

    info!(stage = %stage.slug, "pipeline stage created");
    cache.revalidate_pipeline(scope.slug());
    Ok(stage)
}

#[instrument(skip(db, cache, scope, input), fields(studio = %scope.slug()))]
pub async fn update_stage(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    stage_id: Uuid,
    input: StageUpdate,
) -> ServiceResult<pipeline_stages::Model> {
    let stage = find_in_studio(db, scope, stage_id).await?;
    if stage.is_system {
        if input.name.is_some() {
            return Err(ServiceError::BusinessRule(
                "las etapas del sistema no pueden renombrarse".to_string(),
            ));
        }
        if input.is_active == Some(false) {
            return Err(ServiceError::BusinessRule(
                "las etapas del sistema no pueden desactivarse".to_string(),
            ));
        }
    }

    let mut active: pipeline_stages::ActiveModel = stage.into();
    if let Some(name) = input.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::validation("El nombre de la etapa es obligatorio"));
        }
        active.name = Set(name);
    }
    if let Some(color) = input.color {
        active.color = Set(color);
    }
    if let Some(is_active) = input.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db).await?;
    cache.revalidate_pipeline(scope.slug());
    Ok(updated)
}

/// `ordered_ids` must list every stage of the studio exactly once; the
/// resulting orders are `0..n`.
#[instrument(skip(db, cache, scope, ordered_ids), fields(studio = %scope.slug()))]
pub async fn reorder_stages(
    db: &DatabaseConnection,
    cache: &CacheBus,
    scope: &StudioScope,
    ordered_ids: &[Uuid],
) -> ServiceResult<Vec<pipeline_stages::Model>> {
    let txn = db.begin().await?;
    let stages = list_stages(&txn, scope.studio_id(), true).await?;
    let known: HashSet<Uuid> = stages.iter().map(|stage| stage.id).collect();
    let requested: HashSet<Uuid> = ordered_ids.iter().copied().collect();
    if requested.len() != ordered_ids.len() || requested != known {
        return Err(ServiceError::validation(
            "el nuevo orden debe incluir cada etapa exactamente una vez",
        ));
    }

    let now = Utc::now();
    for (position, stage_id) in ordered_ids.iter().enumerate() {
        pipeline_stages::ActiveModel {
            id: Set(*stage_id),
            sort_order: Set(position as i32),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .update(&txn)
        .await?;
    }
    let reordered = list_stages(&txn, scope.studio_id(), true).await?;
    txn.commit().await?;

    cache.revalidate_pipeline(scope.slug());
    Ok(reordered)
}

/// Inserts the default stages for a studio that has none. Idempotent.
pub async fn seed_default_stages<C>(
    conn: &C,
    studio_id: Uuid,
) -> ServiceResult<Vec<pipeline_stages::Model>>
where
    C: ConnectionTrait,
{
    let existing = list_stages(conn, studio_id, true).await?;
    if !existing.is_empty() {
        return Ok(existing);
    }
    let now = Utc::now();
    let mut created = Vec::with_capacity(DEFAULT_STAGES.len());
    for (order, (slug, name, color, is_system)) in DEFAULT_STAGES.into_iter().enumerate() {
        let stage = pipeline_stages::ActiveModel {
            id: Set(Uuid::new_v4()),
            studio_id: Set(studio_id),
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            color: Set(color.to_string()),
            sort_order: Set(order as i32),
            is_system: Set(is_system),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(conn)
        .await?;
        created.push(stage);
    }
    info!(%studio_id, "default pipeline stages seeded");
    Ok(created)
}
