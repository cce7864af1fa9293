use chrono::Utc;
use entity::business_terms;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::scope::StudioScope;

#[derive(Clone, Debug, Default)]
pub struct NewBusinessTerm {
    pub name: String,
    pub discount_percent: i16,
    pub advance_percent: i16,
}

fn check_percent(label: &str, value: i16) -> ServiceResult<()> {
    if !(0..=100).contains(&value) {
        return Err(ServiceError::validation(format!(
            "{label} debe estar entre 0 y 100"
        )));
    }
    Ok(())
}

#[instrument(skip(db, scope, input), fields(studio = %scope.slug()))]
pub async fn create_business_term(
    db: &DatabaseConnection,
    scope: &StudioScope,
    input: NewBusinessTerm,
) -> ServiceResult<business_terms::Model> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::validation("El nombre de la condición es obligatorio"));
    }
    check_percent("El descuento", input.discount_percent)?;
    check_percent("El anticipo", input.advance_percent)?;

    let term = business_terms::ActiveModel {
        id: Set(Uuid::new_v4()),
        studio_id: Set(scope.studio_id()),
        name: Set(name),
        discount_percent: Set(input.discount_percent),
        advance_percent: Set(input.advance_percent),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(term)
}

pub async fn list_business_terms<C>(
    conn: &C,
    scope: &StudioScope,
) -> ServiceResult<Vec<business_terms::Model>>
where
    C: ConnectionTrait,
{
    let terms = business_terms::Entity::find()
        .filter(business_terms::Column::StudioId.eq(scope.studio_id()))
        .order_by_asc(business_terms::Column::Name)
        .all(conn)
        .await?;
    Ok(terms)
}

pub async fn find_business_term<C>(
    conn: &C,
    scope: &StudioScope,
    term_id: Uuid,
) -> ServiceResult<business_terms::Model>
where
    C: ConnectionTrait,
{
    business_terms::Entity::find_by_id(term_id)
        .filter(business_terms::Column::StudioId.eq(scope.studio_id()))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("la condición comercial no existe"))
}

#[cfg(test)]
mod tests {
    use super::check_percent;

    #[test]
    fn percents_are_bounded() {
        assert!(check_percent("x", 0).is_ok());
        assert!(check_percent("x", 100).is_ok());
        assert!(check_percent("x", 101).is_err());
        assert!(check_percent("x", -1).is_err());
    }
}
