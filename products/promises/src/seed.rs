//! Baseline catalogs for a studio: stages, acquisition channels, social
//! networks and event types. Safe to run repeatedly.

use entity::{acquisition_channels, event_types, pipeline_stages, social_networks, studios};
use platform_db::ensure_studio;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::info;
use uuid::Uuid;

use crate::error::ServiceResult;
use crate::stages::seed_default_stages;

pub const DEFAULT_CHANNELS: [&str; 4] = ["Recomendación", "Redes sociales", "Sitio web", "Expo"];
pub const DEFAULT_SOCIAL_NETWORKS: [(&str, &str); 3] = [
    ("instagram", "Instagram"),
    ("facebook", "Facebook"),
    ("tiktok", "TikTok"),
];
pub const DEFAULT_EVENT_TYPES: [&str; 3] = ["Boda", "XV años", "Sesión familiar"];

#[derive(Clone, Debug)]
pub struct SeededStudio {
    pub studio: studios::Model,
    pub stages: Vec<pipeline_stages::Model>,
    pub channels: Vec<acquisition_channels::Model>,
    pub social_networks: Vec<social_networks::Model>,
    pub event_types: Vec<event_types::Model>,
}

pub async fn seed_studio<C>(conn: &C, slug: &str, name: &str) -> ServiceResult<SeededStudio>
where
    C: ConnectionTrait,
{
    let studio = ensure_studio(conn, slug, name).await?;
    let stages = seed_default_stages(conn, studio.id).await?;

    let mut channels = Vec::with_capacity(DEFAULT_CHANNELS.len());
    for channel in DEFAULT_CHANNELS {
        let existing = acquisition_channels::Entity::find()
            .filter(acquisition_channels::Column::StudioId.eq(studio.id))
            .filter(acquisition_channels::Column::Name.eq(channel))
            .one(conn)
            .await?;
        let model = match existing {
            Some(model) => model,
            None => {
                acquisition_channels::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    studio_id: Set(studio.id),
                    name: Set(channel.to_string()),
                    is_active: Set(true),
                }
                .insert(conn)
                .await?
            }
        };
        channels.push(model);
    }

    let mut networks = Vec::with_capacity(DEFAULT_SOCIAL_NETWORKS.len());
    for (network_slug, network_name) in DEFAULT_SOCIAL_NETWORKS {
        let existing = social_networks::Entity::find()
            .filter(social_networks::Column::Slug.eq(network_slug))
            .one(conn)
            .await?;
        let model = match existing {
            Some(model) => model,
            None => {
                social_networks::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(network_name.to_string()),
                    slug: Set(network_slug.to_string()),
                }
                .insert(conn)
                .await?
            }
        };
        networks.push(model);
    }

    let mut types = Vec::with_capacity(DEFAULT_EVENT_TYPES.len());
    for event_type in DEFAULT_EVENT_TYPES {
        let existing = event_types::Entity::find()
            .filter(event_types::Column::StudioId.eq(studio.id))
            .filter(event_types::Column::Name.eq(event_type))
            .one(conn)
            .await?;
        let model = match existing {
            Some(model) => model,
            None => {
                event_types::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    studio_id: Set(studio.id),
                    name: Set(event_type.to_string()),
                }
                .insert(conn)
                .await?
            }
        };
        types.push(model);
    }

    info!(studio = %studio.slug, "studio catalogs seeded");
    Ok(SeededStudio {
        studio,
        stages,
        channels,
        social_networks: networks,
        event_types: types,
    })
}
