//! sea-orm models for the studio suite tables.

pub mod acquisition_channels;
pub mod agenda_entries;
pub mod business_terms;
pub mod contacts;
pub mod event_types;
pub mod events;
pub mod offers;
pub mod pipeline_stages;
pub mod promise_logs;
pub mod promise_status_history;
pub mod promises;
pub mod quotations;
pub mod social_networks;
pub mod studio_users;
pub mod studios;
