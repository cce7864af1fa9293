//! Studio commercial pipeline: promises, pipeline stages, quotations and their
//! audit trail, plus the offer editor state.

pub mod business_terms;
pub mod cache;
pub mod error;
pub mod lifecycle;
pub mod logs;
pub mod mover;
pub mod offers;
pub mod promises;
pub mod quotations;
pub mod scope;
pub mod seed;
pub mod stages;

pub use cache::CacheBus;
pub use error::{ServiceError, ServiceResult, StageMoveError};
pub use scope::StudioScope;
