//! Database module: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: typed domain entities and view models returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! External modules should import from `cw_shops_bot::db`; the repository
//! API and commonly used models are re-exported for convenience.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{OfferHit, RefreshStats, Shop, UserProfile};
