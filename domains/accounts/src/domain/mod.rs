//! Accounts domain layer: entities, quota engine, tier cache, subscription
//! reconciler, and challenge service.

pub mod challenge;
pub mod entities;
pub mod quota;
pub mod subscriptions;
pub mod tier_cache;
