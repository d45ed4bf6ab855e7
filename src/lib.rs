//! # beymeta
//!
//! Recency-weighted meta analytics over Beyblade X tournament placements.
//!
//! ## Architecture
//!
//! - **models**: Placement rows, tiers, trends, eras and other closed enums
//! - **normalize**: Alias tables and canonical keys for blades and parts
//! - **calculate**: Scoring primitives (decay, points, trend, tiers)
//! - **analysis**: Aggregation, rankings and the meta reports
//! - **storage**: Row sources (in-memory, JSONL)
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod analysis;
pub mod api;
pub mod calculate;
pub mod config;
pub mod models;
pub mod normalize;
pub mod storage;

pub use models::*;
