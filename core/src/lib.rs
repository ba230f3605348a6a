//! SalesDesk analytics core.
//!
//! Everything the dashboard can ask for lives here: the permissive
//! loader (`raw`), the cleaning pipeline (`clean`), the canonical
//! in-memory store (`store`), and the read-side aggregations
//! (`summary`, `drivers`, `series`, `stages`, `reps`, `segments`,
//! `risk`, `recommend`) behind the endpoint surface in `api`.
//!
//! A dataset is immutable once `DeskStore::build` returns; every
//! query is a pure function of the store, the config and the query
//! parameters, so any answer can be reproduced from the raw files.

pub mod api;
pub mod clean;
pub mod config;
pub mod drivers;
pub mod error;
pub mod query;
pub mod raw;
pub mod recommend;
pub mod reps;
pub mod risk;
pub mod rng;
pub mod segments;
pub mod series;
pub mod stages;
pub mod stats;
pub mod store;
pub mod summary;
pub mod synth;
pub mod types;
