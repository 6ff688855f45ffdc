//! Deterministic fixture generator for the Arklowdun household database.
//!
//! A seeded [`prng::Mulberry32`] stream drives every content decision, so a
//! given seed and set of counts always yields the same database, attachment
//! tree and summary.

pub mod attachments;
pub mod categories;
pub mod columns;
pub mod db;
pub mod error;
pub mod events;
pub mod exdate;
pub mod household;
pub mod lifecycle;
pub mod logging;
pub mod migrate;
pub mod notes;
pub mod prng;
pub mod rrule;
pub mod seed;
pub mod summary;
pub mod supporting;
pub mod time;
pub mod validate;

pub use error::{AppError, AppResult};
pub use seed::{run, SeedOptions};
pub use summary::SeedSummary;
