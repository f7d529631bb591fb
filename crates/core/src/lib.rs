//! `demandlens-core` — data model shared by every pipeline stage.
//!
//! This crate contains **pure** types (no IO, no numerics beyond bucketing).

pub mod error;
pub mod group;
pub mod id;
pub mod sale;
pub mod series;

pub use error::{DomainError, DomainResult};
pub use group::GroupKey;
pub use id::RunId;
pub use sale::RawSaleEvent;
pub use series::{AlignedSeries, Frequency};
