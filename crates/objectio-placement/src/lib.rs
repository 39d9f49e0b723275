//! Consistent-hash placement ring over the cluster topology (C8).

pub mod manager;
pub mod ring;

pub use manager::PlacementManager;
pub use ring::{PlacementResult, PlacementRing};
