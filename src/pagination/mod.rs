//! Pagination cursor walking: listing accumulation and neighbor lookup

mod listing;
mod neighbors;

pub use listing::PostListing;
pub use neighbors::{resolve_neighbors, NeighborLink, NeighborPair, NeighborState, NeighborTracker};
