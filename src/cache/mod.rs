//! Tag-invalidated query cache and mutation layer.
//!
//! This module is independent of the concrete backend. It provides:
//! - Cache entries keyed by endpoint name + canonicalized arguments
//! - Request coalescing: one in-flight fetch per entry, fanned out to every subscriber
//! - Stale-while-revalidate: the newest successful result stays visible through refetches and failures
//! - Tag-based invalidation driven by mutations
//! - Retention of unused entries for a grace period before eviction

mod endpoint;
mod key;
mod mutation;
mod state;
mod store;
mod tags;

pub use endpoint::{MutationEndpoint, QueryEndpoint};
#[cfg(test)]
pub use key::CacheKey;
pub use state::QuerySnapshot;
pub use store::{CacheSettings, QueryStore, SubscribeOptions};
pub use tags::{Tag, TagKind};
