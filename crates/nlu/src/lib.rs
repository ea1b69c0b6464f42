//! NLU entity/value synchronisation with external providers, and prediction
//! scoring against the locally known entity set.
//!
//! Local records are authoritative: provider calls are best-effort, made once
//! per event, and their failures are logged rather than propagated.

pub mod error;
pub mod http;
pub mod model;
pub mod provider;
pub mod score;
pub mod store;
pub mod sync;

pub use {
    error::{Error, Result},
    http::HttpNluProvider,
    model::{NluEntity, NluValue, ParsedEntity, PopulatedValue, ScoredEntity},
    provider::{NluProvider, NluProviderRegistry},
    score::compute_prediction_score,
    store::{InMemoryNluStore, NluStore},
    sync::{NluEvent, NluSync},
};
