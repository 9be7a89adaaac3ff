//! Shared type definitions for the Axiom simulation kernel.
//!
//! This crate is the single source of truth for the value types that cross
//! crate boundaries: identifiers, simulation time, the input and observation
//! event envelopes, rejection reasons, and the digest types used by the
//! hash chain. Nothing here owns mutable simulation state.
//!
//! # Modules
//!
//! - [`ids`] -- Integer identifier newtypes for every entity kind
//! - [`time`] -- [`SimTime`], the monotonic tick index
//! - [`enums`] -- Action kinds, pipeline stages, and rejection reasons
//! - [`events`] -- [`InputEvent`] and its total-order [`EventKey`]
//! - [`observation`] -- [`ObservationEvent`] emitted by the pipeline
//! - [`digest`] -- [`Digest`] and [`HashCheckpoint`]

pub mod digest;
pub mod enums;
pub mod events;
pub mod ids;
pub mod observation;
pub mod time;

// Re-export all public types at crate root for convenience.
pub use digest::{Digest, DigestParseError, HashCheckpoint};
pub use enums::{ActionKind, PipelineStage, RejectionReason};
pub use events::{EventKey, InputEvent, SourceId};
pub use ids::{AgentId, AssetId, ChunkId, EntityId, LawId};
pub use observation::{ObservationEvent, ObservationType};
pub use time::SimTime;
