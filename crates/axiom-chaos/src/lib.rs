//! The chaos tree: every random number in the simulation comes from here.
//!
//! A single 64-bit world seed is stretched into a global key. Each
//! subsystem derives its own key from the global key and its name, and each
//! entity stream derives its key from its subsystem key and the entity id.
//! Streams are `ChaCha20` instances positioned by a per-stream draw counter,
//! so the full RNG state is just "how many draws each stream has made".
//!
//! No stream shares a counter with any other. Drawing from one subsystem
//! never shifts the values another subsystem sees.
//!
//! # Modules
//!
//! - [`subsystem`] -- The fixed set of subsystem identifiers and stream keys
//! - [`tree`] -- [`ChaosTree`], [`Stream`], and the serializable [`RngState`]
//! - [`audit`] -- The append-only [`DrawAudit`] trail
//! - [`error`] -- [`RngMisuseError`]

pub mod audit;
pub mod error;
pub mod subsystem;
pub mod tree;

pub use audit::{DrawAudit, DrawRecord};
pub use error::RngMisuseError;
pub use subsystem::{StreamKey, SubsystemId};
pub use tree::{ChaosTree, RngState, Stream, StreamPosition};
