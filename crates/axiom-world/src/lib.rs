//! The Universe state store for the Axiom simulation kernel.
//!
//! This crate owns every mutable simulation entity: agents, grid chunks,
//! assets and their ownership, the relationship graph, the law set, and
//! the chat transcript. Entities live in ordered arenas keyed by integer
//! id and never hold references to one another.
//!
//! # Modules
//!
//! - [`entities`] -- Entity records stored in the arenas.
//! - [`environment`] -- Weather selection and regrowth rates.
//! - [`error`] -- [`WorldError`].
//! - [`genesis`] -- Deterministic construction of the tick-0 Universe.
//! - [`mutation`] -- The closed [`Mutation`] set and its [`Applied`] result.
//! - [`universe`] -- [`Universe`], its read accessors, the single
//!   [`Universe::apply`] write path, and the canonical state digest.

pub mod entities;
pub mod environment;
pub mod error;
pub mod genesis;
pub mod mutation;
pub mod universe;

pub use entities::{Agent, Asset, Chunk, Law, Utterance};
pub use environment::Weather;
pub use error::WorldError;
pub use genesis::{GenesisConfig, genesis};
pub use mutation::{Applied, Effect, Mutation};
pub use universe::Universe;
