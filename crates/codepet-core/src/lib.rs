//! codepet-core: Pure domain logic, no UI.
//!
//! Activity sampling, mood derivation, the action queue, daily stats, plugins
//! and voice replies for the CodePet desktop pet. Frontends drive the
//! controller's tick and subscribe to its `PetEvent`s via tokio::broadcast.

pub mod config;
pub mod controller;
pub mod events;
pub mod mood;
pub mod plugins;
pub mod prompts;
pub mod queue;
pub mod sampler;
pub mod stats;
pub mod types;
pub mod voice;
