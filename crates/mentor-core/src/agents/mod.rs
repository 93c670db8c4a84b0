//! Agent roster: agent profiles and the registry that holds them
//!
//! Every session is served by exactly one registered agent at a time.
//! Profiles carry the instructions and capability set handed to the model,
//! plus the trigger phrases the intent classifier routes on.

pub mod profile;
pub mod registry;

pub use profile::AgentProfile;
pub use registry::AgentRegistry;
