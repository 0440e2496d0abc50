//! Agent domain module
//!
//! Contains the decision type the reasoning capability returns to the
//! agent loop.

pub mod decision;

pub use decision::AgentDecision;
