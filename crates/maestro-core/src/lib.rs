//! Core types and error definitions for Maestro.
//!
//! This crate provides the vocabulary shared by every Maestro crate: the
//! [`Agent`] trait that concrete agents implement, the descriptor and config
//! records the registry stores, the per-request [`QueryContext`], and the
//! unified error type.
//!
//! # Main types
//!
//! - [`Agent`] — Opaque processing unit with a static capability set.
//! - [`AgentConstructor`] — Factory invoked once to materialize an agent.
//! - [`AgentDescriptor`] — Immutable registration record for an agent type.
//! - [`AgentConfig`] — Configuration handed to the constructor.
//! - [`QueryContext`] — Per-request routing context.
//! - [`MaestroError`] — Unified error enum; [`MaestroResult`] is its alias.

/// Agent trait, constructors, and descriptors.
pub mod agent;
/// Agent configuration payload.
pub mod config;
/// Per-request query context.
pub mod context;
/// Error types.
pub mod error;

pub use agent::{Agent, AgentConstructor, AgentDescriptor, Capability, FnConstructor};
pub use config::AgentConfig;
pub use context::QueryContext;
pub use error::{ErrorKind, MaestroError, MaestroResult};
