//! Keeps a parent repository's submodule pointer in step with pushes to the
//! submodule repository.
//!
//! A push webhook for a monitored submodule branch starts a four-step chain
//! against the hosting API (read parent head, overlay the gitlink in a new
//! tree, commit it, fast-forward the parent branch). Every step is audited.

pub mod app;
pub mod audit;
pub mod config;
pub mod error;
pub mod github;
pub mod locks;
pub mod orchestrator;
pub mod registry;
pub mod router;
pub mod signature;
pub mod webhook;

#[cfg(test)]
mod testing;
