//! Storage node for the UPI registry.
//!
//! A [`Node`] owns a content-addressed payload store and an append-only
//! record log, both obtained from a [`Backend`] during a single, shared
//! initialization. Operations are only valid while the node is `Ready`:
//!
//! ```text
//! Uninitialized ──initialize──▶ Initializing ──ok──▶ Ready ──disconnect──▶ Disconnected
//!                                    │                 ▲
//!                                    └──err/timeout──▶ Failed ──initialize──┘
//! ```

pub mod backend;
pub mod config;
pub mod error;
mod lifecycle;
pub mod node;

pub use backend::{backend_for, Backend, LocalBackend, MemoryBackend, Session};
pub use config::{NodeConfig, NodeConfigBuilder};
pub use error::{InitError, NodeError, NodeResult, NodeState};
pub use node::Node;
