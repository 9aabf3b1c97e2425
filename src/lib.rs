//! # minikv-admin
//!
//! Cluster-wide admin control plane for minikv nodes:
//! - Stop/restart broadcast to every node, tolerant of unreachable peers
//! - Lock introspection of the local namespace lock table
//! - Cluster lock listing reduced through a read quorum
//! - Authenticated node-to-node admin RPC
//!
//! ## Architecture
//!
//! ```text
//!              admin request
//!                    │
//!          ┌─────────▼──────────┐
//!          │   Peer registry    │  local node first, one entry per host
//!          └─────────┬──────────┘
//!      ┌─────────────┼──────────────┐
//!      │ RPC         │ RPC          │ in-process
//! ┌────▼─────┐  ┌────▼─────┐  ┌─────▼──────┐
//! │ Node 2   │  │ Node 3   │  │ Node 1     │  remote peers run concurrently,
//! │ (remote) │  │ (remote) │  │ (local)    │  then the local node
//! └──────────┘  └──────────┘  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start a node
//! ```bash
//! minikv-admind serve \
//!   --id node-1 \
//!   --address 10.0.0.1:9000 \
//!   --bind 0.0.0.0:9000 \
//!   --endpoints http://10.0.0.1:9000/d1,http://10.0.0.2:9000/d1,http://10.0.0.3:9000/d1 \
//!   --access-key admin --secret-key supersecret
//! ```
//!
//! ### Talk to a node
//! ```bash
//! minikv-admin --node 10.0.0.2:9000 locks --bucket photos --older-than 5m
//! minikv-admin --node 10.0.0.2:9000 restart
//! ```

pub mod admin;
pub mod common;
pub mod lock;
pub mod server;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use server::AdminNode;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
