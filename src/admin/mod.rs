//! Cluster admin plane
//!
//! Every admin request walks the peer registry:
//! - Service commands (stop, restart) are broadcast best-effort
//! - Lock listings are gathered from all peers and checked against a read quorum
//! - Peers are reached through a [`CommandRunner`], local or over RPC

pub mod fanout;
pub mod locks;
pub mod peers;
pub mod quorum;
pub mod rpc_client;
pub mod rpc_server;
pub mod runner;
pub mod service;

pub use locks::list_peer_locks_info;
pub use peers::{make_admin_peers, AdminPeer, AdminPeers, PeerRegistry, RemotePeerConfig};
pub use runner::{CommandRunner, LocalAdminClient, RemoteAdminClient};
pub use service::{send_service_cmd, service_signal_channel, ServiceSignal, ServiceSignalSender};
