// wallet-core/src/network/mod.rs
//
// - `models`: chain-agnostic data
// - `traits`: the `ChainClient` capability
// - `rpc`: JSON-RPC transport shared by both chain clients

pub mod models;
pub mod rpc;
pub mod traits;

pub use models::*;
pub use rpc::{HttpTransport, RpcError, RpcTransport};
pub use traits::*;
