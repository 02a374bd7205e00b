//! chainpoll-core: filter construction and wire types for ChainPoll.
//!
//! # Overview
//!
//! ChainPoll watches an EVM node for Chainlink `OracleRequest` logs tagged
//! with a given off-chain job id. The core crate defines:
//!
//! - [`encode_as_topic`]: job id → `bytes32` topic word
//! - [`build_filter`] / [`LogFilter`]: the `eth_getLogs` filter object
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: envelope types and codec
//! - [`RpcTransport`]: the async trait every outbound transport implements
//! - [`JobRegistry`]: the immutable set of watched jobs
//!
//! ```text
//! JobDescriptor ──build_filter──▶ LogFilter ──encode_request──▶ POST body
//!                   │                                             │
//!             encode_as_topic                               RpcTransport
//!                                                                 │
//!                         JsonRpcResponse ◀──decode_response── raw body
//! ```

pub mod address;
pub mod error;
pub mod filter;
pub mod job;
pub mod request;
pub mod topic;
pub mod transport;
pub mod types;

pub use address::normalize_address;
pub use error::{FailureKind, FilterError, ParseError, RegistryError, TransportError};
pub use filter::{build_filter, LogFilter};
pub use job::{Job, JobDescriptor, JobRegistry};
pub use request::{decode_response, encode_request, JsonRpcRequest, JsonRpcResponse};
pub use topic::{encode_as_topic, oracle_request_topic};
pub use transport::RpcTransport;
pub use types::{Address, BlockNumberOrTag, Topic};
