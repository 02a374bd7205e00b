//! chainpoll-http: HTTP transport for ChainPoll, backed by `reqwest`.

pub mod client;

pub use client::{HttpClientConfig, HttpRpcClient};
