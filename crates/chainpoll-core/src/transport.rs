//! The `RpcTransport` trait: the seam between the poll loop and the network.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::filter::LogFilter;
use crate::request::{decode_response, encode_request, JsonRpcResponse};

/// Outbound JSON-RPC transport.
///
/// Implementors only move bytes: [`post`](Self::post) takes a serialized
/// request body and returns the raw response body. Encoding and decoding live
/// in the provided [`call`](Self::call) so every transport gets the same
/// envelope handling, and a test double can return arbitrary bytes.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to be shared as
/// `Arc<dyn RpcTransport>` across polling tasks.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// POST a JSON body and return the response body.
    ///
    /// Implementations map connection problems to [`TransportError::Http`],
    /// statuses outside 200–399 to [`TransportError::Status`] and deadline
    /// expiry to [`TransportError::Timeout`].
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError>;

    /// Return the transport's identifier (URL or name).
    fn url(&self) -> &str;

    /// Encode a `method(filter)` call, send it, and decode the envelope.
    async fn call(
        &self,
        method: &str,
        filter: &LogFilter,
        id: u64,
    ) -> Result<JsonRpcResponse, TransportError> {
        let body = encode_request(method, filter, id)?;
        tracing::trace!(url = %self.url(), method, bytes = body.len(), "sending request");
        let raw = self.post(body).await?;
        decode_response(&raw)
    }
}
