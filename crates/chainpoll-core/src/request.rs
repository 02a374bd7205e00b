//! JSON-RPC 2.0 wire types and the request/response codec.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::TransportError;
use crate::filter::LogFilter;

/// The only method ChainPoll issues.
pub const METHOD_GET_LOGS: &str = "eth_getLogs";

/// A JSON-RPC 2.0 request.
///
/// Generic over the parameter type so typed params serialize with their own
/// field order instead of going through `serde_json::Value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest<P = Value> {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Vec<P>,
}

impl<P> JsonRpcRequest<P> {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(id: u64, method: impl Into<String>, params: Vec<P>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response.
///
/// `result` keeps an explicit `null` as `Some(Value::Null)` so "present but
/// null" can be told apart from "absent". `error: null` is treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    /// Echoed request id. Nodes may answer with a number, a string or null.
    #[serde(default)]
    pub id: Value,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Returns `true` if this is a successful response (has result, no error).
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }

    /// The `result` value, or the node's `error` as [`TransportError::Rpc`].
    pub fn into_result(self) -> Result<Value, TransportError> {
        match (self.result, self.error) {
            (_, Some(err)) => Err(TransportError::Rpc(err)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(TransportError::MalformedResponse(
                "response carries neither `result` nor `error`".into(),
            )),
        }
    }
}

/// Serialize `filter` as the single parameter of a `method` call.
pub fn encode_request(
    method: &str,
    filter: &LogFilter,
    id: u64,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&JsonRpcRequest::new(id, method, vec![filter]))
}

/// Parse a response body.
///
/// Fails with [`TransportError::MalformedResponse`] when the body is not a
/// JSON object or does not carry exactly one of `result` / `error`. The
/// shape of `result` is not inspected.
pub fn decode_response(body: &[u8]) -> Result<JsonRpcResponse, TransportError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
    if !value.is_object() {
        return Err(TransportError::MalformedResponse(
            "response body is not a JSON object".into(),
        ));
    }
    let resp: JsonRpcResponse = serde_json::from_value(value)
        .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

    match (&resp.result, &resp.error) {
        (Some(_), None) | (None, Some(_)) => Ok(resp),
        (None, None) => Err(TransportError::MalformedResponse(
            "response carries neither `result` nor `error`".into(),
        )),
        (Some(_), Some(_)) => Err(TransportError::MalformedResponse(
            "response carries both `result` and `error`".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::build_filter;
    use crate::types::BlockNumberOrTag;

    fn job_filter() -> LogFilter {
        build_filter(
            "6ba16cd62b8b4114b95449e35800cba0",
            &["0x291D46AE055Dd592B8CC7DdBF232cc206CEfa975"],
        )
        .unwrap()
        .with_block_range(BlockNumberOrTag::Number(0x35e8e0c), BlockNumberOrTag::Latest)
    }

    #[test]
    fn encoded_request_shape() {
        let bytes = encode_request(METHOD_GET_LOGS, &job_filter(), 1).unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], 1);
        assert_eq!(v["method"], "eth_getLogs");
        assert_eq!(v["params"].as_array().unwrap().len(), 1);
        assert_eq!(v["params"][0]["topics"].as_array().unwrap().len(), 2);
        assert_eq!(v["params"][0]["toBlock"], "latest");
    }

    #[test]
    fn encoded_request_key_order() {
        let bytes = encode_request(METHOD_GET_LOGS, &job_filter(), 1).unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.starts_with(
            r#"{"jsonrpc":"2.0","id":1,"method":"eth_getLogs","params":[{"address":["0x291d46ae055dd592b8cc7ddbf232cc206cefa975"],"topics":[["#
        ));
        assert!(s.ends_with(r#"]],"fromBlock":"0x35e8e0c","toBlock":"latest"}]}"#));
    }

    #[test]
    fn any_method_accepted() {
        let bytes = encode_request("eth_newFilter", &job_filter(), 7).unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["method"], "eth_newFilter");
        assert_eq!(v["id"], 7);
    }

    #[test]
    fn decode_success() {
        let resp = decode_response(br#"{"jsonrpc":"2.0","id":1,"result":[]}"#).unwrap();
        assert!(resp.is_ok());
        assert_eq!(resp.id, 1);
        assert_eq!(resp.into_result().unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn decode_null_result_is_present() {
        let resp = decode_response(br#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert_eq!(resp.result, Some(Value::Null));
    }

    #[test]
    fn decode_accepts_string_and_missing_ids() {
        let resp = decode_response(br#"{"jsonrpc":"2.0","id":"abc","result":[]}"#).unwrap();
        assert_eq!(resp.id, "abc");
        let resp = decode_response(br#"{"result":[]}"#).unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.jsonrpc, "");
    }

    #[test]
    fn decode_error_member() {
        let resp = decode_response(
            br#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"filter not found"}}"#,
        )
        .unwrap();
        assert!(!resp.is_ok());
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.rpc_code(), Some(-32000));
    }

    #[test]
    fn decode_rejects_bad_payloads() {
        let bodies: [&[u8]; 8] = [
            b"not json",
            b"",
            b"[1,2,3]",
            br#"["2.0",1,[]]"#,
            br#"["2.0",1,null,{"code":1}]"#,
            br#""result""#,
            br#"{"jsonrpc":"2.0","id":1}"#,
            br#"{"jsonrpc":"2.0","id":1,"result":[],"error":{"code":1}}"#,
        ];
        for body in bodies {
            let err = decode_response(body).unwrap_err();
            assert!(
                matches!(err, TransportError::MalformedResponse(_)),
                "{:?} -> {err}",
                String::from_utf8_lossy(body)
            );
        }
    }
}
