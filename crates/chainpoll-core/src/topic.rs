//! Topic computation: event signature hashes and `bytes32` job ids.
//!
//! Chainlink oracle contracts emit
//! `OracleRequest(bytes32 indexed specId, address requester, ...)`, so
//! topics[0] is the keccak256 of the canonical signature and topics[1] is the
//! job spec id laid out as a Solidity `bytes32`: the raw string bytes,
//! left-anchored and zero-padded on the right.

use std::sync::OnceLock;

use tiny_keccak::{Hasher, Keccak};

use crate::types::Topic;

/// Byte length of one EVM word.
pub const EVM_WORD_BYTE_LEN: usize = 32;

/// Hex digit length of one EVM word.
pub const EVM_WORD_HEX_LEN: usize = EVM_WORD_BYTE_LEN * 2;

/// Canonical ABI signature of the Chainlink oracle request event
/// (2019-02-07 layout, `requestId` no longer cast to `uint256`).
pub const ORACLE_REQUEST_SIGNATURE: &str =
    "OracleRequest(bytes32,address,bytes32,uint256,address,bytes4,uint256,uint256,bytes)";

/// keccak256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// Compute the topic of an event from its canonical signature string.
pub fn event_signature_hash(signature: &str) -> Topic {
    Topic(keccak256(signature.as_bytes()))
}

/// topics[0] of every `OracleRequest` log. Hashed once per process.
pub fn oracle_request_topic() -> Topic {
    static TOPIC: OnceLock<Topic> = OnceLock::new();
    *TOPIC.get_or_init(|| event_signature_hash(ORACLE_REQUEST_SIGNATURE))
}

/// Encode a job identifier the way it appears as a `bytes32` log topic.
///
/// The bytes are right-padded with zeros to 32, hex-encoded, and the hex is
/// then cut to 64 digits. Identifiers longer than 32 bytes therefore keep
/// only their first 32 bytes. The empty string encodes to the zero word.
pub fn encode_as_topic(identifier: &str) -> Topic {
    let mut padded = identifier.as_bytes().to_vec();
    if padded.len() < EVM_WORD_BYTE_LEN {
        padded.resize(EVM_WORD_BYTE_LEN, 0);
    }

    let mut hx = hex::encode(&padded);
    if hx.len() > EVM_WORD_HEX_LEN {
        hx.truncate(EVM_WORD_HEX_LEN);
    }

    let mut word = [0u8; EVM_WORD_BYTE_LEN];
    let decoded = hex::decode_to_slice(&hx, &mut word);
    debug_assert!(decoded.is_ok(), "padded word is always {EVM_WORD_HEX_LEN} hex digits");
    Topic(word)
}
