//! The `eth_getLogs` filter object.

use serde::{Deserialize, Serialize};

use crate::address::normalize_address;
use crate::error::FilterError;
use crate::topic::{encode_as_topic, oracle_request_topic};
use crate::types::{Address, BlockNumberOrTag, Topic};

/// Filter object sent as the single `eth_getLogs` parameter.
///
/// Topic matching works position by position: an empty alternative list
/// matches anything in that position, a non-empty one matches any of its
/// entries.
///
/// ```text
/// []              any topic list
/// [[A]]           A in position 0
/// [[], [B]]       anything in position 0 AND B in position 1
/// [[A, B], [C]]   (A OR B) in position 0 AND C in position 1
/// ```
///
/// Field order matters: it is the serialized key order on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    /// Contracts whose logs match. Normalized and deduplicated.
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub topics: Vec<Vec<Topic>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockNumberOrTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockNumberOrTag>,
    /// Restricts the query to a single block. Never set by [`build_filter`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<Topic>,
}

impl LogFilter {
    /// Set both ends of the block range.
    pub fn with_block_range(
        mut self,
        from: BlockNumberOrTag,
        to: BlockNumberOrTag,
    ) -> Self {
        self.from_block = Some(from);
        self.to_block = Some(to);
        self
    }

    /// Move the start of the range, keeping the end.
    pub fn set_from_block(&mut self, from: BlockNumberOrTag) {
        self.from_block = Some(from);
    }

    /// Returns an error unless both `fromBlock` and `toBlock` are set.
    pub fn ensure_block_range(&self) -> Result<(), FilterError> {
        match (self.from_block, self.to_block) {
            (Some(_), Some(_)) => Ok(()),
            _ => Err(FilterError::MissingBlockRange),
        }
    }

    /// The encoded job id in topic position 1, if present.
    pub fn job_topic(&self) -> Option<Topic> {
        self.topics.get(1).and_then(|alts| alts.first()).copied()
    }
}

/// Build the address/topic shape of the filter for one job.
///
/// Topics are `[[OracleRequest signature], [encode_as_topic(job_id)]]`.
/// The block range is left unset; callers supply it with
/// [`LogFilter::with_block_range`].
pub fn build_filter<S: AsRef<str>>(
    job_id: &str,
    addresses: &[S],
) -> Result<LogFilter, FilterError> {
    let mut normalized = Vec::with_capacity(addresses.len());
    for raw in addresses {
        let addr = normalize_address(raw.as_ref())?;
        if !normalized.contains(&addr) {
            normalized.push(addr);
        }
    }

    Ok(LogFilter {
        addresses: normalized,
        topics: vec![vec![oracle_request_topic()], vec![encode_as_topic(job_id)]],
        ..Default::default()
    })
}
