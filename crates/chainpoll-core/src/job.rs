//! Job descriptors and the immutable job registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::filter::{build_filter, LogFilter};
use crate::types::BlockNumberOrTag;

/// One watched job: which contracts to query, and over which block range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Off-chain job spec id, encoded into topics[1].
    pub id: String,
    /// Oracle contract addresses (`0x…` or `xdc…`).
    pub addresses: Vec<String>,
    pub from_block: BlockNumberOrTag,
    #[serde(default)]
    pub to_block: BlockNumberOrTag,
}

impl JobDescriptor {
    pub fn new(
        id: impl Into<String>,
        addresses: Vec<String>,
        from_block: BlockNumberOrTag,
        to_block: BlockNumberOrTag,
    ) -> Self {
        Self {
            id: id.into(),
            addresses,
            from_block,
            to_block,
        }
    }

    /// Build this job's filter, block range included.
    pub fn build_filter(&self) -> Result<LogFilter, RegistryError> {
        if self.id.is_empty() {
            return Err(RegistryError::EmptyJobId);
        }
        build_filter(&self.id, self.addresses.as_slice())
            .map(|f| f.with_block_range(self.from_block, self.to_block))
            .map_err(|source| RegistryError::Filter {
                job: self.id.clone(),
                source,
            })
    }

    /// The jobs watched when no configuration file is given.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::new(
                "6ba16cd62b8b4114b95449e35800cba0",
                vec!["0x291D46AE055Dd592B8CC7DdBF232cc206CEfa975".into()],
                BlockNumberOrTag::Number(0x35e8e0c),
                BlockNumberOrTag::Latest,
            ),
            Self::new(
                "e21f90744a6f4b44bc00086d30717777",
                vec!["0x58d4BbD5F75c87ECa079a31d3Bd6d50e737aC0f5".into()],
                BlockNumberOrTag::Number(0x35e8e0c),
                BlockNumberOrTag::Latest,
            ),
            Self::new(
                "09d1e90f9eaa48ad8042f9e255b21984",
                vec!["0xa778D1539b8fb94662Fae3D33b9d06D48E75021C".into()],
                BlockNumberOrTag::Number(0x35e96fc),
                BlockNumberOrTag::Latest,
            ),
        ]
    }
}

/// A registered job with its prebuilt filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub descriptor: JobDescriptor,
    pub filter: LogFilter,
}

impl Job {
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

/// Read-only set of jobs, built once at startup and shared behind an `Arc`.
///
/// Registration order is preserved for listing.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Vec<Job>,
    index: HashMap<String, usize>,
}

impl JobRegistry {
    /// Build every descriptor's filter. Any invalid job fails the whole build.
    pub fn build(
        descriptors: impl IntoIterator<Item = JobDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for descriptor in descriptors {
            if registry.index.contains_key(&descriptor.id) {
                return Err(RegistryError::DuplicateJob(descriptor.id));
            }
            let filter = descriptor.build_filter()?;
            tracing::debug!(
                job = %descriptor.id,
                topic = %filter.job_topic().unwrap_or_default(),
                addresses = filter.addresses.len(),
                "registered job"
            );
            registry
                .index
                .insert(descriptor.id.clone(), registry.jobs.len());
            registry.jobs.push(Job { descriptor, filter });
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.index.get(id).map(|&i| &self.jobs[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
