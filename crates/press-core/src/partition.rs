//! Splitting the document-id space across independent workers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// The share of documents one worker owns.
///
/// A document belongs to worker `sha256(id) mod count`, so workers started
/// with the same `count` own disjoint sets that together cover every id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Partition {
    pub index: u32,
    pub count: u32,
}

impl Default for Partition {
    fn default() -> Self {
        Self { index: 0, count: 1 }
    }
}

impl Partition {
    pub fn new(index: u32, count: u32) -> Result<Self> {
        let partition = Self { index, count };
        partition.validate()?;
        Ok(partition)
    }

    pub fn validate(&self) -> Result<()> {
        if self.count == 0 || self.index >= self.count {
            return Err(Error::InvalidPartition {
                index: self.index,
                count: self.count,
            });
        }
        Ok(())
    }

    /// Worker index that owns `id` among `count` workers.
    pub fn bucket(id: &str, count: u32) -> u32 {
        let digest = Sha256::digest(id.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(prefix) % u64::from(count.max(1))) as u32
    }

    pub fn owns(&self, id: &str) -> bool {
        self.count <= 1 || Self::bucket(id, self.count) == self.index
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.count)
    }
}

/// Parses `index/count`, e.g. `2/8`.
impl FromStr for Partition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_config(format!("partition must look like 'i/n', got '{s}'"));
        let (index, count) = s.split_once('/').ok_or_else(invalid)?;
        let index = index.trim().parse().map_err(|_| invalid())?;
        let count = count.trim().parse().map_err(|_| invalid())?;
        Self::new(index, count)
    }
}
