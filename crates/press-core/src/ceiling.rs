//! Coarse resource limits checked between documents

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const PROC_STATUS: &str = "/proc/self/status";

/// Limits that stop a run when breached.
///
/// Both limits are optional. Memory is measured as the resident set size of
/// the current process where the platform exposes it; elsewhere only the
/// document limit applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceCeiling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rss_bytes: Option<u64>,
    /// Documents processed (not counting skipped ones) before the run stops
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_documents: Option<usize>,
}

impl ResourceCeiling {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_rss_bytes.is_none() && self.max_documents.is_none()
    }

    /// Check the limits before processing another document.
    pub fn check(&self, processed: usize) -> Result<()> {
        let rss = match self.max_rss_bytes {
            Some(_) => resident_memory_bytes(),
            None => None,
        };
        self.check_with(processed, rss)
    }

    /// Check the limits against an explicit memory reading.
    pub fn check_with(&self, processed: usize, rss_bytes: Option<u64>) -> Result<()> {
        if let Some(max) = self.max_documents
            && processed >= max
        {
            return Err(Error::ResourceCeiling {
                message: format!("processed {processed} documents, limit is {max}"),
            });
        }
        if let (Some(max), Some(rss)) = (self.max_rss_bytes, rss_bytes)
            && rss > max
        {
            return Err(Error::ResourceCeiling {
                message: format!("resident memory {rss} bytes exceeds limit of {max} bytes"),
            });
        }
        Ok(())
    }
}

/// Resident set size of this process, if the platform reports it.
pub fn resident_memory_bytes() -> Option<u64> {
    std::fs::read_to_string(PROC_STATUS)
        .ok()
        .and_then(|status| parse_vm_rss(&status))
}

/// Extract `VmRSS` (reported in kB) from `/proc/<pid>/status` text.
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let mut fields = line["VmRSS:".len()..].split_whitespace();
    let value: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => value.checked_mul(1024),
        Some(_) => None,
    }
}
