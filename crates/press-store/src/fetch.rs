//! Asset fetching for rules that pull referenced media.

use std::cell::Cell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Retrieves the bytes behind an asset URL.
pub trait AssetFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

impl<F: AssetFetcher + ?Sized> AssetFetcher for &F {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

impl<F: AssetFetcher + ?Sized> AssetFetcher for Box<F> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

/// Serves assets from a local mirror laid out as `<root>/<host>/<path>`.
///
/// `https://cdn.example.org/uploads/a.jpg` resolves to
/// `<root>/cdn.example.org/uploads/a.jpg`. Query strings and fragments are
/// ignored.
#[derive(Debug, Clone)]
pub struct LocalMirrorFetcher {
    root: PathBuf,
}

impl LocalMirrorFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a URL to its file in the mirror.
    pub fn resolve(&self, url: &str) -> Result<PathBuf> {
        let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        let without_query = without_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let (host, path) = without_query
            .split_once('/')
            .ok_or_else(|| Error::fetch(url, "URL has no path"))?;

        let relative = Path::new(host).join(path);
        if host.is_empty()
            || path.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::fetch(url, "URL does not map into the mirror"));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetFetcher for LocalMirrorFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.resolve(url)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::fetch(url, "not present in mirror"))
            }
            Err(e) => Err(Error::io(&path, e)),
        }
    }
}

/// Exponential backoff settings for fetches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    /// Give up once this much time has passed since the first attempt
    pub max_elapsed_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: 200,
            max_interval_ms: 5_000,
            max_elapsed_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> backoff::ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_interval_ms))
            .with_max_interval(Duration::from_millis(self.max_interval_ms))
            .with_multiplier(self.multiplier)
            .with_max_elapsed_time(Some(Duration::from_millis(self.max_elapsed_ms)))
            .build()
    }
}

/// Wraps a fetcher, retrying transient failures with exponential backoff.
///
/// Permanent failures (see [`Error::is_transient`]) are returned at once.
#[derive(Debug, Clone)]
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: AssetFetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: AssetFetcher> AssetFetcher for RetryingFetcher<F> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let attempts = Cell::new(0u32);
        let operation = || {
            attempts.set(attempts.get() + 1);
            self.inner.fetch(url).map_err(|e| {
                if e.is_transient() {
                    tracing::debug!(url, attempt = attempts.get(), error = %e, "retrying fetch");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        };

        backoff::retry(self.policy.backoff(), operation).map_err(|e| match e {
            backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => {
                tracing::warn!(url, attempts = attempts.get(), error = %err, "fetch failed");
                err
            }
        })
    }
}
