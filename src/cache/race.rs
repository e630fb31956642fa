//! Success race over concurrently running lookups.
//!
//! Resolves with the first branch that succeeds. When every branch fails the
//! error of the branch that failed last is returned. Branches still running
//! when the race is decided are handed back so the caller can drain them.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::debug;

use super::error::CacheError;

/// Which lookup produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Origin,
    Remote,
}

impl Branch {
    pub fn as_str(self) -> &'static str {
        match self {
            Branch::Origin => "origin",
            Branch::Remote => "remote",
        }
    }
}

pub type BranchFuture<T, E> = BoxFuture<'static, (Branch, Result<T, E>)>;

/// Outcome of a race that produced a value.
pub struct RaceWin<T, E> {
    pub branch: Branch,
    pub value: T,
    /// Branches that had not settled when the winner arrived.
    pub pending: FuturesUnordered<BranchFuture<T, E>>,
}

pub async fn success_race<T, E>(branches: Vec<BranchFuture<T, E>>) -> Result<RaceWin<T, E>, E>
where
    E: From<CacheError>,
{
    let mut pending: FuturesUnordered<_> = branches.into_iter().collect();
    let mut last_error = None;

    while let Some((branch, result)) = pending.next().await {
        match result {
            Ok(value) => {
                return Ok(RaceWin {
                    branch,
                    value,
                    pending,
                });
            }
            Err(err) => {
                debug!(branch = branch.as_str(), "race branch failed");
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| CacheError::NoBranches.into()))
}
