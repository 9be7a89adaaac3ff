//! The per-tick hash chain.

use axiom_types::{Digest, HashCheckpoint, SimTime};
use tracing::{debug, error};

use crate::LogError;

/// Ordered, contiguous checkpoints.
///
/// A chain either starts at genesis (tick 0, predecessor = zero digest) or
/// is resumed from a trusted tip, typically the checkpoint stored alongside
/// a snapshot. Links after the tip are verified; the tip itself is taken on
/// trust.
#[derive(Debug, Clone, Default)]
pub struct CheckpointChain {
    /// Checkpoints in tick order.
    checkpoints: Vec<HashCheckpoint>,
    /// Number of leading checkpoints accepted without recomputation.
    trusted: usize,
    /// Number of leading checkpoints already checked by
    /// [`CheckpointChain::verify_new_links`]. Never below `trusted`.
    verified: usize,
}

impl CheckpointChain {
    /// An empty chain awaiting the genesis checkpoint.
    pub const fn new() -> Self {
        Self {
            checkpoints: Vec::new(),
            trusted: 0,
            verified: 0,
        }
    }

    /// A chain continuing from `tip`.
    pub fn resume(tip: HashCheckpoint) -> Self {
        Self {
            checkpoints: vec![tip],
            trusted: 1,
            verified: 1,
        }
    }

    /// Load previously stored checkpoints as-is. Call
    /// [`CheckpointChain::verify_chain`] before relying on them.
    pub const fn from_checkpoints(checkpoints: Vec<HashCheckpoint>) -> Self {
        Self {
            checkpoints,
            trusted: 0,
            verified: 0,
        }
    }

    /// Seal `tick` with `state_digest` and return the new checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::NonContiguousTick`] unless `tick` directly
    /// follows the latest checkpoint (or is 0 on an empty chain).
    pub fn append(&mut self, tick: SimTime, state_digest: Digest) -> Result<HashCheckpoint, LogError> {
        let (expected, prev) = match self.checkpoints.last() {
            Some(last) => (
                last.tick.next().ok_or(LogError::NonContiguousTick {
                    expected: last.tick,
                    got: tick,
                })?,
                last.chain_digest,
            ),
            None => (SimTime::GENESIS, Digest::ZERO),
        };
        if tick != expected {
            return Err(LogError::NonContiguousTick { expected, got: tick });
        }
        let checkpoint = HashCheckpoint::next(&prev, tick, state_digest);
        self.checkpoints.push(checkpoint);
        Ok(checkpoint)
    }

    /// Recompute every untrusted link.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::HashMismatch`] for the first checkpoint whose
    /// stored chain digest disagrees with its recomputation, or
    /// [`LogError::NonContiguousTick`] if ticks skip or repeat.
    pub fn verify_chain(&self) -> Result<(), LogError> {
        self.check_from(0)?;
        debug!(checkpoints = self.checkpoints.len(), "hash chain verified");
        Ok(())
    }

    /// Recompute only the links appended since the previous call and
    /// advance the verified prefix. Returns how many links were checked.
    ///
    /// # Errors
    ///
    /// As [`CheckpointChain::verify_chain`]. The verified prefix does not
    /// move on failure.
    pub fn verify_new_links(&mut self) -> Result<usize, LogError> {
        let start = self.verified.max(self.trusted);
        self.check_from(start)?;
        let checked = self.checkpoints.len().saturating_sub(start);
        self.verified = self.checkpoints.len();
        debug!(checked, verified = self.verified, "new hash chain links verified");
        Ok(checked)
    }

    /// Length of the prefix already checked by
    /// [`CheckpointChain::verify_new_links`].
    pub const fn verified_len(&self) -> usize {
        self.verified
    }

    fn check_from(&self, start: usize) -> Result<(), LogError> {
        let mut prev: Option<&HashCheckpoint> = start
            .checked_sub(1)
            .and_then(|index| self.checkpoints.get(index));
        for (index, checkpoint) in self.checkpoints.iter().enumerate().skip(start) {
            if let Some(p) = prev {
                let expected = p.tick.next().unwrap_or(p.tick);
                if checkpoint.tick != expected {
                    return Err(LogError::NonContiguousTick {
                        expected,
                        got: checkpoint.tick,
                    });
                }
            }
            if index >= self.trusted {
                let prev_digest = prev.map_or(Digest::ZERO, |p| p.chain_digest);
                let computed =
                    HashCheckpoint::link(&prev_digest, checkpoint.tick, &checkpoint.state_digest);
                if computed != checkpoint.chain_digest {
                    error!(
                        tick = checkpoint.tick.get(),
                        stored = %checkpoint.chain_digest,
                        computed = %computed,
                        "hash chain mismatch"
                    );
                    return Err(LogError::HashMismatch {
                        tick: checkpoint.tick,
                        stored: checkpoint.chain_digest,
                        computed,
                    });
                }
            }
            prev = Some(checkpoint);
        }
        Ok(())
    }

    /// Most recent checkpoint.
    pub fn latest(&self) -> Option<&HashCheckpoint> {
        self.checkpoints.last()
    }

    /// Checkpoint for `tick`, if held.
    pub fn get(&self, tick: SimTime) -> Option<&HashCheckpoint> {
        let first = self.checkpoints.first()?.tick;
        let offset = usize::try_from(tick.get().checked_sub(first.get())?).ok()?;
        self.checkpoints.get(offset)
    }

    /// Checkpoints with `from <= tick <= to`.
    pub fn range(&self, from: SimTime, to: SimTime) -> impl Iterator<Item = &HashCheckpoint> {
        self.checkpoints
            .iter()
            .skip_while(move |c| c.tick < from)
            .take_while(move |c| c.tick <= to)
    }

    /// Every checkpoint in tick order.
    pub fn iter(&self) -> impl Iterator<Item = &HashCheckpoint> {
        self.checkpoints.iter()
    }

    /// Number of checkpoints held.
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Whether no checkpoint has been appended.
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}
