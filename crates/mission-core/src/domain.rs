//! Per-user serialization domain
//!
//! Every read-modify-write of a user's session runs while holding that
//! user's [`DomainGuard`]. The guard also owns the user's transient state,
//! which therefore can only be touched in the same critical section as the
//! record it refers to.

use mission_store::KeyedLocks;
use mission_types::{MissionId, UserId};
use tokio::sync::OwnedMutexGuard;

/// A pending "replace item N" request.
///
/// One-shot: taken by the next attachment event from the user, whether or
/// not the replacement succeeds, and cleared whenever a mission starts or
/// ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementIntent {
    /// Mission the intent was armed for
    pub mission_id: MissionId,
    /// 1-based slot to overwrite
    pub target: usize,
}

/// Transient per-user state
#[derive(Debug, Default)]
pub struct DomainState {
    replacement: Option<ReplacementIntent>,
}

impl DomainState {
    /// Arm a replacement, discarding any earlier one
    pub fn set_replacement(&mut self, intent: ReplacementIntent) {
        self.replacement = Some(intent);
    }

    /// Consume the pending replacement
    pub fn take_replacement(&mut self) -> Option<ReplacementIntent> {
        self.replacement.take()
    }

    /// Armed intent, without consuming it
    #[must_use]
    pub fn replacement(&self) -> Option<ReplacementIntent> {
        self.replacement
    }

    /// Drop all transient state
    pub fn clear(&mut self) {
        self.replacement = None;
    }
}

/// Exclusive access to one user's domain
pub type DomainGuard = OwnedMutexGuard<DomainState>;

/// All users' domains
#[derive(Debug, Default)]
pub struct Domains {
    locks: KeyedLocks<DomainState>,
}

impl Domains {
    /// No user has entered yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the user's domain, waiting for any other event of theirs
    pub async fn enter(&self, user: &UserId) -> DomainGuard {
        self.locks.lock(user).await
    }
}
