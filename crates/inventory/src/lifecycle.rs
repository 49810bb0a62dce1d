//! Per-item terminal-event guard.
//!
//! Extraction and expiry race on independent threads and under different
//! locks. Each stored entry carries one atomic word; both paths must win a
//! transition on it before they may announce anything, so exactly one
//! terminal notification is dispatched per entry.

use std::sync::atomic::{AtomicU8, Ordering};

const REMOVAL_CLAIMED: u8 = 0b01;
const EXPIRY_CLAIMED: u8 = 0b10;

/// Observable state of a stored entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ItemState {
    /// Stored, no terminal event yet.
    Live,
    /// Expiry notification dispatched; the entry stays stored until extracted.
    Expired,
    /// Handed to a caller; physical removal is pending or done.
    Removing,
}

/// Outcome of a successful removal claim.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum RemovalClaim {
    /// Extraction is the terminal event and must be announced.
    Announce,
    /// Expiry already won; remove without a second notification.
    Silent,
}

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Commit the entry to removal. `None` if a removal was already claimed.
    pub(crate) fn claim_removal(&self) -> Option<RemovalClaim> {
        let prior = self.state.fetch_or(REMOVAL_CLAIMED, Ordering::AcqRel);
        if prior & REMOVAL_CLAIMED != 0 {
            return None;
        }
        if prior & EXPIRY_CLAIMED != 0 {
            Some(RemovalClaim::Silent)
        } else {
            Some(RemovalClaim::Announce)
        }
    }

    /// Claim the expiry notification. Only succeeds from `Live`.
    pub(crate) fn claim_expiry(&self) -> bool {
        self.state
            .compare_exchange(0, EXPIRY_CLAIMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn state(&self) -> ItemState {
        let bits = self.state.load(Ordering::Acquire);
        if bits & REMOVAL_CLAIMED != 0 {
            ItemState::Removing
        } else if bits & EXPIRY_CLAIMED != 0 {
            ItemState::Expired
        } else {
            ItemState::Live
        }
    }
}
