// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error taxonomy and cooperative cancellation.
//!
//! The engine keeps three distinct result channels: malformed input is
//! rejected synchronously as [`TopologyError::InvalidPattern`], invariant
//! violations surface as [`TopologyError::Internal`] instead of silently
//! producing a wrong answer, and a detected self-intersection is *not* an
//! error at all but a typed [`crate::Simplicity::NonSimple`] value.

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Errors reported by the relate engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// The DE-9IM pattern string is malformed (wrong length or an illegal
    /// symbol). Reported before any graph work begins.
    #[error("invalid DE-9IM pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern string.
        pattern: String,
        /// What is wrong with it.
        reason: PatternErrorReason,
    },

    /// The query was cancelled through its [`CancelToken`]. The partially
    /// built graph has been discarded; no partial result is exposed.
    #[error("topology query cancelled")]
    Cancelled,

    /// An internal invariant was violated during construction or the sweep.
    /// This indicates a defect (or input that breaks the noding
    /// precondition), never a legitimate "no" answer.
    #[error("internal topology error: {0}")]
    Internal(&'static str),
}

/// Why a pattern string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternErrorReason {
    /// The pattern does not have exactly nine symbols.
    WrongLength(usize),
    /// A symbol outside `{T, F, 0, 1, 2, *}` at the given position.
    IllegalSymbol {
        /// Zero-based position of the offending symbol.
        position: usize,
        /// The symbol found there.
        symbol: char,
    },
}

impl std::fmt::Display for PatternErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternErrorReason::WrongLength(n) => {
                write!(f, "expected 9 symbols, got {}", n)
            }
            PatternErrorReason::IllegalSymbol { position, symbol } => {
                write!(f, "illegal symbol {:?} at position {}", symbol, position)
            }
        }
    }
}

/// Cooperative cancellation hook, polled at a fixed cadence (on the order of
/// every 256 sweep events). When it reports `true` the current build or
/// propagation unwinds with [`TopologyError::Cancelled`].
pub trait CancelToken {
    /// `true` once the caller wants the running query abandoned.
    fn is_cancelled(&self) -> bool;
}

impl CancelToken for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// A token that never cancels; used by the plain entry points.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Polls a cancel token every `CANCEL_CADENCE` ticks.
///
/// Kept as a tiny struct so the hot loops only pay a counter increment on
/// the common path.
pub(crate) struct CancelPoll<'a> {
    token: &'a dyn CancelToken,
    countdown: u32,
}

pub(crate) const CANCEL_CADENCE: u32 = 256;

impl<'a> CancelPoll<'a> {
    pub(crate) fn new(token: &'a dyn CancelToken) -> Self {
        CancelPoll {
            token,
            countdown: CANCEL_CADENCE,
        }
    }

    /// Call once per event; returns `Err(Cancelled)` when the token fired.
    pub(crate) fn tick(&mut self) -> Result<(), TopologyError> {
        self.countdown -= 1;
        if self.countdown == 0 {
            self.countdown = CANCEL_CADENCE;
            if self.token.is_cancelled() {
                return Err(TopologyError::Cancelled);
            }
        }
        Ok(())
    }
}
