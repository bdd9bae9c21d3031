//! Caller-owned resolution state.
//!
//! A session tracks the state machine of the current attempt and the last
//! successful resolution. Attempts are stamped with a generation number;
//! bumping the generation (from any thread, via [`SupersedeHandle`]) makes the
//! in-flight attempt stale, and it stops at its next state transition without
//! touching the session.

use super::types::{Resolution, ResolutionFailure, ResolveError, ResolvedLocation};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ResolutionState {
    Idle,
    Locating,
    Resolving,
    Failed(ResolutionFailure),
    Done,
}

impl ResolutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Done)
    }

    /// Edges of `Idle → Locating → (Resolving | Failed) → Done`.
    /// Any state may restart at `Locating` when a new attempt begins.
    pub fn can_transition_to(&self, next: &ResolutionState) -> bool {
        use ResolutionState::*;
        matches!(
            (self, next),
            (_, Locating) | (Locating, Resolving) | (Locating, Failed(_)) | (Resolving, Failed(_)) | (Resolving, Done)
        )
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Locating => write!(f, "locating"),
            Self::Resolving => write!(f, "resolving"),
            Self::Failed(reason) => write!(f, "failed ({})", reason),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Identifies one attempt. Stale once the session's generation moves on.
#[derive(Debug, Clone)]
pub struct AttemptToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl AttemptToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }
}

/// Cloneable handle that invalidates whatever attempt is in flight.
#[derive(Debug, Clone)]
pub struct SupersedeHandle {
    current: Arc<AtomicU64>,
}

impl SupersedeHandle {
    pub fn supersede(&self) {
        let gen = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation = gen, "in-flight resolution superseded");
    }
}

#[derive(Debug)]
pub struct ResolutionSession {
    state: ResolutionState,
    generation: Arc<AtomicU64>,
    last: Option<Resolution>,
}

impl Default for ResolutionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionSession {
    pub fn new() -> Self {
        Self {
            state: ResolutionState::Idle,
            generation: Arc::new(AtomicU64::new(0)),
            last: None,
        }
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    /// Most recent successful resolution, kept across later failures.
    pub fn resolution(&self) -> Option<&Resolution> {
        self.last.as_ref()
    }

    pub fn location(&self) -> Option<&ResolvedLocation> {
        self.last.as_ref().map(|r| &r.location)
    }

    pub fn supersede_handle(&self) -> SupersedeHandle {
        SupersedeHandle {
            current: Arc::clone(&self.generation),
        }
    }

    /// Start a new attempt: invalidates any older token and enters `Locating`.
    pub fn begin(&mut self) -> AttemptToken {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state = ResolutionState::Locating;
        debug!(generation, "resolution attempt started");
        AttemptToken {
            generation,
            current: Arc::clone(&self.generation),
        }
    }

    /// Move to `next` on behalf of `token`. Fails without side effects if the
    /// token is stale.
    pub fn advance(&mut self, token: &AttemptToken, next: ResolutionState) -> Result<(), ResolveError> {
        if !token.is_current() {
            debug!(generation = token.generation, next = %next, "stale attempt dropped");
            return Err(ResolveError::Superseded);
        }
        debug_assert!(
            self.state.can_transition_to(&next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(generation = token.generation, from = %self.state, to = %next, "state transition");
        self.state = next;
        Ok(())
    }

    /// Terminal failure for `token`'s attempt.
    pub fn fail(&mut self, token: &AttemptToken, reason: ResolutionFailure) -> ResolveError {
        match self.advance(token, ResolutionState::Failed(reason)) {
            Ok(()) => ResolveError::Failed(reason),
            Err(e) => e,
        }
    }

    /// Terminal success for `token`'s attempt.
    pub fn complete(&mut self, token: &AttemptToken, resolution: Resolution) -> Result<Resolution, ResolveError> {
        self.advance(token, ResolutionState::Done)?;
        self.last = Some(resolution.clone());
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::types::MatchKind;

    fn sample() -> Resolution {
        Resolution {
            location: ResolvedLocation::new("D.I. Yogyakarta", "Kab. Sleman"),
            province_match: MatchKind::Exact,
            city_match: MatchKind::Exact,
        }
    }

    #[test]
    fn test_happy_path() {
        let mut s = ResolutionSession::new();
        assert_eq!(s.state(), &ResolutionState::Idle);
        let t = s.begin();
        assert_eq!(s.state(), &ResolutionState::Locating);
        s.advance(&t, ResolutionState::Resolving).unwrap();
        let r = s.complete(&t, sample()).unwrap();
        assert_eq!(s.state(), &ResolutionState::Done);
        assert_eq!(s.location(), Some(&r.location));
    }

    #[test]
    fn test_fail_records_reason() {
        let mut s = ResolutionSession::new();
        let t = s.begin();
        let err = s.fail(&t, ResolutionFailure::GeocodeFailed);
        assert_eq!(err, ResolveError::Failed(ResolutionFailure::GeocodeFailed));
        assert_eq!(s.state(), &ResolutionState::Failed(ResolutionFailure::GeocodeFailed));
        assert!(s.state().is_terminal());
    }

    #[test]
    fn test_superseded_attempt_leaves_session_untouched() {
        let mut s = ResolutionSession::new();
        let t = s.begin();
        s.supersede_handle().supersede();
        assert!(!t.is_current());
        assert_eq!(s.advance(&t, ResolutionState::Resolving), Err(ResolveError::Superseded));
        assert_eq!(s.complete(&t, sample()), Err(ResolveError::Superseded));
        assert_eq!(s.fail(&t, ResolutionFailure::CityNotFound), ResolveError::Superseded);
        assert_eq!(s.state(), &ResolutionState::Locating);
        assert!(s.resolution().is_none());
    }

    #[test]
    fn test_new_attempt_invalidates_old_token() {
        let mut s = ResolutionSession::new();
        let old = s.begin();
        let new = s.begin();
        assert!(!old.is_current());
        assert!(new.is_current());
        assert!(new.generation() > old.generation());
    }

    #[test]
    fn test_last_resolution_survives_failure() {
        let mut s = ResolutionSession::new();
        let t = s.begin();
        s.advance(&t, ResolutionState::Resolving).unwrap();
        s.complete(&t, sample()).unwrap();
        let t2 = s.begin();
        s.fail(&t2, ResolutionFailure::PositionUnavailable);
        assert_eq!(s.location().map(|l| l.city.as_str()), Some("Kab. Sleman"));
    }

    #[test]
    fn test_transition_table() {
        use ResolutionState::*;
        assert!(Idle.can_transition_to(&Locating));
        assert!(Locating.can_transition_to(&Resolving));
        assert!(Locating.can_transition_to(&Failed(ResolutionFailure::GeocodeFailed)));
        assert!(Resolving.can_transition_to(&Done));
        assert!(!Idle.can_transition_to(&Done));
        assert!(!Locating.can_transition_to(&Done));
        assert!(!Done.can_transition_to(&Resolving));
    }

    #[test]
    fn test_state_serializes_tagged() {
        let json = serde_json::to_string(&ResolutionState::Failed(ResolutionFailure::CityNotFound)).unwrap();
        assert_eq!(json, r#"{"state":"failed","reason":"city_not_found"}"#);
    }
}
