/// Lifecycle of one chat session. Held as an explicit field on the session
/// controller rather than as ambient module state, so re-entrant initialize
/// and reset calls can be collapsed by inspection.
///
/// `Uninitialized → Initializing → Ready → Sending → Ready → … → Resetting → Ready`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Sending,
    Resetting,
}

impl SessionState {
    /// Initializing and resetting exclude each other and themselves.
    pub fn is_transitioning(&self) -> bool {
        return matches!(self, SessionState::Initializing | SessionState::Resetting);
    }
}
