//! Session lifecycle (spec.md §4.7): `opening -> open -> draining -> closed`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// The WebSocket upgrade is in flight; no messages processed yet.
    Opening,
    /// Accepting `suggest`/`update_preferences`/`ping`.
    Open,
    /// A close was requested or the idle-ping grace period expired; no new
    /// retrieval is scheduled, in-flight work finishes or is cancelled.
    Draining,
    /// Both the reader and writer halves have stopped.
    Closed,
}

impl SessionPhase {
    pub fn accepts_requests(self) -> bool {
        matches!(self, SessionPhase::Open)
    }
}
