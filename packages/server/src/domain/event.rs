//! Events emitted by the timer engine at phase boundaries.

use super::SessionSnapshot;

/// Notification sounds, one per phase boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    Start,
    WorkEnd,
    BreakEnd,
    Complete,
}

impl Sound {
    pub fn file_name(&self) -> &'static str {
        match self {
            Sound::Start => "start.mp3",
            Sound::WorkEnd => "work_end.mp3",
            Sound::BreakEnd => "break_end.mp3",
            Sound::Complete => "complete.mp3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    /// A work phase finished; `cycle` is the cycle it belonged to.
    WorkEnded { cycle: u32, total_cycles: u32 },
    /// A break finished and work `cycle` begins.
    BreakEnded { cycle: u32, total_cycles: u32 },
    /// The last break finished. The session is gone after this event.
    Completed { total_cycles: u32 },
}

impl SessionEventKind {
    pub fn sound(&self) -> Sound {
        match self {
            SessionEventKind::WorkEnded { .. } => Sound::WorkEnd,
            SessionEventKind::BreakEnded { .. } => Sound::BreakEnd,
            SessionEventKind::Completed { .. } => Sound::Complete,
        }
    }
}

/// A phase boundary together with the session state right after it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub snapshot: SessionSnapshot,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, snapshot: SessionSnapshot) -> Self {
        Self { kind, snapshot }
    }
}
