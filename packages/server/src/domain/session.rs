//! Focus session entity and its phase state machine.
//!
//! ```text
//! Working·Active ──pause──▶ Working·Paused ──resume──▶ Working·Active
//!       │ deadline
//!       ▼
//! Resting·Active ──pause──▶ Resting·Paused ──resume──▶ Resting·Active
//!       │ deadline
//!       ├─ cycles left ──▶ Working·Active
//!       └─ last cycle  ──▶ Terminated
//! ```
//!
//! `stop` reaches Terminated from any state. Pausing never advances the phase.

use std::time::Duration;

use tokio::time::Instant;

use super::{
    ChannelId, ScheduledTimer, ScopeId, SessionError, SessionEventKind, SessionId, TimerId,
    Timestamp, UserId,
};

pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_CYCLES: u32 = 4;

pub const MAX_WORK_MINUTES: u32 = 180;
pub const MAX_BREAK_MINUTES: u32 = 60;
pub const MAX_CYCLES: u32 = 20;

/// Lower bound for the delay scheduled on resume
pub const MIN_RESUME_DELAY: Duration = Duration::from_millis(1);

/// Validated per-session durations and cycle count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    work_minutes: u32,
    break_minutes: u32,
    total_cycles: u32,
}

impl SessionConfig {
    pub fn new(
        work_minutes: u32,
        break_minutes: u32,
        total_cycles: u32,
    ) -> Result<Self, SessionError> {
        if work_minutes == 0 || work_minutes > MAX_WORK_MINUTES {
            return Err(SessionError::InvalidConfig(format!(
                "work time must be 1-{MAX_WORK_MINUTES} minutes"
            )));
        }
        if break_minutes == 0 || break_minutes > MAX_BREAK_MINUTES {
            return Err(SessionError::InvalidConfig(format!(
                "break time must be 1-{MAX_BREAK_MINUTES} minutes"
            )));
        }
        if total_cycles == 0 || total_cycles > MAX_CYCLES {
            return Err(SessionError::InvalidConfig(format!(
                "cycles must be 1-{MAX_CYCLES}"
            )));
        }
        Ok(Self {
            work_minutes,
            break_minutes,
            total_cycles,
        })
    }

    pub fn work_minutes(&self) -> u32 {
        self.work_minutes
    }

    pub fn break_minutes(&self) -> u32 {
        self.break_minutes
    }

    pub fn total_cycles(&self) -> u32 {
        self.total_cycles
    }

    pub fn work_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.work_minutes) * 60)
    }

    pub fn break_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.break_minutes) * 60)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
            total_cycles: DEFAULT_CYCLES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Working,
    Resting,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Working => "work",
            Phase::Resting => "break",
        }
    }
}

/// What follows the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPhase {
    Break,
    Work,
    Complete,
}

impl NextPhase {
    pub fn label(&self) -> &'static str {
        match self {
            NextPhase::Break => "break",
            NextPhase::Work => "work",
            NextPhase::Complete => "complete",
        }
    }
}

/// Countdown state of a session.
///
/// A live session is either running with exactly one outstanding timer or
/// paused with the time it had left.
#[derive(Debug)]
enum Countdown {
    Running {
        deadline: Instant,
        timer: ScheduledTimer,
    },
    Paused {
        remaining: Duration,
    },
    Terminated,
}

/// Parameters for a new session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub user_id: UserId,
    pub scope_id: ScopeId,
    pub channel_id: ChannelId,
    pub config: SessionConfig,
    pub notifications_enabled: bool,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub scope_id: ScopeId,
    pub channel_id: ChannelId,
    pub config: SessionConfig,
    pub phase: Phase,
    pub paused: bool,
    pub terminated: bool,
    pub remaining: Duration,
    pub current_cycle: u32,
    pub next_phase: NextPhase,
    pub notifications_enabled: bool,
    pub started_at: Timestamp,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    scope_id: ScopeId,
    channel_id: ChannelId,
    config: SessionConfig,
    current_cycle: u32,
    phase: Phase,
    countdown: Countdown,
    notifications_enabled: bool,
    started_at: Timestamp,
}

impl Session {
    /// Create a session in the first work phase, counting down to `deadline`.
    pub fn start(
        id: SessionId,
        params: NewSession,
        started_at: Timestamp,
        deadline: Instant,
        timer: ScheduledTimer,
    ) -> Self {
        Self {
            id,
            user_id: params.user_id,
            scope_id: params.scope_id,
            channel_id: params.channel_id,
            config: params.config,
            current_cycle: 1,
            phase: Phase::Working,
            countdown: Countdown::Running { deadline, timer },
            notifications_enabled: params.notifications_enabled,
            started_at,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn scope_id(&self) -> &ScopeId {
        &self.scope_id
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_cycle(&self) -> u32 {
        self.current_cycle
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.countdown, Countdown::Paused { .. })
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.countdown, Countdown::Terminated)
    }

    /// Whether `timer_id` is the timer this session is currently waiting on.
    pub fn is_current_timer(&self, timer_id: TimerId) -> bool {
        matches!(&self.countdown, Countdown::Running { timer, .. } if timer.id() == timer_id)
    }

    /// Running past its deadline, with the expiry not yet applied.
    pub fn is_overdue(&self, now: Instant) -> bool {
        matches!(&self.countdown, Countdown::Running { deadline, .. } if *deadline <= now)
    }

    /// Full length of the current phase
    pub fn phase_duration(&self) -> Duration {
        match self.phase {
            Phase::Working => self.config.work_duration(),
            Phase::Resting => self.config.break_duration(),
        }
    }

    /// Time left in the current phase, never negative.
    pub fn remaining(&self, now: Instant) -> Duration {
        match &self.countdown {
            Countdown::Running { deadline, .. } => deadline.saturating_duration_since(now),
            Countdown::Paused { remaining } => *remaining,
            Countdown::Terminated => Duration::ZERO,
        }
    }

    pub fn next_phase(&self) -> NextPhase {
        match self.phase {
            Phase::Working => NextPhase::Break,
            Phase::Resting if self.current_cycle < self.config.total_cycles => NextPhase::Work,
            Phase::Resting => NextPhase::Complete,
        }
    }

    /// Cancel the pending timer and freeze the remaining time.
    pub fn pause(&mut self, now: Instant) -> Result<Duration, SessionError> {
        match &self.countdown {
            Countdown::Running { .. } => {}
            Countdown::Paused { .. } => return Err(SessionError::NotRunning),
            Countdown::Terminated => return Err(SessionError::NotFound),
        }
        let remaining = self.remaining(now);
        // replacing the countdown drops the timer, which aborts its task
        self.countdown = Countdown::Paused { remaining };
        Ok(remaining)
    }

    /// Deadline for resuming at `now`, without mutating the session.
    pub fn resume_deadline(&self, now: Instant) -> Result<Instant, SessionError> {
        match &self.countdown {
            Countdown::Paused { remaining } => Ok(now + (*remaining).max(MIN_RESUME_DELAY)),
            Countdown::Running { .. } => Err(SessionError::NotPaused),
            Countdown::Terminated => Err(SessionError::NotFound),
        }
    }

    /// Start counting down to `deadline` with `timer`, replacing any previous timer.
    pub fn arm(&mut self, deadline: Instant, timer: ScheduledTimer) {
        self.countdown = Countdown::Running { deadline, timer };
    }

    /// Apply the end of the current phase.
    ///
    /// After a `Completed` transition the session is terminated. Otherwise the
    /// next phase is left paused at its full duration and the caller arms it.
    pub fn complete_phase(&mut self) -> SessionEventKind {
        let total_cycles = self.config.total_cycles;
        match self.phase {
            Phase::Working => {
                self.phase = Phase::Resting;
                self.countdown = Countdown::Paused {
                    remaining: self.config.break_duration(),
                };
                SessionEventKind::WorkEnded {
                    cycle: self.current_cycle,
                    total_cycles,
                }
            }
            Phase::Resting if self.current_cycle >= total_cycles => {
                self.terminate();
                SessionEventKind::Completed { total_cycles }
            }
            Phase::Resting => {
                self.current_cycle += 1;
                self.phase = Phase::Working;
                self.countdown = Countdown::Paused {
                    remaining: self.config.work_duration(),
                };
                SessionEventKind::BreakEnded {
                    cycle: self.current_cycle,
                    total_cycles,
                }
            }
        }
    }

    /// Cancel any timer and mark the session finished. Idempotent.
    pub fn terminate(&mut self) {
        self.countdown = Countdown::Terminated;
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            user_id: self.user_id.clone(),
            scope_id: self.scope_id.clone(),
            channel_id: self.channel_id.clone(),
            config: self.config,
            phase: self.phase,
            paused: self.is_paused(),
            terminated: self.is_terminated(),
            remaining: self.remaining(now),
            current_cycle: self.current_cycle,
            next_phase: self.next_phase(),
            notifications_enabled: self.notifications_enabled,
            started_at: self.started_at,
        }
    }
}
