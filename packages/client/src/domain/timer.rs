//! Shared Pomodoro timer state machine.
//!
//! The authoritative state is the last `timer_update` received. `time_left` is a
//! local projection of it, decremented once per second while running and
//! overwritten by every snapshot.

/// Length of a focus session in seconds (25 minutes)
pub const POMODORO_SECONDS: u32 = 1500;
/// Length of a break in seconds (5 minutes)
pub const BREAK_SECONDS: u32 = 300;

/// The shared `{running, remaining, start_time}` triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    pub running: bool,
    pub remaining: u32,
    /// Epoch milliseconds when the countdown was started
    pub start_time: Option<i64>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            running: false,
            remaining: POMODORO_SECONDS,
            start_time: None,
        }
    }
}

/// Owner-initiated timer actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Reset(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerMachine {
    state: TimerState,
    time_left: u32,
    /// Set once the auto-stop for the current crossing of zero has been emitted
    auto_stop_sent: bool,
}

impl Default for TimerMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerMachine {
    pub fn new() -> Self {
        let state = TimerState::default();
        Self {
            state,
            time_left: state.remaining,
            auto_stop_sent: false,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Replace the state with a server snapshot.
    ///
    /// # Returns
    ///
    /// The auto-stop update to send, if the snapshot itself is already expired
    pub fn apply(&mut self, snapshot: TimerState) -> Option<TimerState> {
        self.state = snapshot;
        self.time_left = snapshot.remaining;
        if !snapshot.running || snapshot.remaining > 0 {
            self.auto_stop_sent = false;
        }
        self.check_expiry()
    }

    /// Advance the local projection by one second.
    ///
    /// # Returns
    ///
    /// The auto-stop update to send when the countdown reaches zero
    pub fn tick(&mut self) -> Option<TimerState> {
        if !self.state.running {
            return None;
        }
        self.time_left = self.time_left.saturating_sub(1);
        self.check_expiry()
    }

    /// Build the update for an owner action.
    ///
    /// Local state is not touched; it changes when the server echoes the update.
    /// `Start` is only valid from idle and `Pause` only while running.
    pub fn command(&self, command: TimerCommand, now_millis: i64) -> Option<TimerState> {
        match command {
            TimerCommand::Start if !self.state.running => Some(TimerState {
                running: true,
                remaining: self.time_left,
                start_time: Some(now_millis),
            }),
            TimerCommand::Pause if self.state.running => Some(TimerState {
                running: false,
                remaining: self.time_left,
                start_time: None,
            }),
            TimerCommand::Reset(seconds) => Some(TimerState {
                running: false,
                remaining: seconds,
                start_time: None,
            }),
            TimerCommand::Start | TimerCommand::Pause => None,
        }
    }

    fn check_expiry(&mut self) -> Option<TimerState> {
        if self.state.running && self.time_left == 0 && !self.auto_stop_sent {
            self.auto_stop_sent = true;
            return Some(TimerState {
                running: false,
                remaining: 0,
                start_time: self.state.start_time,
            });
        }
        None
    }
}
