//! Draw-cycle state and core types
//!
//! Everything the phase machine carries between ticks lives here. The state
//! is a mirror of what the engine last wrote to the surface, so tests and
//! hosts can inspect the choreography without a render surface attached.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::settings::Timings;
use crate::surface::{Pose, Transition};

/// One participant in the draw, by display label.
///
/// Labels are opaque to the engine; their order defines the stable chit
/// index for the duration of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub label: String,
}

impl Participant {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// The fold-out name panel shown while a chit's participant is revealed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfoldPanel {
    /// Panel is mounted.
    pub visible: bool,
    /// Panel is in its unfolded pose.
    pub unfolding: bool,
}

/// Mirror of everything the engine last wrote to one chit handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChitVisual {
    pub pose: Pose,
    pub opacity: f32,
    pub transition: Transition,
    /// True only for the winner, only during Present..Unreveal.
    pub revealing: bool,
    pub panel: UnfoldPanel,
}

impl Default for ChitVisual {
    fn default() -> Self {
        Self {
            pose: Pose::NEUTRAL,
            // Chits enter invisible; the Drop phase fades them in
            opacity: 0.0,
            transition: Transition::NONE,
            revealing: false,
            panel: UnfoldPanel::default(),
        }
    }
}

/// The eight phases of one draw cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseKind {
    /// Chits fall into the bowl and settle.
    Drop,
    /// The bowl is stirred in randomized bursts.
    Stir,
    /// One chit is chosen uniformly at random.
    Select,
    /// The hand reaches in and lifts the winner.
    Present,
    /// The winner's panel unfolds to show the name.
    Reveal,
    /// The panel folds away and the winner returns to the bowl.
    Unreveal,
    /// All chits fan out around the bowl rim.
    Scatter,
    /// Everything fades and recedes before the next cycle.
    Vanish,
}

/// Session lifecycle.
///
/// Replaces a shared boolean lock with an explicit value so the
/// single-flight rule is checkable in isolation from any render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No session in flight; `begin_session` may start one.
    #[default]
    Idle,
    /// A session is in flight; `begin_session` is a no-op.
    Running,
    /// Shut down; no session will ever start again.
    Stopped,
}

/// Machine position within the running session.
///
/// Each variant is one timed step; `tick` decrements the embedded hold and
/// performs the next step's writes when it expires. Phases with several
/// sub-steps get one variant per sub-step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Between sessions (or not running at all).
    Idle,
    /// Drop entry writes done, holding for the layout flush.
    DropFlush { hold: f32 },
    /// Staggered settle sweep across chit indices.
    DropSettle { elapsed: f32, fired: usize },
    /// Post-settle pause before stirring.
    DropHold { hold: f32 },
    /// Stir bursts remaining and time to the next one.
    StirSpin { remaining: u8, hold: f32 },
    /// Post-stir pause before selection.
    StirHold { hold: f32 },
    /// Cursor hovering above the winner.
    PresentHover { hold: f32 },
    /// Cursor touching down on the winner.
    PresentTouch { hold: f32 },
    /// Winner lifting out of the bowl.
    PresentLift { hold: f32 },
    /// Panel mounted, waiting to unfold.
    RevealOpen { hold: f32 },
    /// Name on display.
    RevealHold { hold: f32 },
    /// Panel folding away.
    UnrevealFold { hold: f32 },
    /// Pause before the vanish fade.
    VanishLead { hold: f32 },
    /// Fade-out in flight.
    VanishFade { hold: f32 },
}

impl Default for Step {
    fn default() -> Self {
        Self::Idle
    }
}

/// Observable engine events, drained by the host.
///
/// Decorative only: `WinnerChosen` reports the animated pick, never an
/// authoritative payout decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawEvent {
    /// A new cycle is about to enter Drop.
    SessionStarted,
    /// A phase's entry writes were just issued.
    PhaseStarted(PhaseKind),
    /// Select picked this chit index.
    WinnerChosen { chit: usize },
    /// Select found no present chits; the cycle ended early.
    SessionAborted,
    /// Vanish finished; the loop restarts unless shut down.
    SessionCompleted,
    /// Shutdown took effect; no further sessions.
    Stopped,
}

/// Complete engine state driven by [`tick`](crate::draw::tick::tick).
#[derive(Debug)]
pub struct DrawState {
    /// Roster, in draw order. Index = chit index.
    pub participants: Vec<Participant>,
    /// Visual mirror, one entry per participant.
    pub chits: Vec<ChitVisual>,
    /// Session lifecycle value (the single-flight guard).
    pub session: SessionState,
    /// Position within the running session.
    pub step: Step,
    /// Winner of the current cycle, set at Select.
    pub winner: Option<usize>,
    /// Timing profile for every hold and transition.
    pub timings: Timings,
    /// Accumulated engine time, for logging.
    pub time: f64,
    /// Cursor target computed at Present entry (scene-relative).
    pub(crate) cursor_target: glam::Vec2,
    pub(crate) shutdown_requested: bool,
    pub(crate) rng: Pcg32,
    events: Vec<DrawEvent>,
}

impl DrawState {
    /// New engine state with an entropy-seeded RNG and an empty roster.
    pub fn new(timings: Timings) -> Self {
        Self::from_rng(timings, Pcg32::from_rng(&mut rand::rng()))
    }

    /// New engine state with a fixed seed (deterministic, for tests).
    pub fn with_seed(timings: Timings, seed: u64) -> Self {
        Self::from_rng(timings, Pcg32::seed_from_u64(seed))
    }

    fn from_rng(timings: Timings, rng: Pcg32) -> Self {
        Self {
            participants: Vec::new(),
            chits: Vec::new(),
            session: SessionState::Idle,
            step: Step::Idle,
            winner: None,
            timings,
            time: 0.0,
            cursor_target: glam::Vec2::ZERO,
            shutdown_requested: false,
            rng,
            events: Vec::new(),
        }
    }

    /// Replace the roster. The visual mirror is resized to match: the first
    /// `min(old, new)` entries are reused, stale entries are dropped, new
    /// entries start at the default (invisible) visual.
    ///
    /// The surface registry is resized separately; hosts normally go through
    /// [`set_roster`](crate::draw::tick::set_roster) which does both.
    pub fn set_participants(&mut self, participants: Vec<Participant>) {
        self.chits
            .resize_with(participants.len(), ChitVisual::default);
        self.participants = participants;
    }

    /// Start a session if none is in flight.
    ///
    /// Returns `true` if a session actually started. While one is running
    /// (or after shutdown) this is a no-op returning `false`, which is what
    /// makes rapid repeated calls safe.
    pub fn begin_session(&mut self) -> bool {
        match self.session {
            SessionState::Idle => {
                self.session = SessionState::Running;
                true
            }
            SessionState::Running | SessionState::Stopped => false,
        }
    }

    /// Request shutdown. An in-flight step runs to completion; the machine
    /// stops at the next phase boundary instead of entering the next phase,
    /// and no further session will start.
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
        if self.session == SessionState::Idle {
            self.session = SessionState::Stopped;
            self.push_event(DrawEvent::Stopped);
        }
    }

    /// Number of chits currently marked revealing (invariant: 0 or 1).
    pub fn revealing_count(&self) -> usize {
        self.chits.iter().filter(|c| c.revealing).count()
    }

    /// Display label of the current winner, if one is chosen.
    pub fn winner_label(&self) -> Option<&str> {
        self.winner
            .and_then(|i| self.participants.get(i))
            .map(|p| p.label.as_str())
    }

    /// Take all events recorded since the last drain, in order.
    pub fn drain_events(&mut self) -> Vec<DrawEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: DrawEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_session_single_flight() {
        let mut state = DrawState::with_seed(Timings::default(), 7);
        assert!(state.begin_session());
        assert_eq!(state.session, SessionState::Running);

        // Rapid re-entry while running is a no-op
        assert!(!state.begin_session());
        assert!(!state.begin_session());
        assert_eq!(state.session, SessionState::Running);
    }

    #[test]
    fn test_shutdown_while_idle_stops_immediately() {
        let mut state = DrawState::with_seed(Timings::default(), 7);
        state.request_shutdown();
        assert_eq!(state.session, SessionState::Stopped);
        assert!(!state.begin_session());
        assert_eq!(state.drain_events(), vec![DrawEvent::Stopped]);
    }

    #[test]
    fn test_set_participants_resizes_mirror() {
        let mut state = DrawState::with_seed(Timings::default(), 7);
        state.set_participants(vec![
            Participant::new("Amal"),
            Participant::new("Bhagya"),
            Participant::new("Chamara"),
        ]);
        assert_eq!(state.chits.len(), 3);

        state.chits[0].opacity = 1.0;
        state.set_participants(vec![Participant::new("Amal"), Participant::new("Bhagya")]);
        assert_eq!(state.chits.len(), 2);
        // Reused prefix keeps its visual state
        assert_eq!(state.chits[0].opacity, 1.0);

        state.set_participants(
            ["Amal", "Bhagya", "Chamara", "Dilini"]
                .map(Participant::new)
                .to_vec(),
        );
        assert_eq!(state.chits.len(), 4);
        assert_eq!(state.chits[3].opacity, 0.0);
    }

    #[test]
    fn test_winner_label_lookup() {
        let mut state = DrawState::with_seed(Timings::default(), 7);
        state.set_participants(vec![Participant::new("Amal"), Participant::new("Bhagya")]);
        assert_eq!(state.winner_label(), None);
        state.winner = Some(1);
        assert_eq!(state.winner_label(), Some("Bhagya"));
        // Stale index after a shrink resolves to nothing
        state.set_participants(vec![Participant::new("Amal")]);
        state.winner = Some(1);
        assert_eq!(state.winner_label(), None);
    }
}
