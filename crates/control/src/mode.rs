//! Pinch-gesture mode machine.

use std::fmt;

use teleop_protocol::{PauseState, StreamMarker};

use crate::presentation::{Indicator, UiHints};

/// What the controller streams on a healthy tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Relative,
    Absolute,
    Paused,
}

impl Mode {
    /// Marker for the hand frames, or `None` when nothing is streamed.
    pub fn marker(self) -> Option<StreamMarker> {
        match self {
            Mode::Relative => Some(StreamMarker::Relative),
            Mode::Absolute => Some(StreamMarker::Absolute),
            Mode::Paused => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Relative => "relative",
            Mode::Absolute => "absolute",
            Mode::Paused => "paused",
        })
    }
}

/// Pinch predicates for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gestures {
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
}

/// Emitted when the (mode, continue) pair changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
    pub should_continue: bool,
    pub hints: UiHints,
}

#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: Mode,
    should_continue: bool,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn should_continue(&self) -> bool {
        self.should_continue
    }

    /// State reported on the Pause channel.
    pub fn pause_state(&self) -> PauseState {
        PauseState::from_continue(self.should_continue)
    }

    /// Applies one tick of gestures. Ring wins over index, which wins over
    /// middle.
    pub fn apply(&mut self, gestures: Gestures) -> Option<Transition> {
        let (mode, should_continue, hints) = if gestures.ring {
            (
                Mode::Paused,
                false,
                UiHints {
                    indicator: Indicator::Red,
                    menu_visible: true,
                    wrist_tracker: false,
                },
            )
        } else if gestures.index {
            (
                Mode::Relative,
                true,
                UiHints {
                    indicator: Indicator::Green,
                    menu_visible: false,
                    wrist_tracker: false,
                },
            )
        } else if gestures.middle {
            (
                Mode::Absolute,
                true,
                UiHints {
                    indicator: Indicator::Blue,
                    menu_visible: false,
                    wrist_tracker: true,
                },
            )
        } else {
            return None;
        };

        if (mode, should_continue) == (self.mode, self.should_continue) {
            return None;
        }

        let from = self.mode;
        self.mode = mode;
        self.should_continue = should_continue;
        Some(Transition {
            from,
            to: mode,
            should_continue,
            hints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIDDLE: Gestures = Gestures {
        index: false,
        middle: true,
        ring: false,
    };
    const RING: Gestures = Gestures {
        index: false,
        middle: false,
        ring: true,
    };

    #[test]
    fn starts_relative_without_continue() {
        let machine = ModeMachine::new();
        assert_eq!(machine.mode(), Mode::Relative);
        assert!(!machine.should_continue());
        assert_eq!(machine.pause_state(), PauseState::Low);
    }

    #[test]
    fn middle_then_ring_pauses() {
        let mut machine = ModeMachine::new();

        let first = machine.apply(MIDDLE).unwrap();
        assert_eq!(first.to, Mode::Absolute);
        assert_eq!(first.hints.indicator, Indicator::Blue);
        assert!(first.hints.wrist_tracker);
        assert!(machine.apply(MIDDLE).is_none());
        assert!(machine.apply(MIDDLE).is_none());
        assert_eq!(machine.mode(), Mode::Absolute);
        assert_eq!(machine.pause_state(), PauseState::High);

        let paused = machine.apply(RING).unwrap();
        assert_eq!(paused.from, Mode::Absolute);
        assert_eq!(paused.to, Mode::Paused);
        assert!(!paused.should_continue);
        assert!(paused.hints.menu_visible);
        assert_eq!(machine.mode().marker(), None);
    }

    #[test]
    fn index_from_initial_state_sets_continue() {
        let mut machine = ModeMachine::new();
        let t = machine
            .apply(Gestures {
                index: true,
                ..Gestures::default()
            })
            .unwrap();
        assert_eq!((t.from, t.to), (Mode::Relative, Mode::Relative));
        assert!(t.should_continue);
        assert_eq!(t.hints.indicator, Indicator::Green);
    }

    #[test]
    fn simultaneous_pinches_resolve_by_priority() {
        let mut machine = ModeMachine::new();
        let all = Gestures {
            index: true,
            middle: true,
            ring: true,
        };
        assert_eq!(machine.apply(all).unwrap().to, Mode::Paused);

        let index_and_middle = Gestures {
            index: true,
            middle: true,
            ring: false,
        };
        assert_eq!(machine.apply(index_and_middle).unwrap().to, Mode::Relative);
    }

    #[test]
    fn no_pinch_changes_nothing() {
        let mut machine = ModeMachine::new();
        machine.apply(MIDDLE);
        assert!(machine.apply(Gestures::default()).is_none());
        assert_eq!(machine.mode(), Mode::Absolute);
    }

    #[test]
    fn markers_follow_mode() {
        assert_eq!(Mode::Relative.marker(), Some(StreamMarker::Relative));
        assert_eq!(Mode::Absolute.marker(), Some(StreamMarker::Absolute));
        assert_eq!(Mode::Paused.to_string(), "paused");
    }
}
