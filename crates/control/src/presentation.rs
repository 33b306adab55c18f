//! UI feedback emitted by the controller.

/// Colour of the stream border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Disconnected or paused.
    Red,
    /// Connected, relative streaming.
    Green,
    /// Absolute streaming.
    Blue,
}

/// Visibility hints for the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiHints {
    pub indicator: Indicator,
    pub menu_visible: bool,
    pub wrist_tracker: bool,
}

impl UiHints {
    pub const fn disconnected() -> Self {
        Self {
            indicator: Indicator::Red,
            menu_visible: true,
            wrist_tracker: false,
        }
    }

    pub const fn connected() -> Self {
        Self {
            indicator: Indicator::Green,
            menu_visible: false,
            wrist_tracker: false,
        }
    }
}

/// Receives UI hints. Implemented for any `FnMut(UiHints)`.
pub trait Presentation {
    fn apply_hints(&mut self, hints: UiHints);
}

impl<F: FnMut(UiHints)> Presentation for F {
    fn apply_hints(&mut self, hints: UiHints) {
        self(hints)
    }
}
