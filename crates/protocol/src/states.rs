//! Bare-string states carried by the auxiliary channels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Stream resolution requested by the operator (Resolution channel).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionState {
    High,
    Low,
    /// No selection made.
    #[default]
    None,
}

impl ResolutionState {
    /// Resolves the two menu toggles; `High` wins when both are set.
    pub fn from_toggles(high: bool, low: bool) -> Self {
        if high {
            ResolutionState::High
        } else if low {
            ResolutionState::Low
        } else {
            ResolutionState::None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionState::High => "High",
            ResolutionState::Low => "Low",
            ResolutionState::None => "None",
        }
    }
}

/// Arm teleop continuation flag (Pause channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauseState {
    /// Keep driving the arm.
    High,
    /// Arm teleop paused.
    Low,
}

impl PauseState {
    pub fn from_continue(should_continue: bool) -> Self {
        if should_continue {
            PauseState::High
        } else {
            PauseState::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PauseState::High => "High",
            PauseState::Low => "Low",
        }
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PauseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High" => Ok(ResolutionState::High),
            "Low" => Ok(ResolutionState::Low),
            "None" => Ok(ResolutionState::None),
            other => Err(ProtocolError::UnknownState(other.to_string())),
        }
    }
}

impl FromStr for PauseState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High" => Ok(PauseState::High),
            "Low" => Ok(PauseState::Low),
            other => Err(ProtocolError::UnknownState(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_toggles_prefer_high() {
        assert_eq!(ResolutionState::from_toggles(true, true), ResolutionState::High);
        assert_eq!(ResolutionState::from_toggles(false, true), ResolutionState::Low);
        assert_eq!(ResolutionState::from_toggles(false, false), ResolutionState::None);
    }

    #[test]
    fn pause_follows_continue_flag() {
        assert_eq!(PauseState::from_continue(true).as_str(), "High");
        assert_eq!(PauseState::from_continue(false).as_str(), "Low");
    }

    #[test]
    fn states_parse_wire_strings() {
        assert_eq!("None".parse::<ResolutionState>(), Ok(ResolutionState::None));
        assert_eq!("Low".parse::<PauseState>(), Ok(PauseState::Low));
        assert!("None".parse::<PauseState>().is_err());
    }
}
