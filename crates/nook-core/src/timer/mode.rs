use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which interval the timer is counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    #[default]
    Focus,
    Short,
    Long,
}

impl TimerMode {
    pub fn is_focus(self) -> bool {
        self == TimerMode::Focus
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::Short => "short",
            TimerMode::Long => "long",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "focus" | "work" => Ok(TimerMode::Focus),
            "short" | "short-break" | "short_break" => Ok(TimerMode::Short),
            "long" | "long-break" | "long_break" => Ok(TimerMode::Long),
            other => Err(format!("unknown timer mode: {other}")),
        }
    }
}
