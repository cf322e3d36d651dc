//! Shutdown signals understood by the worker.

use std::{fmt, str::FromStr};

use nix::sys::signal::Signal;

/// Shutdown flavour sent to the worker at the end of each attempt's delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// `SIGQUIT`: abort immediately without waiting for in-flight jobs.
    ///
    /// This is the path on which the pool tears down children that are still being
    /// spawned, so it is the default.
    Cold,
    /// `SIGTERM`: stop taking jobs and let in-flight jobs finish.
    Warm,
}

impl ShutdownSignal {
    /// OS signal delivered for this shutdown flavour.
    pub fn as_signal(&self) -> Signal {
        match self {
            Self::Cold => Signal::SIGQUIT,
            Self::Warm => Signal::SIGTERM,
        }
    }

    /// Signal name for log lines.
    pub fn name(&self) -> &'static str {
        self.as_signal().as_str()
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cold => write!(f, "{} (cold shutdown)", self.name()),
            Self::Warm => write!(f, "{} (warm shutdown)", self.name()),
        }
    }
}

impl FromStr for ShutdownSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cold" | "quit" | "sigquit" => Ok(Self::Cold),
            "warm" | "term" | "sigterm" => Ok(Self::Warm),
            other => Err(format!("expected `cold` or `warm`, got `{}`", other)),
        }
    }
}
