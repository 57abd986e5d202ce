//! Fatal/non-fatal error taxonomy (§7).
//!
//! Programming errors and resource-exhaustion errors are `FatalError`,
//! propagated as `Result<_, FatalError>` up to the driver loop (spec §9
//! "Exceptions / tracing"). Everything else (gray-area warnings, partial
//! erase advisories, backend disconnects under `no_terminate_on_disconnect`)
//! goes through the logging module in this crate instead and is not an
//! `Err` at all.

use std::fmt;

#[derive(Debug, Clone)]
pub struct FatalError {
    pub subsystem: &'static str,
    pub instance: Option<u32>,
    pub message: String,
}

impl FatalError {
    pub fn new(subsystem: &'static str, instance: Option<u32>, message: impl Into<String>) -> Self {
        FatalError {
            subsystem,
            instance,
            message: message.into(),
        }
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(i) => write!(f, "{}[{}]: {}", self.subsystem, i, self.message),
            None => write!(f, "{}: {}", self.subsystem, self.message),
        }
    }
}

impl std::error::Error for FatalError {}

impl From<std::io::Error> for FatalError {
    fn from(e: std::io::Error) -> Self {
        FatalError::new("io", None, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_subsystem_and_instance() {
        let e = FatalError::new("dppi", Some(3), "channel 99 does not exist");
        assert_eq!(e.to_string(), "dppi[3]: channel 99 does not exist");
    }

    #[test]
    fn display_without_instance() {
        let e = FatalError::new("cli", None, "bad flag");
        assert_eq!(e.to_string(), "cli: bad flag");
    }
}
