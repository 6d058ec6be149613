//! Logging handle owned by a `Collector`.
//!
//! The library never installs a global subscriber. Instead each `Collector` carries a
//! `Diagnostics` value and runs its public operations inside it, so two collectors in one
//! process can log at different levels.

use tracing::{dispatcher, Dispatch, Level};

/// How much to log, 0 through 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only.
    #[default]
    Error,
    /// Errors and warnings.
    Warn,
    /// Progress messages too.
    Info,
    /// Everything.
    Debug,
}

impl Verbosity {
    /// Map a numeric verbosity to a level, saturating above 3.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Error,
            1 => Verbosity::Warn,
            2 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }

    /// The `tracing` level this verbosity lets through.
    pub fn as_level(self) -> Level {
        match self {
            Verbosity::Error => Level::ERROR,
            Verbosity::Warn => Level::WARN,
            Verbosity::Info => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
        }
    }
}

impl From<u8> for Verbosity {
    fn from(level: u8) -> Self {
        Verbosity::from_level(level)
    }
}

/// An explicitly constructed logging handle.
#[derive(Clone)]
pub struct Diagnostics {
    verbosity: Verbosity,
    dispatch: Dispatch,
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("verbosity", &self.verbosity)
            .finish()
    }
}

impl Diagnostics {
    /// Build a handle that writes formatted events to stderr at `verbosity`.
    pub fn new(verbosity: Verbosity) -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(verbosity.as_level())
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();

        Diagnostics {
            verbosity,
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// The current verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Run `f` with this handle as the active subscriber.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}

#[cfg(test)]
mod unit {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(Verbosity::from_level(0).as_level(), Level::ERROR);
        assert_eq!(Verbosity::from_level(1).as_level(), Level::WARN);
        assert_eq!(Verbosity::from_level(2).as_level(), Level::INFO);
        assert_eq!(Verbosity::from_level(3).as_level(), Level::DEBUG);
        assert_eq!(Verbosity::from(9), Verbosity::Debug);
    }

    #[test]
    fn test_scope_returns_value() {
        let diag = Diagnostics::new(Verbosity::Debug);
        let val = diag.scope(|| {
            tracing::debug!("inside scope");
            42
        });
        assert_eq!(val, 42);
        assert_eq!(diag.verbosity(), Verbosity::Debug);
    }
}
