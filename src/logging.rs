//! The default logging drain wired into the store when a caller does not
//! supply their own via `init_with_logger`.

use slog::{o, Drain, Logger};

/// A plain terminal drain, matching the "`slog_term`-style plain terminal
/// drain is the default" requirement. Discards nothing; callers who want
/// quieter output (e.g. in tests) should build their own `Logger` around
/// `slog::Discard` and pass it to `init_with_logger`.
pub(crate) fn default_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    Logger::root(drain, o!())
}

#[cfg(test)]
pub(crate) fn discard_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}
