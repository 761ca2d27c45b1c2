//! Warning sink used by trackers for non-fatal producer misbehaviour.

/// Fire-and-forget warning capability. Implementations must not fail the caller.
pub trait Warn {
    fn warn(&self, message: &str);
}

/// Forwards warnings to [`tracing::warn!`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarn;

impl Warn for TracingWarn {
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

impl<W: Warn + ?Sized> Warn for &W {
    fn warn(&self, message: &str) {
        (**self).warn(message);
    }
}
