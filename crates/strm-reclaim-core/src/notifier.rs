use crate::stats::BatchSummary;

/// Delivery channel for batch summaries.
///
/// The CLI prints to the console; hosts can forward to chat or mail.
/// The default implementation does nothing.
pub trait Notifier: Send {
    fn notify(&self, _summary: &BatchSummary) {}
}

/// No-op notifier for silent operation.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {}
