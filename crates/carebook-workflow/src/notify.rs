//! Simulated notification delivery.

use tracing::info;

use carebook_contracts::error::CarebookResult;
use carebook_contracts::reminder::ReminderChannel;

use crate::traits::Notifier;

/// Records delivery intent via structured logging and always acknowledges.
///
/// Stands in for the email/SMS senders of a real deployment; nothing leaves
/// the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn notify(
        &self,
        recipient: &str,
        channel: ReminderChannel,
        message: &str,
    ) -> CarebookResult<()> {
        info!(
            recipient = recipient,
            channel = %channel,
            message = message,
            "notification recorded (simulated delivery)"
        );
        Ok(())
    }
}
