/*
 * Error types for the coordination layer.
 *
 * None of these are fatal: every task that sees one skips the current cycle
 * and tries again on the next period.
 */

use core::fmt;

/// Steady-state failures of the coordination primitives and devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The bus arbiter was not acquired before the timeout elapsed.
    BusContention,

    /// A non-blocking send found the mailbox full. The item was dropped.
    MailboxFull,

    /// A blocking send gave up waiting for space.
    MailboxTimeout,

    /// A bounded receive found nothing before the timeout elapsed.
    ReceiveTimeout,

    /// A transaction with a device on the bus failed.
    Device,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BusContention => write!(f, "bus busy"),
            Error::MailboxFull => write!(f, "mailbox full"),
            Error::MailboxTimeout => write!(f, "mailbox send timed out"),
            Error::ReceiveTimeout => write!(f, "mailbox receive timed out"),
            Error::Device => write!(f, "device transaction failed"),
        }
    }
}

impl core::error::Error for Error {}
