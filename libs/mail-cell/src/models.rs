use serde::{Deserialize, Serialize};

/// A rendered message ready for a transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailMessage {
    pub from: String,
    /// `Name <address>` mailbox.
    pub to: String,
    pub subject: String,
    pub html: String,
}
