/// One inbound chat message, already decoded from whatever transport carried
/// it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub message_ts: String,
}

impl InboundMessage {
    /// Store lookup key: one live session per user per channel. Normalized
    /// so retried deliveries with stray whitespace or casing land on the
    /// same session.
    pub fn owner_key(&self) -> String {
        format!(
            "{}:{}",
            self.channel_id.trim().to_ascii_lowercase(),
            self.user_id.trim().to_ascii_lowercase()
        )
    }
}

/// Transport-level wrapper around a message, carrying the delivery id used
/// for correlation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEnvelope {
    pub envelope_id: String,
    pub message: InboundMessage,
}
