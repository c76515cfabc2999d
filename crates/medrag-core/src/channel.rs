/// Typed error for channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Incoming line from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub text: String,
}

/// Bidirectional text channel between the user and a chat session.
pub trait Channel: Send {
    /// Receive the next message. Returns `None` on EOF or when the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn recv(&mut self)
    -> impl Future<Output = Result<Option<ChannelMessage>, ChannelError>> + Send;

    /// Send a text response.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying I/O fails.
    fn send(&mut self, text: &str) -> impl Future<Output = Result<(), ChannelError>> + Send;
}
