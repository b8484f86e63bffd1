use async_channel::Sender;

/// Represents a log message
#[derive(Clone, Debug)]
pub struct LogMessage {
  is_error: bool,
  message: String,
}

impl LogMessage {
  /// Creates a new `LogMessage` instance.
  ///
  /// # Parameters
  ///
  /// - `message`: The content of the log message.
  /// - `is_error`: Whether the message is an error (`true`) or not (`false`).
  pub fn new(message: String, is_error: bool) -> Self {
    Self { is_error, message }
  }

  /// Consumes the `LogMessage` and returns the message and the error flag.
  pub fn get_message(self) -> (String, bool) {
    (self.message, self.is_error)
  }
}

/// Facilitates logging of error messages through a provided logger sender.
#[derive(Clone, Default)]
pub struct ErrorLogger {
  logger: Option<Sender<LogMessage>>,
}

impl ErrorLogger {
  /// Creates a new `ErrorLogger` instance associated with the provided logger.
  pub fn new(logger: Sender<LogMessage>) -> Self {
    Self {
      logger: Some(logger),
    }
  }

  /// Creates a new `ErrorLogger` instance without any underlying logger.
  pub fn without_logger() -> Self {
    Self { logger: None }
  }

  /// Logs an error message.
  ///
  /// The message is queued without blocking; it's dropped if the channel is full or closed.
  pub fn log(&self, message: &str) {
    if let Some(logger) = &self.logger {
      logger
        .try_send(LogMessage::new(String::from(message), true))
        .unwrap_or_default();
    }
  }

  /// Checks if the logger has an underlying channel
  pub fn is_enabled(&self) -> bool {
    self.logger.is_some()
  }
}
