use std::str::FromStr;

/// The default HTTP Basic authentication realm
pub const DEFAULT_REALM: &str = "Auth Required";

/// Determines how debug mode treats the response status and headers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DebugHeaderPolicy {
  /// Keep the status code and headers, and add the debug information to the body
  #[default]
  Augment,
  /// Don't set the status code and the status-specific headers when in debug mode
  Suppress,
}

impl FromStr for DebugHeaderPolicy {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "augment" => Ok(DebugHeaderPolicy::Augment),
      "suppress" => Ok(DebugHeaderPolicy::Suppress),
      _ => Err(anyhow::anyhow!(
        "Invalid debug header policy \"{}\", expected \"augment\" or \"suppress\"",
        s
      )),
    }
  }
}

/// The configuration of the responder
#[derive(Clone, Debug)]
pub struct ResponderConfig {
  /// The HTTP Basic authentication realm sent with 401 responses
  pub realm: String,
  /// The server signature used when the request context doesn't carry one
  pub server_signature: String,
  /// The debug mode header policy
  pub debug_header_policy: DebugHeaderPolicy,
}

impl Default for ResponderConfig {
  fn default() -> Self {
    Self {
      realm: DEFAULT_REALM.to_string(),
      server_signature: String::new(),
      debug_header_policy: DebugHeaderPolicy::default(),
    }
  }
}
