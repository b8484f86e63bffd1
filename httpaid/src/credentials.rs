use base64::{engine::general_purpose, Engine};
use hyper::header;

use crate::context::{
  RequestContext, AUTH_PASSWORD_VARIABLE, AUTH_USER_VARIABLE, HTTP_AUTHORIZATION_VARIABLE,
};

/// Credentials supplied with HTTP Basic authentication.
///
/// If the username is absent, the password is absent too.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
  username: Option<String>,
  password: Option<String>,
}

impl Credentials {
  /// Creates credentials with both the username and the password present
  pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
    Self {
      username: Some(username.into()),
      password: Some(password.into()),
    }
  }

  /// Creates empty credentials, used when none were supplied
  pub fn absent() -> Self {
    Self::default()
  }

  /// Obtains the username
  pub fn username(&self) -> Option<&str> {
    self.username.as_deref()
  }

  /// Obtains the password
  pub fn password(&self) -> Option<&str> {
    self.password.as_deref()
  }

  /// Checks if any credentials were supplied
  pub fn is_present(&self) -> bool {
    self.username.is_some()
  }

  /// Consumes the credentials and returns the username and the password, if present
  pub fn into_pair(self) -> Option<(String, String)> {
    match (self.username, self.password) {
      (Some(username), Some(password)) => Some((username, password)),
      _ => None,
    }
  }

  /// Builds the "Authorization" header value for these credentials
  pub fn to_header_value(&self) -> Option<String> {
    let username = self.username.as_deref()?;
    let password = self.password.as_deref().unwrap_or("");
    Some(format!(
      "Basic {}",
      general_purpose::STANDARD.encode(format!("{username}:{password}"))
    ))
  }
}

/// Obtains the HTTP Basic authentication credentials for the request.
///
/// A username and a password already parsed by the host server take precedence over
/// the "Authorization" header. The `HTTP_AUTHORIZATION` server variable is consulted
/// when the header itself is missing. A header value that isn't visible ASCII yields
/// absent credentials.
pub fn get_basic_auth_credentials(context: &RequestContext) -> Credentials {
  if let Some(username) = context.server_variable(AUTH_USER_VARIABLE) {
    return Credentials::new(
      username,
      context
        .server_variable(AUTH_PASSWORD_VARIABLE)
        .unwrap_or_default(),
    );
  }

  let authorization = match context.headers().get(header::AUTHORIZATION) {
    Some(header_value) => header_value.to_str().ok(),
    None => context.server_variable(HTTP_AUTHORIZATION_VARIABLE),
  };

  authorization
    .and_then(parse_basic_auth)
    .unwrap_or_default()
}

/// Parses the "Authorization" header value for HTTP Basic authentication.
///
/// The payload must be standard base64 with padding, so an unpadded payload such as
/// `Basic Y2Fyb2w` is rejected even though lenient decoders would accept it.
pub fn parse_basic_auth(auth_str: &str) -> Option<Credentials> {
  let scheme = auth_str.get(..5)?;
  if !scheme.eq_ignore_ascii_case("basic") {
    return None;
  }

  // The scheme is followed by exactly one separator
  let base64_credentials = auth_str.get(6..)?;
  if base64_credentials.is_empty() {
    return None;
  }

  let decoded = general_purpose::STANDARD.decode(base64_credentials).ok()?;
  let decoded_str = String::from_utf8(decoded).ok()?;
  Some(match decoded_str.split_once(':') {
    Some((username, password)) => Credentials::new(username, password),
    None => Credentials::new(decoded_str, ""),
  })
}
