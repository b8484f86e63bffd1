use std::collections::HashMap;

use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Request, Response, StatusCode};

/// The server variable holding a username already parsed by the host server
pub const AUTH_USER_VARIABLE: &str = "AUTH_USER";

/// The server variable holding a password already parsed by the host server
pub const AUTH_PASSWORD_VARIABLE: &str = "AUTH_PASSWORD";

/// The server variable carrying the raw "Authorization" header value
pub const HTTP_AUTHORIZATION_VARIABLE: &str = "HTTP_AUTHORIZATION";

/// Represents the HTTP response produced by the helpers
pub type HyperResponse = Response<BoxBody<Bytes, std::io::Error>>;

/// Read-only data about the request being processed
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
  request_uri: String,
  headers: HeaderMap,
  server_variables: HashMap<String, String>,
  server_signature: Option<String>,
}

impl RequestContext {
  /// Creates a new `RequestContext` for the specified request URI (path and query)
  pub fn new(request_uri: impl Into<String>) -> Self {
    Self {
      request_uri: request_uri.into(),
      ..Default::default()
    }
  }

  /// Creates a new `RequestContext` from the request URI and the headers of a Hyper request
  pub fn from_request<B>(request: &Request<B>) -> Self {
    let request_uri = request
      .uri()
      .path_and_query()
      .map(|path_and_query| path_and_query.as_str())
      .unwrap_or("/");
    Self {
      request_uri: request_uri.to_string(),
      headers: request.headers().clone(),
      ..Default::default()
    }
  }

  /// Adds a request header
  pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
    self.headers.append(name, value);
    self
  }

  /// Sets a server variable (for example `AUTH_USER` or `HTTP_AUTHORIZATION`)
  pub fn with_server_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.server_variables.insert(name.into(), value.into());
    self
  }

  /// Sets the server signature appended to generated pages
  pub fn with_server_signature(mut self, server_signature: impl Into<String>) -> Self {
    self.server_signature = Some(server_signature.into());
    self
  }

  /// Obtains the request URI
  pub fn request_uri(&self) -> &str {
    &self.request_uri
  }

  /// Obtains the request headers
  pub fn headers(&self) -> &HeaderMap {
    &self.headers
  }

  /// Obtains a server variable
  pub fn server_variable(&self, name: &str) -> Option<&str> {
    self.server_variables.get(name).map(|value| value.as_str())
  }

  /// Obtains the server signature set for this request, if any
  pub fn server_signature(&self) -> Option<&str> {
    self.server_signature.as_deref()
  }
}

/// A response that completes the request.
///
/// Nothing else should be written for the request once this response is produced.
#[must_use = "the response must be sent to the client, and the request processing must stop"]
pub struct TerminalResponse {
  response: HyperResponse,
}

impl TerminalResponse {
  pub(crate) fn new(response: HyperResponse) -> Self {
    Self { response }
  }

  /// Obtains the response status code
  pub fn status(&self) -> StatusCode {
    self.response.status()
  }

  /// Obtains the response headers
  pub fn headers(&self) -> &HeaderMap {
    self.response.headers()
  }

  /// Consumes the `TerminalResponse` and returns the Hyper response to send
  pub fn into_response(self) -> HyperResponse {
    self.response
  }
}

impl From<TerminalResponse> for HyperResponse {
  fn from(terminal_response: TerminalResponse) -> Self {
    terminal_response.into_response()
  }
}
