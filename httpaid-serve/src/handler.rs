use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{self, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use password_auth::verify_password;

use httpaid::{
  get_basic_auth_credentials, ErrorLogger, ErrorPage, HyperResponse, RequestContext, Responder,
};

use crate::config::ServeConfiguration;

/// Handles the requests according to the server configuration
pub struct RequestHandler {
  configuration: Arc<ServeConfiguration>,
  responder: Responder,
  error_logger: ErrorLogger,
}

impl RequestHandler {
  /// Creates a new request handler
  pub fn new(configuration: Arc<ServeConfiguration>, error_logger: ErrorLogger) -> Self {
    Self {
      responder: Responder::new(configuration.responder.clone(), error_logger.clone()),
      configuration,
      error_logger,
    }
  }

  /// Handles the incoming request
  pub async fn handle<B>(&self, request: Request<B>) -> HyperResponse {
    let context = RequestContext::from_request(&request);
    let debug = self.configuration.debug;

    if request.method() != Method::GET && request.method() != Method::HEAD {
      let mut response = self
        .responder
        .error_page(&context, ErrorPage::MethodNotAllowed, debug)
        .into_response();
      response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
      return response;
    }

    let request_path = request.uri().path();

    if let Some(status_rule) = self
      .configuration
      .status_pages
      .iter()
      .find(|status_rule| status_rule.path == request_path)
    {
      return self
        .responder
        .error_page(&context, status_rule.page, debug)
        .into_response();
    }

    if let Some(redirect_rule) = self
      .configuration
      .redirects
      .iter()
      .find(|redirect_rule| redirect_rule.from == request_path)
    {
      return self
        .responder
        .redirect_page(&context, redirect_rule.page, &redirect_rule.to, debug)
        .into_response();
    }

    if self
      .configuration
      .protected_prefixes
      .iter()
      .any(|prefix| request_path.starts_with(prefix.as_str()))
    {
      return match self.authenticate(&context).await {
        Ok(Some(username)) => Response::builder()
          .status(StatusCode::OK)
          .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
          .body(
            Full::new(Bytes::from(format!("Authenticated as {username}\n")))
              .map_err(|e| match e {})
              .boxed(),
          )
          .unwrap_or_default(),
        Ok(None) => self
          .responder
          .error_page(&context, ErrorPage::Unauthorized, debug)
          .into_response(),
        Err(err) => {
          self
            .error_logger
            .log(&format!("Can't verify the credentials: {err}"));
          self
            .responder
            .error_page(&context, ErrorPage::InternalServerError, debug)
            .into_response()
        }
      };
    }

    self
      .responder
      .error_page(&context, ErrorPage::NotFound, debug)
      .into_response()
  }

  /// Checks the supplied credentials, returning the authenticated username
  async fn authenticate(&self, context: &RequestContext) -> Result<Option<String>, anyhow::Error> {
    let Some((username, password)) = get_basic_auth_credentials(context).into_pair() else {
      return Ok(None);
    };
    let Some(password_hash) = self.configuration.users.get(&username).cloned() else {
      self.error_logger.log(&format!(
        "Authorization failed for unknown user \"{}\"",
        username.escape_default()
      ));
      return Ok(None);
    };

    // Offload verifying the hash into a separate blocking thread.
    let password_valid =
      tokio::task::spawn_blocking(move || verify_password(password, &password_hash).is_ok())
        .await
        .map_err(|_| anyhow::anyhow!("Can't spawn a blocking task to verify the password"))?;

    if password_valid {
      Ok(Some(username))
    } else {
      self.error_logger.log(&format!(
        "Authorization failed for user \"{}\"",
        username.escape_default()
      ));
      Ok(None)
    }
  }
}
