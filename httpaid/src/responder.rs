use std::panic::Location;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};

use crate::config::{DebugHeaderPolicy, ResponderConfig};
use crate::context::{RequestContext, TerminalResponse};
use crate::logging::ErrorLogger;
use crate::pages::{generate_page, ErrorPage, PageDefinition, RedirectPage};
use crate::util::quote_realm;

/// Emits canned error and redirect pages.
///
/// Every response produced by the responder is terminal: the caller sends it and stops
/// processing the request.
pub struct Responder {
  config: ResponderConfig,
  error_logger: ErrorLogger,
}

impl Responder {
  /// Creates a new responder
  pub fn new(config: ResponderConfig, error_logger: ErrorLogger) -> Self {
    Self {
      config,
      error_logger,
    }
  }

  /// Obtains the responder configuration
  pub fn config(&self) -> &ResponderConfig {
    &self.config
  }

  /// Emits an error page for the status code.
  ///
  /// An unsupported status code is logged, and the "500 Internal Server Error" page is emitted
  /// instead.
  #[track_caller]
  pub fn error(&self, context: &RequestContext, status_code: u16, debug: bool) -> TerminalResponse {
    match ErrorPage::try_from(status_code) {
      Ok(page) => self.error_page(context, page, debug),
      Err(err) => self.internal_error(context, "Responder::error", &err.to_string(), debug),
    }
  }

  /// Emits an error page
  #[track_caller]
  pub fn error_page(
    &self,
    context: &RequestContext,
    page: ErrorPage,
    debug: bool,
  ) -> TerminalResponse {
    let caller = Location::caller();
    let debug_info = debug.then(|| debug_info("Responder::error", caller));
    let mut response_builder = Response::builder();
    if self.should_set_headers(debug) {
      response_builder = response_builder.status(page.status_code());
      if page == ErrorPage::Unauthorized {
        response_builder = response_builder.header(
          header::WWW_AUTHENTICATE,
          format!("Basic realm={}", quote_realm(&self.config.realm)),
        );
      }
    }

    let description = page.description(context.request_uri());
    self.build(
      context,
      response_builder,
      page.definition(),
      &description,
      debug_info.as_deref(),
    )
  }

  /// Emits a redirect page for the status code.
  ///
  /// An unsupported status code or a redirect URI unusable as the "Location" header value is
  /// logged, and the "500 Internal Server Error" page is emitted instead.
  #[track_caller]
  pub fn redirect(
    &self,
    context: &RequestContext,
    status_code: u16,
    redirect_uri: &str,
    debug: bool,
  ) -> TerminalResponse {
    match RedirectPage::try_from(status_code) {
      Ok(page) => self.redirect_page(context, page, redirect_uri, debug),
      Err(err) => self.internal_error(context, "Responder::redirect", &err.to_string(), debug),
    }
  }

  /// Emits a redirect page
  #[track_caller]
  pub fn redirect_page(
    &self,
    context: &RequestContext,
    page: RedirectPage,
    redirect_uri: &str,
    debug: bool,
  ) -> TerminalResponse {
    let caller = Location::caller();
    let debug_info = debug.then(|| debug_info("Responder::redirect", caller));
    let mut response_builder = Response::builder();
    if self.should_set_headers(debug) {
      let location = match HeaderValue::from_str(redirect_uri) {
        Ok(location) => location,
        Err(err) => {
          return self.internal_error(
            context,
            "Responder::redirect",
            &format!("Invalid redirect URI \"{}\": {}", redirect_uri.escape_default(), err),
            debug,
          );
        }
      };
      response_builder = response_builder
        .status(page.status_code())
        .header(header::LOCATION, location);
    }

    let description = page.description(redirect_uri);
    self.build(
      context,
      response_builder,
      page.definition(),
      &description,
      debug_info.as_deref(),
    )
  }

  /// Logs the message and emits the "500 Internal Server Error" page on behalf of `function_name`
  #[track_caller]
  fn internal_error(
    &self,
    context: &RequestContext,
    function_name: &str,
    message: &str,
    debug: bool,
  ) -> TerminalResponse {
    let caller = Location::caller();
    self.error_logger.log(&format!(
      "{} (called from {} on line {})",
      message,
      caller.file(),
      caller.line()
    ));
    // The fallback carries the 500 status regardless of the debug header policy
    let page = ErrorPage::InternalServerError;
    let debug_info = debug.then(|| debug_info(function_name, caller));
    let response_builder = Response::builder().status(page.status_code());
    let description = page.description(context.request_uri());
    self.build(
      context,
      response_builder,
      page.definition(),
      &description,
      debug_info.as_deref(),
    )
  }

  fn should_set_headers(&self, debug: bool) -> bool {
    !debug || self.config.debug_header_policy == DebugHeaderPolicy::Augment
  }

  fn build(
    &self,
    context: &RequestContext,
    response_builder: hyper::http::response::Builder,
    definition: &PageDefinition,
    description: &str,
    debug_info: Option<&str>,
  ) -> TerminalResponse {
    let server_signature = context
      .server_signature()
      .unwrap_or(self.config.server_signature.as_str());
    let body = generate_page(definition, description, debug_info, server_signature);
    let response = response_builder
      .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
      .header(header::CONTENT_LENGTH, body.len())
      .body(Full::new(Bytes::from(body)).map_err(|e| match e {}).boxed())
      .unwrap_or_else(|err| {
        self
          .error_logger
          .log(&format!("Can't build the response: {err}"));
        let mut response = Response::default();
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
      });
    TerminalResponse::new(response)
  }
}

fn debug_info(function_name: &str, caller: &Location<'_>) -> String {
  format!(
    "<pre>Debug info: {}() called from {} on line {}.</pre>\n",
    function_name,
    caller.file(),
    caller.line()
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use anyhow::Result;

  async fn body_string(response: TerminalResponse) -> Result<String> {
    let body = response.into_response().into_body().collect().await?.to_bytes();
    Ok(String::from_utf8(body.to_vec())?)
  }

  fn responder_with_policy(policy: DebugHeaderPolicy) -> Responder {
    Responder::new(
      ResponderConfig {
        debug_header_policy: policy,
        ..Default::default()
      },
      ErrorLogger::without_logger(),
    )
  }

  #[tokio::test]
  async fn should_emit_error_pages_with_matching_status() -> Result<()> {
    let responder = Responder::new(ResponderConfig::default(), ErrorLogger::without_logger());
    let context = RequestContext::new("/missing.html");
    for page in ErrorPage::ALL {
      let response = responder.error(&context, page.status_code().as_u16(), false);
      assert_eq!(response.status(), page.status_code());
      assert_eq!(
        response.headers().get(header::CONTENT_TYPE),
        Some(&HeaderValue::from_static("text/html; charset=utf-8"))
      );
      let body = body_string(response).await?;
      assert!(body.contains(&format!("<title>{page}</title>")));
      assert!(body.contains(&format!("<h1>{}</h1>", page.definition().title)));
      assert!(!body.contains("Debug info"));
    }
    Ok(())
  }

  #[test]
  fn should_send_the_basic_challenge_only_with_401() {
    let responder = Responder::new(ResponderConfig::default(), ErrorLogger::without_logger());
    let context = RequestContext::new("/");
    for page in ErrorPage::ALL {
      let response = responder.error_page(&context, page, false);
      let challenge = response.headers().get(header::WWW_AUTHENTICATE);
      if page == ErrorPage::Unauthorized {
        assert_eq!(
          challenge,
          Some(&HeaderValue::from_static("Basic realm=\"Auth Required\""))
        );
      } else {
        assert!(challenge.is_none());
      }
    }
  }

  #[test]
  fn should_use_the_configured_realm() {
    let responder = Responder::new(
      ResponderConfig {
        realm: "Staff \"only\"".to_string(),
        ..Default::default()
      },
      ErrorLogger::without_logger(),
    );
    let response = responder.error(&RequestContext::new("/"), 401, false);
    assert_eq!(
      response.headers().get(header::WWW_AUTHENTICATE),
      Some(&HeaderValue::from_static("Basic realm=\"Staff \\\"only\\\"\""))
    );
  }

  #[tokio::test]
  async fn should_emit_redirect_pages_with_location() -> Result<()> {
    let responder = Responder::new(ResponderConfig::default(), ErrorLogger::without_logger());
    let context = RequestContext::new("/old");
    for page in RedirectPage::ALL {
      let response = responder.redirect(&context, page.status_code().as_u16(), "/new?a=b", false);
      assert_eq!(response.status(), page.status_code());
      assert_eq!(
        response.headers().get(header::LOCATION),
        Some(&HeaderValue::from_static("/new?a=b"))
      );
      let body = body_string(response).await?;
      assert!(body.contains("<a href=\"/new?a=b\">here</a>"));
    }
    Ok(())
  }

  #[tokio::test]
  async fn should_fall_back_to_500_for_unsupported_error_codes() -> Result<()> {
    let (tx, rx) = async_channel::unbounded();
    let responder = Responder::new(ResponderConfig::default(), ErrorLogger::new(tx));
    let response = responder.error(&RequestContext::new("/"), 999, false);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let (message, is_error) = rx.try_recv()?.get_message();
    assert!(message.contains("Invalid HTTP error code 999"));
    assert!(message.contains(file!()));
    assert!(is_error);
    assert!(body_string(response).await?.contains("<h1>Internal Server Error</h1>"));
    Ok(())
  }

  #[test]
  fn should_fall_back_to_500_for_unsupported_redirect_codes() -> Result<()> {
    let (tx, rx) = async_channel::unbounded();
    let responder = Responder::new(ResponderConfig::default(), ErrorLogger::new(tx));
    let response = responder.redirect(&RequestContext::new("/"), 302, "/elsewhere", false);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert!(rx.try_recv()?.get_message().0.contains("Invalid HTTP redirect code 302"));
    Ok(())
  }

  #[test]
  fn should_reject_redirect_uris_with_control_characters() -> Result<()> {
    let (tx, rx) = async_channel::unbounded();
    let responder = Responder::new(ResponderConfig::default(), ErrorLogger::new(tx));
    let response = responder.redirect(
      &RequestContext::new("/"),
      303,
      "/next\r\nSet-Cookie: a=b",
      false,
    );

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(rx.try_recv()?.get_message().0.contains("Invalid redirect URI"));
    Ok(())
  }

  #[tokio::test]
  async fn should_escape_the_redirect_uri_in_the_body() -> Result<()> {
    let responder = Responder::new(ResponderConfig::default(), ErrorLogger::without_logger());
    let response = responder.redirect(
      &RequestContext::new("/"),
      301,
      "/x\"><script>alert(1)</script>",
      false,
    );
    let body = body_string(response).await?;
    assert!(!body.contains("<script>"));
    assert!(body.contains("/x&quot;&gt;&lt;script&gt;alert(1)&lt;/script&gt;"));
    Ok(())
  }

  #[tokio::test]
  async fn should_augment_headers_in_debug_mode_by_default() -> Result<()> {
    let responder = responder_with_policy(DebugHeaderPolicy::Augment);
    let line = line!() + 1;
    let response = responder.error(&RequestContext::new("/"), 401, true);

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    let body = body_string(response).await?;
    assert!(body.contains(&format!(
      "<pre>Debug info: Responder::error() called from {} on line {}.</pre>",
      file!(),
      line
    )));
    Ok(())
  }

  #[tokio::test]
  async fn should_suppress_headers_in_debug_mode_when_configured() -> Result<()> {
    let responder = responder_with_policy(DebugHeaderPolicy::Suppress);
    let context = RequestContext::new("/");

    let line = line!() + 1;
    let response = responder.error(&context, 404, true);
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await?;
    assert!(body.contains(&format!("called from {} on line {}.", file!(), line)));
    assert!(body.contains("<h1>Not Found</h1>"));

    let line = line!() + 1;
    let response = responder.redirect(&context, 303, "/next", true);
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::LOCATION).is_none());
    let body = body_string(response).await?;
    assert!(body.contains(&format!(
      "<pre>Debug info: Responder::redirect() called from {} on line {}.</pre>",
      file!(),
      line
    )));
    Ok(())
  }

  #[test]
  fn should_keep_the_500_status_for_invalid_codes_even_when_suppressing() {
    let responder = responder_with_policy(DebugHeaderPolicy::Suppress);
    let response = responder.error(&RequestContext::new("/"), 999, true);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[tokio::test]
  async fn should_name_the_called_function_in_the_fallback_debug_line() -> Result<()> {
    let responder = responder_with_policy(DebugHeaderPolicy::Augment);
    let context = RequestContext::new("/");

    let line = line!() + 1;
    let response = responder.redirect(&context, 302, "/x", true);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await?;
    assert!(body.contains(&format!(
      "Responder::redirect() called from {} on line {}.",
      file!(),
      line
    )));

    let response = responder.redirect(&context, 301, "/x\n", true);
    assert!(body_string(response)
      .await?
      .contains("Responder::redirect() called from"));

    let response = responder.error(&context, 302, true);
    assert!(body_string(response)
      .await?
      .contains("Responder::error() called from"));
    Ok(())
  }

  #[tokio::test]
  async fn should_prefer_the_request_server_signature() -> Result<()> {
    let responder = Responder::new(
      ResponderConfig {
        server_signature: "<address>Configured</address>".to_string(),
        ..Default::default()
      },
      ErrorLogger::without_logger(),
    );

    let body = body_string(responder.error(&RequestContext::new("/"), 503, false)).await?;
    assert!(body.contains("<hr>\n<address>Configured</address>\n</body></html>"));

    let context = RequestContext::new("/").with_server_signature("<address>Host</address>");
    let body = body_string(responder.error(&context, 503, false)).await?;
    assert!(body.contains("<hr>\n<address>Host</address>\n</body></html>"));
    Ok(())
  }

  #[test]
  fn should_set_the_content_length() {
    let responder = Responder::new(ResponderConfig::default(), ErrorLogger::without_logger());
    let response = responder.error(&RequestContext::new("/"), 500, false);
    let content_length = response
      .headers()
      .get(header::CONTENT_LENGTH)
      .and_then(|value| value.to_str().ok())
      .and_then(|value| value.parse::<usize>().ok());
    assert!(content_length.is_some_and(|length| length > 0));
  }
}
