use std::fmt;

use hyper::StatusCode;

use crate::util::anti_xss;

/// The request URI placeholder in page bodies
const REQUEST_URI_PLACEHOLDER: &str = "{request_uri}";

/// The redirect destination placeholder in page bodies
const LOCATION_PLACEHOLDER: &str = "{location}";

/// A canned page definition
pub struct PageDefinition {
  /// The status code of the page
  pub status_code: StatusCode,
  /// The page title, also used as the heading
  pub title: &'static str,
  /// The page description, possibly containing placeholders
  pub description: &'static str,
}

/// Canned error pages
pub static ERROR_PAGES: &[PageDefinition] = &[
  PageDefinition {
    status_code: StatusCode::UNAUTHORIZED,
    title: "Unauthorized",
    description: "This server could not verify that you are authorized to access the document requested. Either you supplied the wrong credentials (e.g., bad password), or your browser doesn't understand how to supply the credentials required.",
  },
  PageDefinition {
    status_code: StatusCode::FORBIDDEN,
    title: "Forbidden",
    description: "You don't have permission to access {request_uri} on this server.",
  },
  PageDefinition {
    status_code: StatusCode::NOT_FOUND,
    title: "Not Found",
    description: "The requested URL {request_uri} was not found on this server.",
  },
  PageDefinition {
    status_code: StatusCode::METHOD_NOT_ALLOWED,
    title: "Method Not Allowed",
    description: "The method specified in the Request-Line is not allowed for the resource identified by the Request-URI.",
  },
  PageDefinition {
    status_code: StatusCode::INTERNAL_SERVER_ERROR,
    title: "Internal Server Error",
    description: "The server encountered an internal error or misconfiguration and was unable to complete your request.",
  },
  PageDefinition {
    status_code: StatusCode::SERVICE_UNAVAILABLE,
    title: "Service Unavailable",
    description: "The server is currently unable to handle the request due to a temporary condition of the server.",
  },
];

/// Canned redirect pages
pub static REDIRECT_PAGES: &[PageDefinition] = &[
  PageDefinition {
    status_code: StatusCode::MOVED_PERMANENTLY,
    title: "Moved Permanently",
    description: "The document has moved <a href=\"{location}\">here</a>.",
  },
  PageDefinition {
    status_code: StatusCode::SEE_OTHER,
    title: "See Other",
    description: "The answer to your request is located <a href=\"{location}\">here</a>.",
  },
];

/// An error status with a canned page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorPage {
  Unauthorized,
  Forbidden,
  NotFound,
  MethodNotAllowed,
  InternalServerError,
  ServiceUnavailable,
}

impl ErrorPage {
  /// All the supported error pages
  pub const ALL: [ErrorPage; 6] = [
    ErrorPage::Unauthorized,
    ErrorPage::Forbidden,
    ErrorPage::NotFound,
    ErrorPage::MethodNotAllowed,
    ErrorPage::InternalServerError,
    ErrorPage::ServiceUnavailable,
  ];

  /// Obtains the page definition
  pub fn definition(self) -> &'static PageDefinition {
    &ERROR_PAGES[self as usize]
  }

  /// Obtains the status code
  pub fn status_code(self) -> StatusCode {
    self.definition().status_code
  }

  /// Renders the page description for the specified request URI
  pub fn description(self, request_uri: &str) -> String {
    self
      .definition()
      .description
      .replace(REQUEST_URI_PLACEHOLDER, &anti_xss(request_uri))
  }
}

impl TryFrom<u16> for ErrorPage {
  type Error = anyhow::Error;

  fn try_from(status_code: u16) -> Result<Self, Self::Error> {
    ErrorPage::ALL
      .into_iter()
      .find(|page| page.status_code().as_u16() == status_code)
      .ok_or_else(|| {
        anyhow::anyhow!(
          "Invalid HTTP error code {}, valid error codes are: 401 (Unauthorized), 403 (Forbidden), 404 (Not Found), 405 (Method Not Allowed), 500 (Internal Server Error) and 503 (Service Unavailable)",
          status_code
        )
      })
  }
}

impl fmt::Display for ErrorPage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let definition = self.definition();
    write!(f, "{} {}", definition.status_code.as_u16(), definition.title)
  }
}

/// A redirect status with a canned page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RedirectPage {
  MovedPermanently,
  SeeOther,
}

impl RedirectPage {
  /// All the supported redirect pages
  pub const ALL: [RedirectPage; 2] = [RedirectPage::MovedPermanently, RedirectPage::SeeOther];

  /// Obtains the page definition
  pub fn definition(self) -> &'static PageDefinition {
    &REDIRECT_PAGES[self as usize]
  }

  /// Obtains the status code
  pub fn status_code(self) -> StatusCode {
    self.definition().status_code
  }

  /// Renders the page description linking to the specified location
  pub fn description(self, location: &str) -> String {
    self
      .definition()
      .description
      .replace(LOCATION_PLACEHOLDER, &anti_xss(location))
  }
}

impl TryFrom<u16> for RedirectPage {
  type Error = anyhow::Error;

  fn try_from(status_code: u16) -> Result<Self, Self::Error> {
    RedirectPage::ALL
      .into_iter()
      .find(|page| page.status_code().as_u16() == status_code)
      .ok_or_else(|| {
        anyhow::anyhow!(
          "Invalid HTTP redirect code {}, valid redirect codes are: 301 (Moved Permanently) and 303 (See Other)",
          status_code
        )
      })
  }
}

impl fmt::Display for RedirectPage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let definition = self.definition();
    write!(f, "{} {}", definition.status_code.as_u16(), definition.title)
  }
}

/// Generates a canned HTML page.
///
/// The description and the server signature are inserted as-is, so they must be already escaped.
pub fn generate_page(
  definition: &PageDefinition,
  description: &str,
  debug_info: Option<&str>,
  server_signature: &str,
) -> String {
  format!(
    "<!DOCTYPE html PUBLIC \"-//IETF//DTD HTML 2.0//EN\">
<html><head>
<title>{} {}</title>
</head><body>
<h1>{}</h1>
{}<p>{}</p>
<hr>
{}
</body></html>
",
    definition.status_code.as_u16(),
    definition.title,
    definition.title,
    debug_info.unwrap_or(""),
    description,
    server_signature
  )
}
