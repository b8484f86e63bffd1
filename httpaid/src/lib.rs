//! Helpers for the request/response cycle of a web server: HTTP Basic authentication credential
//! extraction, and canned HTML error and redirect pages.
//!
//! ```
//! use httpaid::{ErrorLogger, RequestContext, Responder, ResponderConfig};
//!
//! let responder = Responder::new(ResponderConfig::default(), ErrorLogger::without_logger());
//! let context = RequestContext::new("/private/report.pdf");
//! if !httpaid::get_basic_auth_credentials(&context).is_present() {
//!   let response = responder.error(&context, 401, false);
//!   assert_eq!(response.status().as_u16(), 401);
//! }
//! ```

mod config;
mod context;
mod credentials;
mod logging;
mod pages;
mod responder;
pub mod util;

pub use config::*;
pub use context::*;
pub use credentials::*;
pub use logging::*;
pub use pages::*;
pub use responder::*;
