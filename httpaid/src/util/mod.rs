mod anti_xss;
mod quote_realm;

pub use anti_xss::*;
pub use quote_realm::*;
