/// Quotes the HTTP authentication realm for use in the "WWW-Authenticate" header
pub fn quote_realm(realm: &str) -> String {
  format!("\"{}\"", realm.replace("\\", "\\\\").replace("\"", "\\\""))
}
