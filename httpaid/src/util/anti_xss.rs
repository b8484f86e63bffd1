/// Escapes some characters as HTML entities, preventing XSS vulnerabilities
pub fn anti_xss(input: &str) -> String {
  input
    .replace("&", "&amp;")
    .replace("<", "&lt;")
    .replace(">", "&gt;")
    .replace("\"", "&quot;")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn should_escape_html_special_characters() {
    assert_eq!(
      anti_xss("<a href=\"/?a=1&b=2\">"),
      "&lt;a href=&quot;/?a=1&amp;b=2&quot;&gt;"
    );
  }

  #[test]
  fn should_leave_plain_text_unchanged() {
    assert_eq!(anti_xss("/index.html"), "/index.html");
  }
}
