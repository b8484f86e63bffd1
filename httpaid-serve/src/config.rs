use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use httpaid::{DebugHeaderPolicy, ErrorPage, RedirectPage, ResponderConfig};

/// A redirect for an exact request path
#[derive(Debug, PartialEq)]
pub struct RedirectRule {
  pub from: String,
  pub to: String,
  pub page: RedirectPage,
}

/// A canned error page for an exact request path
#[derive(Debug, PartialEq)]
pub struct StatusRule {
  pub path: String,
  pub page: ErrorPage,
}

/// The server configuration
#[derive(Debug)]
pub struct ServeConfiguration {
  /// The address to listen on
  pub listen: SocketAddr,
  /// The configuration passed to the responder
  pub responder: ResponderConfig,
  /// Whether the debug information is added to generated pages
  pub debug: bool,
  /// Password hashes of the users, keyed by username
  pub users: HashMap<String, String>,
  /// Request path prefixes requiring HTTP Basic authentication
  pub protected_prefixes: Vec<String>,
  /// Configured redirects
  pub redirects: Vec<RedirectRule>,
  /// Configured error pages
  pub status_pages: Vec<StatusRule>,
}

impl Default for ServeConfiguration {
  fn default() -> Self {
    Self {
      listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
      responder: ResponderConfig::default(),
      debug: false,
      users: HashMap::new(),
      protected_prefixes: Vec::new(),
      redirects: Vec::new(),
      status_pages: Vec::new(),
    }
  }
}

/// A value of a configuration entry
#[derive(Clone, Debug, PartialEq)]
enum ConfigurationValue {
  String(String),
  Integer(i128),
  Float,
  Bool(bool),
  Null,
}

impl ConfigurationValue {
  fn as_str(&self) -> Option<&str> {
    match self {
      Self::String(value) => Some(value),
      _ => None,
    }
  }

  fn as_i128(&self) -> Option<i128> {
    match self {
      Self::Integer(value) => Some(*value),
      _ => None,
    }
  }

  fn as_bool(&self) -> Option<bool> {
    match self {
      Self::Bool(value) => Some(*value),
      _ => None,
    }
  }
}

/// A configuration entry, with its arguments and properties
struct ConfigurationEntry {
  name: String,
  values: Vec<ConfigurationValue>,
  props: HashMap<String, ConfigurationValue>,
}

impl ConfigurationEntry {
  fn single_string(&self) -> Result<&str, Box<dyn Error + Send + Sync>> {
    match self.values.as_slice() {
      [value] => value.as_str().ok_or_else(|| {
        anyhow::anyhow!("The `{}` configuration property must be a string", self.name).into()
      }),
      _ => Err(anyhow::anyhow!(
        "The `{}` configuration property must have exactly one value",
        self.name
      ))?,
    }
  }

  fn string_pair(&self) -> Result<(&str, &str), Box<dyn Error + Send + Sync>> {
    match self.values.as_slice() {
      [first, second] => match (first.as_str(), second.as_str()) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => Err(anyhow::anyhow!(
          "The `{}` configuration property values must be strings",
          self.name
        ))?,
      },
      _ => Err(anyhow::anyhow!(
        "The `{}` configuration property must have exactly two values",
        self.name
      ))?,
    }
  }
}

fn kdlite_error_near(pos: usize, file_contents: &str) -> String {
  let part = file_contents
    .split_at_checked(pos)
    .map(|split| split.1.split_at_checked(50).map_or(split.1, |split2| split2.0))
    .and_then(|part| if part.is_empty() { None } else { Some(part) });
  part.map_or("<end or out of bounds>".to_string(), |p| {
    snailquote::escape(p).to_string()
  })
}

fn display_kdlite_error(err: &kdlite::stream::Error, file_contents: &str) -> String {
  match err {
    kdlite::stream::Error::ExpectedString(index) => {
      format!("Expected string near {}", kdlite_error_near(*index, file_contents))
    }
    kdlite::stream::Error::ExpectedValue(index) => {
      format!("Expected value near {}", kdlite_error_near(*index, file_contents))
    }
    kdlite::stream::Error::UnexpectedCloseBracket(index) => {
      format!("Unexpected `}}` near {}", kdlite_error_near(*index, file_contents))
    }
    kdlite::stream::Error::InvalidNumber(index) => {
      format!("Invalid number near {}", kdlite_error_near(*index, file_contents))
    }
    kdlite::stream::Error::BadEscape(index) => format!(
      "Invalid escape sequence near {}",
      kdlite_error_near(*index, file_contents)
    ),
    kdlite::stream::Error::UnexpectedEof => "Unexpected end of file".to_string(),
    _ => "Invalid KDL syntax".to_string(),
  }
}

fn kdl_node_to_configuration_entry(kdl_node: &kdlite::dom::Node) -> ConfigurationEntry {
  let mut values = Vec::new();
  let mut props = HashMap::new();
  for kdl_entry in &kdl_node.entries {
    let value = match &kdl_entry.value {
      kdlite::dom::Value::String(value) => ConfigurationValue::String(value.to_string()),
      kdlite::dom::Value::Integer(value) => ConfigurationValue::Integer(*value),
      kdlite::dom::Value::Float(_) => ConfigurationValue::Float,
      kdlite::dom::Value::Bool(value) => ConfigurationValue::Bool(*value),
      kdlite::dom::Value::Null => ConfigurationValue::Null,
    };
    if let Some(prop_name) = kdl_entry.key() {
      props.insert(prop_name.to_string(), value);
    } else {
      values.push(value);
    }
  }
  if values.is_empty() {
    // A KDL node without arguments means "#true"
    values.push(ConfigurationValue::Bool(true));
  }
  ConfigurationEntry {
    name: kdl_node.name().to_string(),
    values,
    props,
  }
}

/// Parses the server configuration from KDL
pub fn parse_configuration(
  file_contents: &str,
) -> Result<ServeConfiguration, Box<dyn Error + Send + Sync>> {
  let kdl_document = match kdlite::dom::Document::parse(file_contents) {
    Ok(document) => document,
    Err(err) => Err(anyhow::anyhow!(
      "Failed to parse the server configuration file: {}",
      display_kdlite_error(&err, file_contents)
    ))?,
  };

  let mut configuration = ServeConfiguration::default();
  for kdl_node in &kdl_document.nodes {
    if kdl_node.children.is_some() {
      Err(anyhow::anyhow!(
        "The `{}` configuration property can't have children",
        kdl_node.name()
      ))?
    }
    let entry = kdl_node_to_configuration_entry(kdl_node);
    match entry.name.as_str() {
      "listen" => {
        let address = entry.single_string()?;
        configuration.listen = address
          .parse()
          .map_err(|_| anyhow::anyhow!("Invalid listen address \"{}\"", address))?;
      }
      "realm" => configuration.responder.realm = entry.single_string()?.to_string(),
      "signature" => {
        configuration.responder.server_signature = entry.single_string()?.to_string()
      }
      "debug" => {
        configuration.debug = match entry.values.as_slice() {
          [value] => value.as_bool().ok_or_else(|| {
            anyhow::anyhow!("The `debug` configuration property must be boolean")
          })?,
          _ => Err(anyhow::anyhow!(
            "The `debug` configuration property must have exactly one value"
          ))?,
        }
      }
      "debug_headers" => {
        configuration.responder.debug_header_policy =
          entry.single_string()?.parse::<DebugHeaderPolicy>()?
      }
      "user" => {
        let (username, password_hash) = entry.string_pair()?;
        configuration
          .users
          .insert(username.to_string(), password_hash.to_string());
      }
      "protect" => {
        let prefix = entry.single_string()?;
        if !prefix.starts_with('/') {
          Err(anyhow::anyhow!(
            "The protected path prefix \"{}\" must start with a slash",
            prefix
          ))?
        }
        configuration.protected_prefixes.push(prefix.to_string());
      }
      "redirect" => {
        let (from, to) = entry.string_pair()?;
        let status_code = match entry.props.get("status") {
          Some(value) => value.as_i128().ok_or_else(|| {
            anyhow::anyhow!("The redirect status code must be an integer")
          })?,
          None => 303,
        };
        let page = RedirectPage::try_from(u16::try_from(status_code)?)?;
        configuration.redirects.push(RedirectRule {
          from: from.to_string(),
          to: to.to_string(),
          page,
        });
      }
      "status" => {
        let (path, status_code) = match entry.values.as_slice() {
          [path, status_code] => match (path.as_str(), status_code.as_i128()) {
            (Some(path), Some(status_code)) => (path, status_code),
            _ => Err(anyhow::anyhow!(
              "The `status` configuration property must have a path and a status code"
            ))?,
          },
          _ => Err(anyhow::anyhow!(
            "The `status` configuration property must have exactly two values"
          ))?,
        };
        let page = ErrorPage::try_from(u16::try_from(status_code)?)?;
        configuration.status_pages.push(StatusRule {
          path: path.to_string(),
          page,
        });
      }
      unknown => Err(anyhow::anyhow!(
        "Unknown configuration property: \"{}\"",
        unknown
      ))?,
    }
  }

  Ok(configuration)
}

/// Loads the server configuration from a KDL file
pub fn load_configuration(path: &Path) -> Result<ServeConfiguration, Box<dyn Error + Send + Sync>> {
  let file_contents = match fs::read_to_string(path) {
    Ok(file) => file,
    Err(err) => Err(anyhow::anyhow!(
      "Failed to read from the server configuration file at \"{}\": {}",
      path.display(),
      err
    ))?,
  };

  parse_configuration(&file_contents)
}
