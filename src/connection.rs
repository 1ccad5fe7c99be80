use thiserror::Error;

/// Errors produced while parsing a connection string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("connection string {0:?} has no scheme")]
    MissingScheme(String),
    #[error("connection string has an empty host")]
    MissingHost,
    #[error("connection string has no port")]
    MissingPort,
    #[error("connection string has invalid port {0:?}")]
    InvalidPort(String),
}

/// Parsed form of a `scheme://host:port?key=value&...` connection string.
///
/// The query string is kept as an ordered list of key/value pairs with
/// case-sensitive keys. Duplicate keys are allowed;
/// [parameter](ConnectionDescriptor::parameter) returns the first
/// occurrence. Immutable once parsed, no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    scheme: String,
    host: String,
    port: u16,
    parameters: Vec<(String, String)>,
}

impl ConnectionDescriptor {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| ParseError::MissingScheme(input.to_string()))?;
        if scheme.is_empty() {
            return Err(ParseError::MissingScheme(input.to_string()));
        }
        let (authority, query) = match rest.split_once('?') {
            Some((authority, query)) => (authority, Some(query)),
            None => (rest, None),
        };
        // Tolerate a trailing path segment, `scheme://host:port/`.
        let authority = match authority.split_once('/') {
            Some((authority, _)) => authority,
            None => authority,
        };
        let (host, port) = authority.rsplit_once(':').ok_or(ParseError::MissingPort)?;
        if host.is_empty() {
            return Err(ParseError::MissingHost);
        }
        let port = match port.parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => return Err(ParseError::InvalidPort(port.to_string())),
        };
        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            parameters: query.map(parse_query).unwrap_or_default(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Look up a query parameter by exact key. The first occurrence wins
    /// when a key repeats.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// All query parameters in document order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// A pair without `=` is a key with an empty value. Values are taken
/// literally, no percent-decoding.
fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}
