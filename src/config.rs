use std::env;
use std::fs;

use derive_more::Display;
use once_cell::sync::OnceCell;

use crate::connection::ConnectionDescriptor;
use crate::error::MetricError;
use crate::line::strip_field_delimiter;

/// Well-known environment variable holding the connection string.
pub const CONNECTION_STRING_ENV: &str = "STATLINE_URL";

/// Required query parameter naming the root namespace segment.
pub const APPLICATION_PARAM: &str = "application";
/// Optional query parameter appended as the second namespace segment.
pub const ENVIRONMENT_PARAM: &str = "environment";
/// Optional boolean query parameter controlling the machine segment.
pub const MACHINE_NAME_FOLDER_PARAM: &str = "usemachinenamefolder";

/// Resolved `host:port` target of the metrics daemon.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display("{host}:{port}")]
pub struct ServerAddress {
    host: String,
    port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Immutable client configuration resolved once at construction.
///
/// The namespace is derived here and never recomputed:
/// `application[.environment][.machine identity]`, with every segment
/// stripped of `:` characters so the namespace can never contain the
/// key/value delimiter.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    application_name: String,
    environment: Option<String>,
    use_machine_name_folder: bool,
    namespace: String,
    server: ServerAddress,
}

impl ClientConfig {
    /// Resolve a parsed connection descriptor into a configuration.
    ///
    /// The only hard failure is a missing or empty `application`
    /// parameter; everything else has a default.
    pub fn resolve(descriptor: &ConnectionDescriptor) -> Result<Self, MetricError> {
        let application_name = match descriptor.parameter(APPLICATION_PARAM) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(MetricError::Configuration(format!(
                    "required parameter {APPLICATION_PARAM:?} is missing"
                )))
            }
        };
        let environment = descriptor
            .parameter(ENVIRONMENT_PARAM)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let use_machine_name_folder = machine_name_folder_flag(descriptor);

        let mut namespace = strip_field_delimiter(&application_name).into_owned();
        if let Some(environment) = &environment {
            namespace.push('.');
            namespace.push_str(&strip_field_delimiter(environment));
        }
        if use_machine_name_folder {
            namespace.push('.');
            namespace.push_str(&strip_field_delimiter(machine_identity()));
        }

        Ok(Self {
            application_name,
            environment,
            use_machine_name_folder,
            namespace,
            server: ServerAddress::new(descriptor.host(), descriptor.port()),
        })
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn use_machine_name_folder(&self) -> bool {
        self.use_machine_name_folder
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn server_address(&self) -> &ServerAddress {
        &self.server
    }
}

/// Key and value are matched case-insensitively; absent or unparsable
/// values keep the default of `true`.
fn machine_name_folder_flag(descriptor: &ConnectionDescriptor) -> bool {
    let value = descriptor
        .parameters()
        .find(|(key, _)| key.eq_ignore_ascii_case(MACHINE_NAME_FOLDER_PARAM))
        .map(|(_, value)| value);
    match value {
        Some(value) if value.eq_ignore_ascii_case("false") => false,
        _ => true,
    }
}

static MACHINE_IDENTITY: OnceCell<String> = OnceCell::new();

/// Local machine identity used as the last namespace segment, resolved
/// once per process. Falls back through `HOSTNAME`, `COMPUTERNAME` and
/// `/etc/hostname` to `"localhost"`.
pub fn machine_identity() -> &'static str {
    MACHINE_IDENTITY.get_or_init(|| {
        env::var("HOSTNAME")
            .or_else(|_| env::var("COMPUTERNAME"))
            .ok()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or_else(|| "localhost".to_string())
    })
}

/// Ambient lookup of the connection string by its well-known name. The
/// client core never reads the environment itself; callers that want the
/// ambient behavior pass this result to the builder.
pub fn connection_string_from_env() -> Option<String> {
    env::var(CONNECTION_STRING_ENV)
        .ok()
        .filter(|value| !value.is_empty())
}
