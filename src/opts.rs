use std::sync::Arc;

use smart_default::SmartDefault;

use crate::constant::{CAPABILITIES_DEFAULT, CapabilityFlags};
use crate::error::Error;
use crate::pool::{GLOBAL_ROWS_POOL, RowsPool};

/// A configuration for connection
///
/// ```rs
/// let mut opts1 = Opts::default();
/// opts1.columns_with_alias = true;
///
/// let opts2 = Opts::try_from("mysql://localhost/db?deprecateEof=true");
/// ```
#[derive(Debug, Clone, SmartDefault)]
pub struct Opts {
    /// Capabilities negotiated by the handshake that produced the transport.
    /// Only `CLIENT_DEPRECATE_EOF` changes how result sets are read.
    #[default(CAPABILITIES_DEFAULT)]
    pub capabilities: CapabilityFlags,

    /// Report columns as `table.name` instead of `name`
    pub columns_with_alias: bool,

    /// Largest command payload the connection will send
    #[default(64 << 20)]
    pub max_allowed_packet: usize,

    /// Where result set state and column buffers are recycled
    #[default(Arc::clone(&GLOBAL_ROWS_POOL))]
    pub pool: Arc<RowsPool>,
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Error> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::BadConfigError(format!(
            "Invalid boolean '{}' for '{}'",
            value, key
        ))),
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::BadConfigError(format!("Failed to parse MySQL URL: {}", e)))?;

        if parsed.scheme() != "mysql" {
            return Err(Error::BadConfigError(format!(
                "Invalid URL scheme '{}', expected 'mysql'",
                parsed.scheme()
            )));
        }

        let mut opts = Self::default();
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "columnsWithAlias" => opts.columns_with_alias = parse_bool(&key, &value)?,
                "maxAllowedPacket" => {
                    opts.max_allowed_packet = value.parse().map_err(|e| {
                        Error::BadConfigError(format!(
                            "Invalid maxAllowedPacket '{}': {}",
                            value, e
                        ))
                    })?;
                }
                "deprecateEof" => {
                    opts.capabilities.set(
                        CapabilityFlags::CLIENT_DEPRECATE_EOF,
                        parse_bool(&key, &value)?,
                    );
                }
                _ => {
                    return Err(Error::BadConfigError(format!(
                        "Unknown connection parameter '{}'",
                        key
                    )));
                }
            }
        }
        Ok(opts)
    }
}

impl TryFrom<&String> for Opts {
    type Error = Error;

    fn try_from(url: &String) -> Result<Self, Self::Error> {
        Self::try_from(url.as_str())
    }
}
