//! Error types.

use trust_dns_server::proto::error::ProtoError;

/// Error enumerates the possible wildcard DNS error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when constructing a [`Resolver`][crate::resolver::Resolver] from a
    /// [`Config`][crate::config::Config] holding a value that can't be used: an unparseable IPv4
    /// address, an empty nameserver list, a root domain or SOA admin that isn't a valid hostname,
    /// an out of range TTL or a malformed TXT source URL.
    #[error("invalid configuration: {field} = \"{value}\"")]
    InvalidConfig { field: &'static str, value: String },

    /// Returned by [`HttpTxtSource`][crate::txt_store::HttpTxtSource] when the remote TXT
    /// source answers with a non-success HTTP status.
    #[error("TXT source responded with HTTP {0}")]
    TxtStatus(reqwest::StatusCode),

    /// Returned by [`HttpTxtSource`][crate::txt_store::HttpTxtSource] when the remote TXT
    /// source can't be reached, times out, or returns a body that isn't the expected JSON.
    #[error("TXT source fetch failed")]
    TxtFetch(#[from] reqwest::Error),

    /// Returned when a resolution is cancelled while waiting on the remote TXT source.
    #[error("resolution cancelled")]
    Cancelled,

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when [trying to load a `Config`][crate::config::Config::try_from_file] fails
    /// due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the DNS server encounters a generic DNS protocol error.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),
}

impl Error {
    pub(crate) fn invalid_config(field: &'static str, value: impl Into<String>) -> Self {
        Error::InvalidConfig {
            field,
            value: value.into(),
        }
    }
}
