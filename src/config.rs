use crate::error::Error;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use time::macros::format_description;
use time::OffsetDateTime;

pub type SharedConfig = Arc<Config>;

/// Service configuration, loaded from a JSON file.
///
/// Values are kept as they were written so that [`Resolver::new`][crate::resolver::Resolver::new]
/// can report the offending field and value when one of them doesn't validate.
#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub domain: String,
    #[serde(default)]
    pub root_addr: Option<String>,
    pub ns_addrs: Vec<String>,
    pub ns_admin: String,
    #[serde(default)]
    pub serial: Option<u32>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_ttl")]
    pub ttl: Duration,
    #[serde(default)]
    pub txt_source_url: Option<String>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_timeout")]
    pub txt_fetch_timeout: Duration,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    pub txt_refresh_interval: Option<Duration>,
    #[serde(default = "Config::default_bind_addr")]
    pub dns_udp_bind_addr: SocketAddr,
    #[serde(default = "Config::default_bind_addr")]
    pub dns_tcp_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "Config::default_timeout")]
    pub dns_tcp_timeout: Duration,
    #[serde(default = "Config::default_log_requests")]
    pub log_requests: bool,
}

lazy_static! {
    static ref SERIAL_FORMATTER: &'static [time::format_description::FormatItem<'static>] =
        format_description!(version = 2, "[year][month][day]00");
}

impl Default for Config {
    fn default() -> Self {
        Config {
            domain: String::default(),
            root_addr: None,
            ns_addrs: Vec::default(),
            ns_admin: String::default(),
            serial: None,
            ttl: Self::default_ttl(),
            txt_source_url: None,
            txt_fetch_timeout: Self::default_timeout(),
            txt_refresh_interval: None,
            dns_udp_bind_addr: Self::default_bind_addr(),
            dns_tcp_bind_addr: Self::default_bind_addr(),
            dns_tcp_timeout: Self::default_timeout(),
            log_requests: Self::default_log_requests(),
        }
    }
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        Ok(conf)
    }

    /// The SOA responsible-party mailbox in domain name form, e.g. `dns-admin@example.com`
    /// becomes `dns-admin.example.com`. Every `@` is replaced; values without one are returned as
    /// written.
    pub fn ns_admin(&self) -> Cow<str> {
        if self.ns_admin.contains('@') {
            Cow::Owned(self.ns_admin.replace('@', "."))
        } else {
            Cow::Borrowed(&self.ns_admin)
        }
    }

    /// The configured SOA serial, or today's UTC date as `YYYYMMDD00`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if today's date can't be rendered as a serial.
    pub fn serial(&self) -> Result<u32, Error> {
        match self.serial {
            Some(serial) => Ok(serial),
            None => {
                let today = OffsetDateTime::now_utc()
                    .format(&SERIAL_FORMATTER)
                    .map_err(|err| Error::invalid_config("serial", err.to_string()))?;
                today
                    .parse()
                    .map_err(|_| Error::invalid_config("serial", today))
            }
        }
    }

    fn default_ttl() -> Duration {
        Duration::from_secs(300)
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(10)
    }

    fn default_bind_addr() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 53))
    }

    fn default_log_requests() -> bool {
        true
    }
}
