//! Synthetic answer resolution.
//!
//! A [`Resolver`] answers each question from state built once at start up:
//!
//! * `SOA` and `NS` questions get the zone's SOA record in the authority section, and `NS`
//!   questions one NS answer per configured nameserver (`ns1.<domain>`, `ns2.<domain>`, ...).
//! * `TXT` questions get one answer per matching pair from the [remote TXT source][crate::txt_store].
//! * Every question under the root domain whose prefix is in the [`AddressTable`] gets an `A`
//!   answer: the root address for the apex and `www`, the nameserver addresses for `nsN`.
//! * Every four label question whose first label is a dashed IPv4 address, e.g.
//!   `127-0-0-1.abc.dexih.com`, gets an `A` answer for that address.
//!
//! Each rule runs on its own predicate, so one question can collect answers from several rules.
//! The record type only gates the SOA, NS and TXT rules: the address rules fire for any type.
//!
//! Resolution fails open. An error while resolving is logged and answered with an empty
//! `NOERROR` response.

use crate::config::Config;
use crate::error::Error;
use crate::txt_store::{HttpTxtSource, TxtCache};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::error;
use trust_dns_server::client::op::LowerQuery;
use trust_dns_server::client::rr::{Name, RData, Record, RecordType};

pub mod address;
pub mod authority;
pub mod names;

pub use address::{decode_wildcard, AddressTable};
pub use authority::Authority;

/// Records accumulated for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub answers: Vec<Record>,
    pub authority: Vec<Record>,
    pub additionals: Vec<Record>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.authority.is_empty() && self.additionals.is_empty()
    }
}

pub struct Resolver {
    root: Vec<String>,
    addresses: AddressTable,
    authority: Authority,
    txt: TxtCache,
    ttl: u32,
}

impl Resolver {
    /// Validate `config` and build a resolver using `txt` for TXT questions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an invalid root domain, root or nameserver address,
    /// SOA admin, or TTL, or an empty nameserver list.
    pub fn new(config: &Config, txt: TxtCache) -> Result<Self, Error> {
        let ttl = ttl_secs(config)?;
        let addresses = AddressTable::new(config.root_addr.as_deref(), &config.ns_addrs)?;
        let authority = Authority::new(
            &config.domain,
            config.ns_addrs.len(),
            &config.ns_admin(),
            config.serial()?,
            ttl,
        )?;

        Ok(Resolver {
            root: names::split_hostname(&config.domain),
            addresses,
            authority,
            txt,
            ttl,
        })
    }

    /// Validate `config` and build a resolver whose TXT records come from
    /// [`Config::txt_source_url`], if set.
    ///
    /// # Errors
    ///
    /// As [`Resolver::new`], and [`Error::InvalidConfig`] for a malformed TXT source URL.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let txt = match &config.txt_source_url {
            Some(url) => {
                let source = HttpTxtSource::new(url, config.txt_fetch_timeout)?;
                TxtCache::new(Arc::new(source), ttl_secs(config)?, config.txt_refresh_interval)
            }
            None => TxtCache::disabled(),
        };
        Self::new(config, txt)
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Resolve every question in `queries`, in order.
    ///
    /// Never fails: any error is logged and answered with an empty [`Resolution`]. `cancel`
    /// aborts a wait on the remote TXT source.
    pub async fn resolve(&self, queries: &[LowerQuery], cancel: &CancellationToken) -> Resolution {
        match self.try_resolve(queries, cancel).await {
            Ok(resolution) => resolution,
            Err(error) => {
                error!(?error, ?queries, "resolution failed, answering with an empty response");
                Resolution::default()
            }
        }
    }

    async fn try_resolve(
        &self,
        queries: &[LowerQuery],
        cancel: &CancellationToken,
    ) -> Result<Resolution, Error> {
        let mut resolution = Resolution::default();
        for query in queries {
            self.resolve_query(query, cancel, &mut resolution).await?;
        }
        Ok(resolution)
    }

    async fn resolve_query(
        &self,
        query: &LowerQuery,
        cancel: &CancellationToken,
        resolution: &mut Resolution,
    ) -> Result<(), Error> {
        let name: Name = query.name().into();
        let labels = names::labels(query.name());
        let query_type = query.query_type();

        if matches!(query_type, RecordType::SOA | RecordType::NS) {
            resolution.authority.push(self.authority.soa(&name));
            if query_type == RecordType::NS {
                resolution.answers.extend(self.authority.ns(&name));
            }
        }

        if query_type == RecordType::TXT {
            let txt = self.txt.resolve(&name, &labels, cancel).await?;
            resolution.answers.extend(txt);
        }

        if let Some(ip) = names::match_root(&labels, &self.root)
            .and_then(|key| self.addresses.lookup(&key))
        {
            resolution.answers.push(self.a_record(&name, ip));
        }

        if let Some(ip) = decode_wildcard(&labels) {
            resolution.answers.push(self.a_record(&name, ip));
        }

        Ok(())
    }

    fn a_record(&self, name: &Name, ip: Ipv4Addr) -> Record {
        Record::from_rdata(name.clone(), self.ttl, RData::A(ip))
    }
}

fn ttl_secs(config: &Config) -> Result<u32, Error> {
    let secs = config.ttl.as_secs();
    u32::try_from(secs).map_err(|_| Error::invalid_config("ttl", secs.to_string()))
}
