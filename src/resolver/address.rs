//! Static A records and wildcard address decoding.

use crate::error::Error;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Number of labels in a wildcard query: `<addr>.<salt>.<domain>.<tld>`.
const WILDCARD_LABELS: usize = 4;

/// Subdomain prefix to IPv4 address map, built once from configuration and never mutated.
///
/// The root address (if any) is served for the apex (`""`) and `www`, and the n'th nameserver
/// address for `ns{n}`.
#[derive(Debug, Clone, Default)]
pub struct AddressTable {
    addrs: HashMap<String, Ipv4Addr>,
}

impl AddressTable {
    /// Build the table, or return [`Error::InvalidConfig`] if any address isn't an IPv4 literal
    /// or no nameserver addresses are given.
    pub fn new(root_addr: Option<&str>, ns_addrs: &[String]) -> Result<Self, Error> {
        if ns_addrs.is_empty() {
            return Err(Error::invalid_config("ns_addrs", "[]"));
        }

        let mut addrs = HashMap::with_capacity(ns_addrs.len() + 2);
        if let Some(root_addr) = root_addr {
            let ip = parse_ipv4("root_addr", root_addr)?;
            addrs.insert(String::new(), ip);
            addrs.insert("www".to_string(), ip);
        }
        for (i, ns_addr) in ns_addrs.iter().enumerate() {
            let ip = parse_ipv4("ns_addrs", ns_addr)?;
            addrs.entry(format!("ns{}", i + 1)).or_insert(ip);
        }
        Ok(AddressTable { addrs })
    }

    pub fn lookup(&self, key: &str) -> Option<Ipv4Addr> {
        self.addrs.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }
}

fn parse_ipv4(field: &'static str, value: &str) -> Result<Ipv4Addr, Error> {
    Ipv4Addr::from_str(value.trim()).map_err(|_| Error::invalid_config(field, value))
}

/// Decode the IPv4 address embedded in the first label of a four label query, with dashes
/// standing in for dots: `127-0-0-1.salt.dexih.com` decodes to `127.0.0.1`.
///
/// Any other shape of query, or a first label that doesn't decode, gives `None`.
pub fn decode_wildcard(labels: &[String]) -> Option<Ipv4Addr> {
    if labels.len() != WILDCARD_LABELS {
        return None;
    }
    Ipv4Addr::from_str(&labels[0].replace('-', ".")).ok()
}
