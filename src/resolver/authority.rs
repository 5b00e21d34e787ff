//! SOA and NS record synthesis.

use crate::error::Error;
use crate::resolver::names;
use trust_dns_proto::rr::rdata::SOA;
use trust_dns_server::client::rr::{Name, RData, Record};

/// Fixed authority parameters for the zone: the nameserver domains `ns1.<domain>`,
/// `ns2.<domain>`, ..., the responsible-party mailbox, the serial and the TTL used for every SOA
/// interval.
#[derive(Debug, Clone)]
pub struct Authority {
    ns_domains: Vec<Name>,
    admin: Name,
    serial: u32,
    ttl: u32,
    interval: i32,
}

impl Authority {
    /// Build the authority for `domain` with `ns_count` nameservers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `domain` or `admin` isn't a valid hostname, `ttl` is
    /// zero or doesn't fit an SOA interval, or there are no nameservers.
    pub fn new(
        domain: &str,
        ns_count: usize,
        admin: &str,
        serial: u32,
        ttl: u32,
    ) -> Result<Self, Error> {
        if ns_count == 0 {
            return Err(Error::invalid_config("ns_addrs", "[]"));
        }
        let interval = i32::try_from(ttl)
            .ok()
            .filter(|interval| *interval > 0)
            .ok_or_else(|| Error::invalid_config("ttl", ttl.to_string()))?;
        names::fqdn("domain", domain)?;
        let admin = names::fqdn("ns_admin", admin)?;
        let ns_domains = (1..=ns_count)
            .map(|i| names::fqdn("domain", &format!("ns{i}.{domain}")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Authority {
            ns_domains,
            admin,
            serial,
            ttl,
            interval,
        })
    }

    /// The synthesized nameserver domains, in configuration order.
    pub fn ns_domains(&self) -> &[Name] {
        &self.ns_domains
    }

    /// The zone's SOA record, bound to `name`. The first nameserver is the primary.
    pub fn soa(&self, name: &Name) -> Record {
        let soa = SOA::new(
            self.ns_domains[0].clone(),
            self.admin.clone(),
            self.serial,
            self.interval,
            self.interval,
            self.interval,
            self.ttl,
        );
        Record::from_rdata(name.clone(), self.ttl, RData::SOA(soa))
    }

    /// One NS record per nameserver domain, each bound to `name`.
    pub fn ns(&self, name: &Name) -> Vec<Record> {
        self.ns_domains
            .iter()
            .map(|ns| Record::from_rdata(name.clone(), self.ttl, RData::NS(ns.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn authority() -> Authority {
        Authority::new("dexih.com", 2, "gholland.dataexpertsgroup.com", 123, 60).unwrap()
    }

    #[test]
    fn ns_domains_follow_config_order() {
        let domains: Vec<String> = authority()
            .ns_domains()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(domains, vec!["ns1.dexih.com.", "ns2.dexih.com."]);
    }

    #[test]
    fn soa_record() {
        let name = Name::from_str("abc.dexih.com.").unwrap();
        let record = authority().soa(&name);

        assert_eq!(record.name(), &name);
        assert_eq!(record.ttl(), 60);
        match record.data() {
            Some(RData::SOA(soa)) => {
                assert_eq!(soa.mname().to_string(), "ns1.dexih.com.");
                assert_eq!(soa.rname().to_string(), "gholland.dataexpertsgroup.com.");
                assert_eq!(soa.serial(), 123);
                assert_eq!(soa.refresh(), 60);
                assert_eq!(soa.retry(), 60);
                assert_eq!(soa.expire(), 60);
                assert_eq!(soa.minimum(), 60);
            }
            other => panic!("expected SOA, got {other:?}"),
        }
    }

    #[test]
    fn ns_records() {
        let name = Name::from_str("dexih.com.").unwrap();
        let records = authority().ns(&name);

        assert_eq!(records.len(), 2);
        for (record, expected) in records.iter().zip(["ns1.dexih.com.", "ns2.dexih.com."]) {
            assert_eq!(record.name(), &name);
            assert_eq!(record.ttl(), 60);
            match record.data() {
                Some(RData::NS(ns)) => assert_eq!(ns.to_string(), expected),
                other => panic!("expected NS, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(matches!(
            Authority::new("dexih.com", 1, "user@dexih.com", 1, 60),
            Err(Error::InvalidConfig { field: "ns_admin", .. })
        ));
        assert!(matches!(
            Authority::new("dexih com", 1, "admin.dexih.com", 1, 60),
            Err(Error::InvalidConfig { field: "domain", .. })
        ));
        assert!(matches!(
            Authority::new("dexih.com", 1, "admin.dexih.com", 1, 0),
            Err(Error::InvalidConfig { field: "ttl", .. })
        ));
        assert!(matches!(
            Authority::new("dexih.com", 0, "admin.dexih.com", 1, 60),
            Err(Error::InvalidConfig { field: "ns_addrs", .. })
        ));
    }
}
