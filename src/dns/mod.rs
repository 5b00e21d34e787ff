//! Configurable wildcard DNS server.
//!
//! Queries are answered by a [`Resolver`][crate::resolver::Resolver] built from the
//! [`Config`][crate::config::Config]. Every response is authoritative and `NOERROR`, with
//! whatever records the resolver produced. Messages that aren't queries get `NOTIMP`.
//!
//! The examples below assume the config:
//!
//! ```json
//! {
//!   "domain": "dexih.com",
//!   "root_addr": "10.10.10.10",
//!   "ns_addrs": [ "20.20.20.20", "30.30.30.30" ],
//!   "ns_admin": "hostmaster@dexih.com",
//!   "serial": 2018040501,
//!   "ttl": 300,
//!   "txt_source_url": "https://dexih.example/api/txt",
//!   "dns_udp_bind_addr": "127.0.0.1:5353",
//!   "dns_tcp_bind_addr": "127.0.0.1:5353"
//! }
//! ```
//!
//! # A
//!
//! The root address is served for the domain itself and `www`, and each nameserver address for
//! `nsN`, numbered from 1 in configuration order:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 +short www.dexih.com A
//! 10.10.10.10
//! ❯ dig @127.0.0.1 -p 5353 +short ns2.dexih.com A
//! 30.30.30.30
//! ```
//!
//! ## Wildcard addresses
//!
//! A four label name whose first label is an IPv4 address with dashes for dots resolves to
//! that address. The second label is free, so clients can mint unique names:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 +short 192-168-1-20.a1b2c3.dexih.com A
//! 192.168.1.20
//! ```
//!
//! # NS
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 +short dexih.com NS
//! ns1.dexih.com.
//! ns2.dexih.com.
//! ```
//!
//! # SOA
//!
//! Every SOA and NS response carries the SOA record in its authority section. All timers are
//! the configured TTL:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 dexih.com SOA +noall +authority
//! dexih.com.  300  IN  SOA  ns1.dexih.com. hostmaster.dexih.com. 2018040501 300 300 300 300
//! ```
//!
//! # TXT
//!
//! TXT records come from the remote [TXT source][crate::txt_store], fetched once and cached.
//! With the source returning `[{"key": "dexih.com", "value": "v=spf1 -all"}]`:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 +short _dmarc.dexih.com TXT
//! "v=spf1 -all"
//! ```

mod handlers;
pub mod server;

pub use handlers::Handler;
pub use server::new;
