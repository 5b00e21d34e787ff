//! Wildcard DNS
//!
//! An authoritative DNS server for a single domain that synthesizes its answers instead of
//! reading a zone file. A handful of fixed names map to configured addresses, SOA and NS
//! records are generated on the fly, any client can embed an IPv4 address in a queried name
//! (`127-0-0-1.salt.example.com`), and TXT records are published from a remote HTTP endpoint.
//!
#![warn(clippy::pedantic)]

pub mod config;
pub mod dns;
pub mod error;
pub mod resolver;
pub mod txt_store;

pub use config::{Config, SharedConfig};
pub use dns::new as new_dns;
pub use resolver::{Resolution, Resolver};
pub use txt_store::{HttpTxtSource, InMemoryTxtSource, TxtCache};
