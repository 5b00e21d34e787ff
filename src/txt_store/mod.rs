//! Remote TXT record source and its process-wide cache.
//!
//! TXT answers are served from a snapshot of key/value pairs fetched as a whole from a
//! [`TxtSource`], normally the [`HttpTxtSource`] pointed at
//! [`Config::txt_source_url`][crate::config::Config::txt_source_url]. A pair answers every query
//! name that its key is a label-wise suffix of, so a key of `dexih.com` answers `dexih.com` and
//! `abc.dexih.com` but not `notdexih.com`.
//!
//! The snapshot is fetched lazily by the first TXT question and then shared by every resolution
//! through a [`TxtCache`]. Concurrent questions arriving while a fetch is outstanding wait on
//! that same fetch instead of starting their own.

use crate::error::Error;
use crate::resolver::names;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use trust_dns_server::client::rr::rdata::TXT;
use trust_dns_server::client::rr::{Name, RData, Record};

pub mod http;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use http::HttpTxtSource;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryTxtSource;

/// `DynTxtSource` is a type alias for a [`TxtSource`] shared between the cache and the fetches
/// it starts.
#[allow(clippy::module_name_repetitions)]
pub type DynTxtSource = Arc<dyn TxtSource + Send + Sync>;

/// An async trait describing a remote source of TXT record key/value pairs, fetched as a whole.
#[async_trait::async_trait]
pub trait TxtSource {
    /// Fetch the current list of TXT pairs, in source order.
    async fn fetch(&self) -> Result<Vec<TxtEntry>, Error>;
}

/// One TXT key/value pair. The key is a domain suffix, the value the TXT string served for it.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TxtEntry {
    #[serde(alias = "Key")]
    pub key: String,
    #[serde(alias = "Value")]
    pub value: String,
}

impl TxtEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        TxtEntry {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An immutable, fetched list of TXT pairs with their keys pre-split into labels.
#[derive(Debug, Default)]
pub struct TxtSnapshot {
    entries: Vec<(Vec<String>, String)>,
}

impl TxtSnapshot {
    pub fn new(entries: Vec<TxtEntry>) -> Self {
        TxtSnapshot {
            entries: entries
                .into_iter()
                .map(|entry| (names::split_hostname(&entry.key), entry.value))
                .collect(),
        }
    }

    /// Values of every pair whose key ends `labels`, in snapshot order.
    pub fn matching<'a>(&'a self, labels: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| names::ends_with(labels, key))
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Longest character-string a TXT record can carry.
const MAX_CHARACTER_STRING_LEN: usize = 255;

/// Split `value` into character-strings of at most 255 bytes, cutting only on `char` boundaries.
/// An empty value is a single empty string.
fn character_strings(value: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut rest = value;
    while rest.len() > MAX_CHARACTER_STRING_LEN {
        let mut end = MAX_CHARACTER_STRING_LEN;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (head, tail) = rest.split_at(end);
        strings.push(head.to_string());
        rest = tail;
    }
    strings.push(rest.to_string());
    strings
}

type FetchResult = Result<Arc<TxtSnapshot>, Arc<Error>>;
type Fetch = Shared<BoxFuture<'static, FetchResult>>;

struct Flight {
    fetch: Fetch,
    started: Instant,
}

/// Single-flight cache over a [`TxtSource`].
///
/// At most one fetch is outstanding at a time. A successful snapshot is kept until
/// `refresh_interval` elapses, or for the life of the cache when no interval is set. A failed
/// fetch gives no records to every caller that waited on it, and the next caller starts a new
/// fetch.
pub struct TxtCache {
    source: Option<DynTxtSource>,
    ttl: u32,
    refresh_interval: Option<Duration>,
    slot: Mutex<Option<Flight>>,
}

impl TxtCache {
    pub fn new(source: DynTxtSource, ttl: u32, refresh_interval: Option<Duration>) -> Self {
        TxtCache {
            source: Some(source),
            ttl,
            refresh_interval,
            slot: Mutex::new(None),
        }
    }

    /// A cache with no source configured. It always resolves to no records.
    pub fn disabled() -> Self {
        TxtCache {
            source: None,
            ttl: 0,
            refresh_interval: None,
            slot: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// TXT records for `name`, one per matching snapshot pair, each bound to `name`.
    ///
    /// Fetches the snapshot first if no fetch has completed or is in flight. Fetch failures give
    /// an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires while waiting on the fetch. The fetch
    /// itself carries on for any other waiters.
    pub async fn resolve(
        &self,
        name: &Name,
        labels: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, Error> {
        let Some(source) = &self.source else {
            return Ok(Vec::new());
        };

        let fetch = self.join_or_start(source);
        let outcome = tokio::select! {
            () = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = fetch.clone() => outcome,
        };

        match outcome {
            Ok(snapshot) => Ok(snapshot
                .matching(labels)
                .map(|value| {
                    let txt = TXT::new(character_strings(value));
                    Record::from_rdata(name.clone(), self.ttl, RData::TXT(txt))
                })
                .collect()),
            Err(error) => {
                self.forget(&fetch);
                tracing::warn!(%name, ?error, "TXT source fetch failed, answering without TXT records");
                Ok(Vec::new())
            }
        }
    }

    fn join_or_start(&self, source: &DynTxtSource) -> Fetch {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(flight) = slot.as_ref() {
            if !self.expired(flight) {
                return flight.fetch.clone();
            }
            tracing::debug!("TXT snapshot expired, refetching");
        }

        let source = Arc::clone(source);
        let fetch = async move {
            source
                .fetch()
                .await
                .map(|entries| {
                    let snapshot = TxtSnapshot::new(entries);
                    tracing::debug!(entries = snapshot.len(), "TXT snapshot ready");
                    Arc::new(snapshot)
                })
                .map_err(Arc::new)
        }
        .boxed()
        .shared();
        *slot = Some(Flight {
            fetch: fetch.clone(),
            started: Instant::now(),
        });
        fetch
    }

    fn expired(&self, flight: &Flight) -> bool {
        match self.refresh_interval {
            Some(interval) => flight.fetch.peek().is_some() && flight.started.elapsed() >= interval,
            None => false,
        }
    }

    fn forget(&self, fetch: &Fetch) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|flight| flight.fetch.ptr_eq(fetch))
        {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trust_dns_proto::serialize::binary::BinEncodable;

    struct FlakySource {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl TxtSource for FlakySource {
        async fn fetch(&self) -> Result<Vec<TxtEntry>, Error> {
            tokio::time::sleep(self.delay).await;
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(Error::TxtStatus(reqwest::StatusCode::SERVICE_UNAVAILABLE)),
                _ => Ok(vec![TxtEntry::new("dexih.com", "recovered")]),
            }
        }
    }

    fn name(s: &str) -> (Name, Vec<String>) {
        let name = Name::from_str(s).unwrap();
        let labels = names::split_hostname(&s.to_lowercase());
        (name, labels)
    }

    fn txt_values(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|record| match record.data() {
                Some(RData::TXT(txt)) => txt
                    .txt_data()
                    .iter()
                    .map(|data| String::from_utf8_lossy(data).into_owned())
                    .collect::<String>(),
                other => panic!("expected TXT, got {other:?}"),
            })
            .collect()
    }

    fn source() -> Arc<InMemoryTxtSource> {
        Arc::new(InMemoryTxtSource::new(vec![
            TxtEntry::new("dexih.com", "v=spf1 -all"),
            TxtEntry::new("_acme-challenge.dexih.com", "challenge"),
            TxtEntry::new("other.org", "unrelated"),
            TxtEntry::new("DEXIH.COM.", "second"),
        ]))
    }

    #[test]
    fn snapshot_matches_label_suffixes() {
        let snapshot = TxtSnapshot::new(vec![
            TxtEntry::new("dexih.com", "apex"),
            TxtEntry::new("abc.dexih.com", "abc"),
        ]);
        let query = |s: &str| names::split_hostname(s);

        assert_eq!(snapshot.matching(&query("dexih.com")).collect::<Vec<_>>(), ["apex"]);
        assert_eq!(
            snapshot.matching(&query("abc.dexih.com")).collect::<Vec<_>>(),
            ["apex", "abc"]
        );
        assert_eq!(snapshot.matching(&query("notdexih.com")).count(), 0);
        assert_eq!(snapshot.matching(&query("com")).count(), 0);
        assert_eq!(snapshot.len(), 2);
        assert!(TxtSnapshot::default().is_empty());
    }

    #[test]
    fn long_values_are_split_into_character_strings() {
        let value = "k".repeat(400);
        let strings = character_strings(&value);
        assert_eq!(strings.iter().map(String::len).collect::<Vec<_>>(), [255, 145]);
        assert_eq!(strings.concat(), value);

        // A multi-byte char straddling byte 255 moves to the next string.
        let value = format!("{}é{}", "a".repeat(254), "b".repeat(10));
        let strings = character_strings(&value);
        assert_eq!(strings[0].len(), 254);
        assert_eq!(strings.concat(), value);

        assert_eq!(character_strings(""), [""]);
        assert_eq!(character_strings(&"c".repeat(255)).len(), 1);
    }

    #[tokio::test]
    async fn long_values_encode_on_the_wire() {
        let value = format!("v=DKIM1; k=rsa; p={}", "A".repeat(400));
        let source = Arc::new(InMemoryTxtSource::new(vec![TxtEntry::new(
            "dexih.com",
            value.clone(),
        )]));
        let cache = TxtCache::new(source, 60, None);
        let (name, labels) = name("dexih.com.");
        let records = cache
            .resolve(&name, &labels, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(txt_values(&records), [value]);
        for record in &records {
            assert!(record.to_bytes().is_ok());
        }
    }

    #[tokio::test]
    async fn disabled_cache_has_no_records() {
        let cache = TxtCache::disabled();
        let (name, labels) = name("dexih.com.");
        let records = cache
            .resolve(&name, &labels, &CancellationToken::new())
            .await
            .unwrap();
        assert!(records.is_empty());
        assert!(!cache.is_enabled());
    }

    #[tokio::test]
    async fn records_follow_snapshot_order() {
        let cache = TxtCache::new(source(), 60, None);
        let (name, labels) = name("ABC.dexih.com.");
        let records = cache
            .resolve(&name, &labels, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(txt_values(&records), ["v=spf1 -all", "second"]);
        for record in &records {
            assert_eq!(record.name(), &name);
            assert_eq!(record.ttl(), 60);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolutions_share_one_fetch() {
        let source = Arc::new(
            InMemoryTxtSource::new(vec![TxtEntry::new("dexih.com", "shared")])
                .with_delay(Duration::from_millis(50)),
        );
        let cache = Arc::new(TxtCache::new(source.clone(), 60, None));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    let (name, labels) = name("dexih.com.");
                    cache
                        .resolve(&name, &labels, &CancellationToken::new())
                        .await
                        .unwrap()
                })
            })
            .collect();

        for records in join_all(tasks).await {
            assert_eq!(txt_values(&records.unwrap()), ["shared"]);
        }
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn snapshot_is_kept_without_refresh_interval() {
        let source = source();
        let cache = TxtCache::new(source.clone(), 60, None);
        let (name, labels) = name("dexih.com.");
        for _ in 0..3 {
            cache
                .resolve(&name, &labels, &CancellationToken::new())
                .await
                .unwrap();
        }
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn snapshot_is_refetched_after_refresh_interval() {
        let source = source();
        let cache = TxtCache::new(source.clone(), 60, Some(Duration::from_millis(10)));
        let (name, labels) = name("dexih.com.");

        cache
            .resolve(&name, &labels, &CancellationToken::new())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache
            .resolve(&name, &labels, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failed_fetch_is_shared_then_retried() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
        });
        let cache = Arc::new(TxtCache::new(source.clone(), 60, None));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    let (name, labels) = name("dexih.com.");
                    cache
                        .resolve(&name, &labels, &CancellationToken::new())
                        .await
                        .unwrap()
                })
            })
            .collect();
        for records in join_all(tasks).await {
            assert!(records.unwrap().is_empty());
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let (name, labels) = name("dexih.com.");
        let records = cache
            .resolve(&name, &labels, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(txt_values(&records), ["recovered"]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancelled_resolution_stops_waiting() {
        let source = Arc::new(
            InMemoryTxtSource::new(vec![TxtEntry::new("dexih.com", "late")])
                .with_delay(Duration::from_secs(30)),
        );
        let cache = TxtCache::new(source, 60, None);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (name, labels) = name("dexih.com.");
        let res = cache.resolve(&name, &labels, &cancel).await;
        assert!(matches!(res, Err(Error::Cancelled)));
    }
}
