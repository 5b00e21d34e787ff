use crate::error::Error;
use crate::txt_store::{TxtEntry, TxtSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A fixed list of TXT pairs served as a [`TxtSource`], optionally after a delay. Counts how
/// many times it has been fetched.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct InMemoryTxtSource {
    entries: Vec<TxtEntry>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl InMemoryTxtSource {
    pub fn new(entries: Vec<TxtEntry>) -> Self {
        InMemoryTxtSource {
            entries,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TxtSource for InMemoryTxtSource {
    async fn fetch(&self) -> Result<Vec<TxtEntry>, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.entries.clone())
    }
}
