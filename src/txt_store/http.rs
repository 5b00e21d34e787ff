//! An HTTP implementation of the [`TxtSource`][super::TxtSource] trait.
//!
//! The endpoint is expected to answer a `GET` with a JSON array of pairs:
//!
//! ```json
//! [ { "key": "dexih.com", "value": "v=spf1 -all" } ]
//! ```
//!
//! `Key`/`Value` are accepted in place of `key`/`value`.
use crate::error::Error;
use crate::txt_store::{TxtEntry, TxtSource};
use reqwest::{Client, Url};
use std::time::Duration;

#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct HttpTxtSource {
    client: Client,
    url: Url,
}

impl HttpTxtSource {
    /// Create a source fetching from `url`, giving up on each fetch after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `url` isn't an absolute URL.
    ///
    /// Returns [`Error::TxtFetch`] if the HTTP client can't be built.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|_| Error::invalid_config("txt_source_url", url))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpTxtSource { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl TxtSource for HttpTxtSource {
    async fn fetch(&self) -> Result<Vec<TxtEntry>, Error> {
        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(Error::TxtStatus(response.status()));
        }
        let entries: Vec<TxtEntry> = response.json().await?;
        tracing::info!(url = %self.url, entries = entries.len(), "fetched TXT records");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::net::SocketAddr;

    async fn serve(router: Router) -> SocketAddr {
        let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .serve(router.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    #[tokio::test]
    async fn fetches_entries_in_order() {
        let addr = serve(Router::new().route(
            "/txt",
            get(|| async {
                r#"[{"key":"dexih.com","value":"first"},{"Key":"abc.dexih.com","Value":"second"}]"#
            }),
        ))
        .await;

        let source = HttpTxtSource::new(&format!("http://{addr}/txt"), Duration::from_secs(5))
            .unwrap();
        let entries = source.fetch().await.unwrap();

        assert_eq!(source.url().path(), "/txt");
        assert_eq!(
            entries,
            vec![
                TxtEntry::new("dexih.com", "first"),
                TxtEntry::new("abc.dexih.com", "second"),
            ]
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let addr = serve(Router::new().route(
            "/txt",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;

        let source = HttpTxtSource::new(&format!("http://{addr}/txt"), Duration::from_secs(5))
            .unwrap();
        let res = source.fetch().await;

        assert!(matches!(res, Err(Error::TxtStatus(status)) if status.as_u16() == 500));
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error() {
        let addr = serve(Router::new().route("/txt", get(|| async { "not json" }))).await;

        let source = HttpTxtSource::new(&format!("http://{addr}/txt"), Duration::from_secs(5))
            .unwrap();

        assert!(matches!(source.fetch().await, Err(Error::TxtFetch(_))));
    }

    #[test]
    fn rejects_relative_url() {
        assert!(matches!(
            HttpTxtSource::new("/txt", Duration::from_secs(5)),
            Err(Error::InvalidConfig {
                field: "txt_source_url",
                ..
            })
        ));
    }
}
