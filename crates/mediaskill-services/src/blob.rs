//! Blob container access through a container SAS URL.
//!
//! The SAS query string is a credential; only the host and path of a container
//! URL are ever logged.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Url};

use crate::error::{ServiceError, ServiceResult};
use crate::http::ensure_success;
use crate::traits::{BlobEntry, BlobStore};

/// Listing pages followed before giving up on a container.
const MAX_LIST_PAGES: usize = 50;

#[derive(Clone)]
pub struct SasBlobClient {
    http_client: Client,
}

impl SasBlobClient {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }
}

fn parse_url(raw: &str) -> ServiceResult<Url> {
    Url::parse(raw).map_err(|e| ServiceError::InvalidUrl(e.to_string()))
}

/// `https://{host}{path}` without the SAS query.
pub fn redact(url: &Url) -> String {
    format!("{}://{}{}", url.scheme(), url.host_str().unwrap_or(""), url.path())
}

/// A container SAS URL split into the parts blob URLs are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerUrl {
    /// Host with port when one is present
    pub authority: String,
    /// Container path without a trailing slash, e.g. `/asset-1`
    pub path: String,
    /// SAS query including the leading `?`, or empty
    pub search: String,
}

impl ContainerUrl {
    pub fn parse(container_sas_url: &str) -> ServiceResult<Self> {
        let url = parse_url(container_sas_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| ServiceError::InvalidUrl("container URL has no host".to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            authority,
            path: url.path().trim_end_matches('/').to_string(),
            search: url.query().map(|q| format!("?{}", q)).unwrap_or_default(),
        })
    }

    /// Container name, the path without its leading slash.
    pub fn container_name(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    /// HTTPS URL of a blob in this container, carrying the same SAS.
    pub fn blob_url(&self, blob_name: &str) -> String {
        format!(
            "https://{}{}/{}{}",
            self.authority, self.path, blob_name, self.search
        )
    }
}

#[async_trait]
impl BlobStore for SasBlobClient {
    async fn list(&self, container_sas_url: &str) -> ServiceResult<Vec<BlobEntry>> {
        let container = parse_url(container_sas_url)?;
        let mut entries = Vec::new();
        let mut marker: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut url = container.clone();
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("restype", "container");
                query.append_pair("comp", "list");
                if let Some(marker) = &marker {
                    query.append_pair("marker", marker);
                }
            }

            let response = self.http_client.get(url).send().await?;
            let response = ensure_success(&redact(&container), response).await?;
            let body = response.text().await?;

            let (page, next_marker) = parse_listing(&body)?;
            entries.extend(page);

            match next_marker {
                Some(next) => marker = Some(next),
                None => return Ok(entries),
            }
        }

        tracing::warn!(
            container = %redact(&container),
            pages = MAX_LIST_PAGES,
            "Container listing truncated"
        );
        Ok(entries)
    }

    async fn read_text(&self, container_sas_url: &str, blob_name: &str) -> ServiceResult<String> {
        let mut url = parse_url(container_sas_url)?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidUrl("container URL cannot be a base".to_string()))?
            .push(blob_name);

        let response = self.http_client.get(url.clone()).send().await?;
        let response = ensure_success(&redact(&url), response).await?;
        Ok(response.text().await?)
    }
}

/// Parse one `EnumerationResults` page into its blobs and the continuation
/// marker, if any.
fn parse_listing(xml: &str) -> ServiceResult<(Vec<BlobEntry>, Option<String>)> {
    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut entries = Vec::new();
    let mut current: Option<BlobEntry> = None;
    let mut next_marker = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                if name == b"Blob" {
                    current = Some(BlobEntry {
                        name: String::new(),
                        blob_type: None,
                        content_length: None,
                    });
                }
                path.push(name);
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"Blob" {
                    if let Some(entry) = current.take().filter(|entry| !entry.name.is_empty()) {
                        entries.push(entry);
                    }
                }
                path.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| ServiceError::Decode(format!("XML text error: {e}")))?
                    .into_owned();

                match (path.last().map(Vec::as_slice), current.as_mut()) {
                    (Some(b"Name"), Some(entry)) => entry.name = text,
                    (Some(b"BlobType"), Some(entry)) => entry.blob_type = Some(text),
                    (Some(b"Content-Length"), Some(entry)) => {
                        entry.content_length = text.parse().ok()
                    }
                    (Some(b"NextMarker"), None) if !text.is_empty() => next_marker = Some(text),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ServiceError::Decode(format!("XML parsing error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok((entries, next_marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const LISTING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://st.blob.core.windows.net/" ContainerName="asset-1">
  <Blobs>
    <Blob>
      <Name>FaceThumbnail_1.jpg</Name>
      <Properties><Content-Length>1024</Content-Length><BlobType>BlockBlob</BlobType></Properties>
    </Blob>
    <Blob>
      <Name>insights.json</Name>
      <Properties><Content-Length>20</Content-Length><BlobType>BlockBlob</BlobType></Properties>
    </Blob>
  </Blobs>
  <NextMarker />
</EnumerationResults>"#;

    #[test]
    fn test_parse_listing() {
        let (entries, marker) = parse_listing(LISTING).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name, "insights.json");
        assert_eq!(entries[1].blob_type.as_deref(), Some("BlockBlob"));
        assert_eq!(entries[0].content_length, Some(1024));
        assert!(marker.is_none());
    }

    #[test]
    fn test_parse_listing_with_marker_and_escapes() {
        let xml = "\u{feff}<EnumerationResults><Blobs><Blob><Name>a&amp;b.json</Name></Blob></Blobs>\
                   <NextMarker>page-2</NextMarker></EnumerationResults>";
        let (entries, marker) = parse_listing(xml).unwrap();
        assert_eq!(entries[0].name, "a&b.json");
        assert!(entries[0].blob_type.is_none());
        assert_eq!(marker.as_deref(), Some("page-2"));
    }

    #[test]
    fn test_parse_listing_rejects_broken_xml() {
        assert!(parse_listing("<EnumerationResults><Blobs></Blob>").is_err());
    }

    #[test]
    fn test_redact_drops_query() {
        let url = Url::parse("https://st.blob.core.windows.net/asset-1?sv=1&sig=secret").unwrap();
        assert_eq!(redact(&url), "https://st.blob.core.windows.net/asset-1");
    }

    #[test]
    fn test_container_url_parts() {
        let url =
            ContainerUrl::parse("https://st.blob.core.windows.net/asset-1?sv=2018&sig=abc").unwrap();
        assert_eq!(url.authority, "st.blob.core.windows.net");
        assert_eq!(url.container_name(), "asset-1");
        assert_eq!(
            url.blob_url("FaceThumbnail_7.jpg"),
            "https://st.blob.core.windows.net/asset-1/FaceThumbnail_7.jpg?sv=2018&sig=abc"
        );

        let bare = ContainerUrl::parse("https://st.example.com:8443/c/").unwrap();
        assert_eq!(bare.blob_url("x"), "https://st.example.com:8443/c/x");
        assert!(ContainerUrl::parse("not a url").is_err());
    }

    #[tokio::test]
    async fn test_list_follows_markers() {
        let mut server = mockito::Server::new_async().await;
        let second = server
            .mock("GET", "/asset-1")
            .match_query(Matcher::UrlEncoded("marker".to_string(), "m2".to_string()))
            .with_status(200)
            .with_body(LISTING)
            .create_async()
            .await;
        let first = server
            .mock("GET", "/asset-1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("sig".to_string(), "s".to_string()),
                Matcher::UrlEncoded("comp".to_string(), "list".to_string()),
                Matcher::UrlEncoded("restype".to_string(), "container".to_string()),
            ]))
            .with_status(200)
            .with_body(
                "<EnumerationResults><Blobs><Blob><Name>a</Name></Blob></Blobs>\
                 <NextMarker>m2</NextMarker></EnumerationResults>",
            )
            .create_async()
            .await;

        let client = SasBlobClient::new(Client::new());
        let entries = client
            .list(&format!("{}/asset-1?sig=s", server.url()))
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "a");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_text_keeps_sas() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/asset-1/insights.json")
            .match_query(Matcher::UrlEncoded("sig".to_string(), "s".to_string()))
            .with_status(200)
            .with_body(r#"{"faces":[]}"#)
            .create_async()
            .await;

        let client = SasBlobClient::new(Client::new());
        let text = client
            .read_text(&format!("{}/asset-1?sig=s", server.url()), "insights.json")
            .await
            .unwrap();
        assert_eq!(text, r#"{"faces":[]}"#);
    }

    #[tokio::test]
    async fn test_missing_container_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/asset-1")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let client = SasBlobClient::new(Client::new());
        let err = client
            .list(&format!("{}/asset-1?sig=s", server.url()))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
