//! HTTP stream client
//!
//! Reference transport against a broker exposing the partitioned low-level
//! API: `GET /event-types/{name}/partitions` for discovery and a chunked
//! `GET /event-types/{name}/events` response per partition, positioned via
//! the `X-Stream-Cursors` request header. Response bodies are surfaced as
//! raw byte streams; framing belongs to the batch decoder.

use super::{ByteStream, StreamClient};
use crate::error::{EventlineError, Result};
use crate::model::{EventType, EventTypeCursor, Partition};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Header carrying the starting position for an event stream request.
const STREAM_CURSORS_HEADER: &str = "X-Stream-Cursors";

/// HTTP implementation of [`StreamClient`].
pub struct HttpStreamClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpStreamClient {
    /// Create a client against `base_url` (scheme and host, no trailing
    /// slash required).
    ///
    /// Only a connect timeout is configured; an open event stream is
    /// expected to stay idle between batches for as long as the broker's
    /// keep-alive interval allows.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EventlineError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        })
    }

    /// Attach a bearer token sent on every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

#[async_trait]
impl StreamClient for HttpStreamClient {
    async fn discover_partitions(&self, event_type: &EventType) -> Result<Vec<Partition>> {
        let url = format!("{}/event-types/{}/partitions", self.base_url, event_type);
        debug!(event_type = %event_type, %url, "Discovering partitions");

        let response = self.request(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EventlineError::from_status(
                status,
                format!("discovering partitions of {event_type}: {body}"),
            ));
        }

        let partitions: Vec<Partition> = response.json().await.map_err(|e| {
            EventlineError::Decode(format!("parsing partition list for {event_type}: {e}"))
        })?;
        debug!(event_type = %event_type, count = partitions.len(), "Discovered partitions");
        Ok(partitions)
    }

    async fn open_stream(&self, cursor: &EventTypeCursor) -> Result<ByteStream> {
        let url = format!("{}/event-types/{}/events", self.base_url, cursor.event_type);
        let cursors = serde_json::json!([{
            "partition": cursor.partition,
            "offset": cursor.cursor,
        }]);
        debug!(
            event_type = %cursor.event_type,
            partition = %cursor.partition,
            cursor = %cursor.cursor,
            "Opening event stream"
        );

        let response = self
            .request(url)
            .header(STREAM_CURSORS_HEADER, cursors.to_string())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EventlineError::from_status(
                status,
                format!("opening stream at {cursor}: {body}"),
            ));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(EventlineError::from));
        Ok(Box::pin(stream))
    }
}
