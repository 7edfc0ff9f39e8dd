// SPDX-FileCopyrightText: 2026 Orderping Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media resource fetching for outbound media messages.
//!
//! Fetch failures never fail a delivery job: the worker degrades to a
//! text-only send with the original body. Every failure path here returns
//! [`OrderpingError::Media`] so the worker can tell a media problem from a
//! transport problem.

use orderping_core::OrderpingError;
use tracing::debug;

/// HTTP fetcher for `media_url` payloads with a hard size cap.
#[derive(Clone)]
pub struct MediaFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl MediaFetcher {
    pub fn new(max_bytes: u64) -> Result<Self, OrderpingError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| OrderpingError::Media {
                message: format!("media client init failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client, max_bytes })
    }

    /// Download the resource at `url`, enforcing the configured size cap.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, OrderpingError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OrderpingError::Media {
                message: format!("media fetch failed for {url}: {e}"),
                source: Some(Box::new(e)),
            })?
            .error_for_status()
            .map_err(|e| OrderpingError::Media {
                message: format!("media fetch for {url} returned an error status: {e}"),
                source: Some(Box::new(e)),
            })?;

        if let Some(length) = response.content_length()
            && length > self.max_bytes
        {
            return Err(OrderpingError::Media {
                message: format!(
                    "media at {url} is {length} bytes, over the {} byte cap",
                    self.max_bytes
                ),
                source: None,
            });
        }

        let bytes = response.bytes().await.map_err(|e| OrderpingError::Media {
            message: format!("media read failed for {url}: {e}"),
            source: Some(Box::new(e)),
        })?;

        if bytes.len() as u64 > self.max_bytes {
            return Err(OrderpingError::Media {
                message: format!(
                    "media at {url} is {} bytes, over the {} byte cap",
                    bytes.len(),
                    self.max_bytes
                ),
                source: None,
            });
        }

        debug!(url = %url, size = bytes.len(), "media fetched");
        Ok(bytes.to_vec())
    }
}
