//! Reservoir REST client for the asks events endpoint

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::debug;
use url::Url;

use super::models::EventsResponse;
use crate::config::FeedConfig;
use crate::constants::{RESERVOIR_API_KEY_HEADER, RESERVOIR_ASK_EVENTS_PATH};
use crate::error::{Error, Result};
use crate::feed::traits::{EventsRequest, FeedSource};

pub struct ReservoirClient {
    http: HttpClient,
    base_url: Url,
    api_key: Option<String>,
}

impl ReservoirClient {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)?;

        Ok(Self {
            http: HttpClient::new(),
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Build the request URL: `/events/asks/v3?limit=N[&continuation=..]&sortDirection=..`
    pub fn events_url(&self, request: &EventsRequest) -> Result<Url> {
        let mut url = self.base_url.join(RESERVOIR_ASK_EVENTS_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &request.limit.to_string());
            if let Some(continuation) = &request.continuation {
                query.append_pair("continuation", continuation);
            }
            query.append_pair("sortDirection", request.sort_direction.as_str());
        }
        Ok(url)
    }
}

#[async_trait]
impl FeedSource for ReservoirClient {
    async fn fetch_events(&self, request: &EventsRequest) -> Result<EventsResponse> {
        let url = self.events_url(request)?;
        debug!("GET {}", url);

        let mut builder = self.http.get(url);
        if let Some(key) = &self.api_key {
            builder = builder.header(RESERVOIR_API_KEY_HEADER, key);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| Error::Feed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Feed(format!("HTTP {}: {}", status, body)));
        }

        let data: EventsResponse = resp
            .json()
            .await
            .map_err(|e| Error::Feed(e.to_string()))?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::traits::SortDirection;

    fn client(api_url: &str) -> ReservoirClient {
        ReservoirClient::new(&FeedConfig {
            api_url: api_url.to_string(),
            ..FeedConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn first_page_url_has_no_continuation() {
        let url = client("https://api.reservoir.tools")
            .events_url(&EventsRequest {
                limit: 1000,
                continuation: None,
                sort_direction: SortDirection::Asc,
            })
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.reservoir.tools/events/asks/v3?limit=1000&sortDirection=asc"
        );
    }

    #[test]
    fn continuation_is_query_encoded() {
        let url = client("https://api.reservoir.tools")
            .events_url(&EventsRequest {
                limit: 50,
                continuation: Some("MTcw+MDA=".to_string()),
                sort_direction: SortDirection::Desc,
            })
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.reservoir.tools/events/asks/v3?limit=50&continuation=MTcw%2BMDA%3D&sortDirection=desc"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = ReservoirClient::new(&FeedConfig {
            api_url: "not a url".to_string(),
            ..FeedConfig::default()
        });
        assert!(matches!(result, Err(Error::UrlParse(_))));
    }
}
