//! reqwest-backed implementation of the Nylas API traits.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::NylasConfig;

use super::types::{
    CreateEventRequest, Event, Grant, InviteNotetakerRequest, Notetaker, NotetakerMedia,
};
use super::{CalendarApi, NotetakerApi, RemoteError, RemoteResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Standard Nylas response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

pub struct HttpNylasClient {
    client: reqwest::Client,
    api_uri: String,
    api_key: String,
    grant_id: String,
}

impl HttpNylasClient {
    pub fn new(config: &NylasConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_uri: config.api_uri.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            grant_id: config.grant_id.clone(),
        }
    }

    fn grant_url(&self, path: &str) -> String {
        format!("{}/v3/grants/{}{}", self.api_uri, self.grant_id, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
    }

    /// Send a request and map the failure modes onto `RemoteError` kinds.
    async fn send(&self, builder: RequestBuilder, what: &str) -> RemoteResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::Transient(format!("{}: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = if body.is_empty() {
            format!("{} ({})", what, status)
        } else {
            format!("{} ({}): {}", what, status, truncate(&body, 300))
        };

        match status {
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound(detail)),
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                Err(RemoteError::Transient(detail))
            }
            s if s.is_server_error() => Err(RemoteError::Transient(detail)),
            _ => Err(RemoteError::Rejected(detail)),
        }
    }

    async fn get_data<T: DeserializeOwned>(&self, url: &str, what: &str) -> RemoteResult<T> {
        let response = self.send(self.request(Method::GET, url), what).await?;
        decode_envelope(response, what).await
    }

    async fn post_data<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        what: &str,
    ) -> RemoteResult<T> {
        let response = self
            .send(self.request(Method::POST, url).json(body), what)
            .await?;
        decode_envelope(response, what).await
    }
}

async fn decode_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> RemoteResult<T> {
    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| RemoteError::Rejected(format!("{}: malformed response: {}", what, e)))?;
    Ok(envelope.data)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl NotetakerApi for HttpNylasClient {
    async fn find_notetaker(&self, notetaker_id: &str) -> RemoteResult<Notetaker> {
        let url = self.grant_url(&format!("/notetakers/{}", notetaker_id));
        debug!("Fetching notetaker state: {}", notetaker_id);
        self.get_data(&url, "find notetaker").await
    }

    async fn get_media(&self, notetaker_id: &str) -> RemoteResult<NotetakerMedia> {
        let url = self.grant_url(&format!("/notetakers/{}/media", notetaker_id));
        self.get_data(&url, "get notetaker media").await
    }

    async fn invite_notetaker(&self, request: &InviteNotetakerRequest) -> RemoteResult<String> {
        let url = self.grant_url("/notetakers");
        let notetaker: Notetaker = self.post_data(&url, request, "invite notetaker").await?;
        Ok(notetaker.id)
    }
}

#[async_trait]
impl CalendarApi for HttpNylasClient {
    async fn create_event(
        &self,
        calendar_id: &str,
        request: &CreateEventRequest,
    ) -> RemoteResult<Event> {
        let url = format!(
            "{}?calendar_id={}",
            self.grant_url("/events"),
            calendar_id
        );
        self.post_data(&url, request, "create event").await
    }

    async fn find_event(&self, event_id: &str, calendar_id: &str) -> RemoteResult<Event> {
        let url = format!(
            "{}?calendar_id={}",
            self.grant_url(&format!("/events/{}", event_id)),
            calendar_id
        );
        self.get_data(&url, "find event").await
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        start: i64,
        end: i64,
    ) -> RemoteResult<Vec<Event>> {
        let url = format!(
            "{}?calendar_id={}&start={}&end={}",
            self.grant_url("/events"),
            calendar_id,
            start,
            end
        );
        self.get_data(&url, "list events").await
    }

    async fn destroy_event(&self, event_id: &str, calendar_id: &str) -> RemoteResult<()> {
        let url = format!(
            "{}?calendar_id={}",
            self.grant_url(&format!("/events/{}", event_id)),
            calendar_id
        );
        // Deletion returns an empty body; only the status matters.
        self.send(self.request(Method::DELETE, &url), "destroy event")
            .await?;
        Ok(())
    }

    async fn find_grant(&self) -> RemoteResult<Grant> {
        let url = format!("{}/v3/grants/{}", self.api_uri, self.grant_id);
        self.get_data(&url, "find grant").await
    }
}
