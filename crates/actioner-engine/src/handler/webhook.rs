//! Webhook action performer.
//!
//! Sends match data to a configured HTTP endpoint. POST and PUT carry the
//! match message as a JSON body; GET and DELETE pass `content_key` and
//! `matched_hash` as query parameters.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use actioner_core::config::{ActionDefinition, ActionKind, WebhookMethod};
use actioner_core::message::MatchMessage;

use crate::error::ActionError;
use crate::handler::ActionPerformer;

/// Performer that notifies an external system over HTTP.
///
/// Any transport failure or non-2xx response is a handler failure.
#[derive(Debug, Clone)]
pub struct WebhookActionPerformer {
    client: reqwest::Client,
    url: reqwest::Url,
    method: WebhookMethod,
    headers: HeaderMap,
}

impl WebhookActionPerformer {
    pub fn new(
        url: &str,
        method: WebhookMethod,
        timeout: Duration,
        headers: &BTreeMap<String, String>,
    ) -> Result<Self, ActionError> {
        let url = reqwest::Url::parse(url).map_err(|e| {
            ActionError::InvalidDefinition(format!("invalid webhook url {}: {}", url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ActionError::InvalidDefinition(format!(
                "webhook url must be http or https, got: {}",
                url
            )));
        }

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ActionError::InvalidDefinition(format!("header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ActionError::InvalidDefinition(format!("header {}: {}", name.as_str(), e))
            })?;
            header_map.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ActionError::InvalidDefinition(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            url,
            method,
            headers: header_map,
        })
    }

    pub fn from_definition(definition: &ActionDefinition) -> Result<Self, ActionError> {
        let url = definition.url.as_deref().ok_or_else(|| {
            ActionError::InvalidDefinition(format!(
                "webhook action {} has no url",
                definition.label
            ))
        })?;
        Self::new(
            url,
            definition.method,
            Duration::from_secs(definition.timeout_secs),
            &definition.headers,
        )
    }

    pub fn method(&self) -> WebhookMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl ActionPerformer for WebhookActionPerformer {
    fn kind(&self) -> ActionKind {
        ActionKind::Webhook
    }

    async fn perform_action(&self, match_message: &MatchMessage) -> Result<(), ActionError> {
        let query = [
            ("content_key", match_message.content_key.as_str()),
            ("matched_hash", match_message.matched_hash.as_str()),
        ];
        let request = match self.method {
            WebhookMethod::Post => self.client.post(self.url.clone()).json(match_message),
            WebhookMethod::Put => self.client.put(self.url.clone()).json(match_message),
            WebhookMethod::Get => self.client.get(self.url.clone()).query(&query),
            WebhookMethod::Delete => self.client.delete(self.url.clone()).query(&query),
        };

        let response = request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| {
                ActionError::HandlerFailed(format!("{} {} failed: {}", self.method, self.url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ActionError::HandlerFailed(format!(
                "{} {} returned {}: {}",
                self.method,
                self.url,
                status.as_u16(),
                body
            )));
        }

        tracing::info!(
            method = %self.method,
            url = %self.url,
            status = status.as_u16(),
            content_key = %match_message.content_key,
            "Webhook delivered"
        );
        Ok(())
    }
}
