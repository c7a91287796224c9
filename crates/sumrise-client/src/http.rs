//! HTTP+JSON implementation of [`GradingTransport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use sumrise_core::error::TransportError;
use sumrise_core::model::{
    Attempt, AttemptList, Evaluation, MarkBatchRequest, Question, QuestionQuery,
};
use sumrise_core::traits::GradingTransport;

use crate::config::ClientConfig;

/// Client for the grading service REST API.
pub struct HttpGradingClient {
    base_url: Url,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpGradingClient {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            TransportError::Network(format!("invalid base url {:?}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::Network(format!(
                "invalid base url {:?}",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`: the base URL always has path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, url: Url) -> Result<(StatusCode, Value), TransportError> {
        self.send(self.client.get(url)).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<(StatusCode, Value), TransportError> {
        self.send(self.client.post(url).json(body)).await
    }

    async fn send(
        &self,
        mut req: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, Value), TransportError> {
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let response = req.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(e))?;
        tracing::debug!(status = status.as_u16(), bytes = text.len(), "grading service replied");

        Ok((status, parse_body(&text)))
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout_secs)
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// An empty or non-JSON body reads as `null`.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or(Value::Null)
}

/// Turn a non-2xx reply into [`TransportError::Service`].
fn check_status(status: StatusCode, body: Value) -> Result<Value, TransportError> {
    if status.is_success() {
        return Ok(body);
    }
    let message =
        service_message(&body).unwrap_or_else(|| format!("Request failed ({})", status.as_u16()));
    tracing::warn!(status = status.as_u16(), %message, "grading service rejected request");
    Err(TransportError::Service {
        status: status.as_u16(),
        message,
    })
}

/// First usable message from `error`, `feedback`, `detail`, then `errors[0]`.
fn service_message(body: &Value) -> Option<String> {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    ["error", "feedback", "detail"]
        .iter()
        .find_map(|key| non_empty(body.get(key)))
        .or_else(|| {
            let first = body.get("errors")?.get(0)?;
            non_empty(Some(first)).or_else(|| non_empty(first.get("message")))
        })
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, TransportError> {
    serde_json::from_value(body).map_err(|e| TransportError::Decode(e.to_string()))
}

#[async_trait]
impl GradingTransport for HttpGradingClient {
    #[instrument(skip(self))]
    async fn list_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>, TransportError> {
        let mut url = self.endpoint(&["questions"]);
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(topic) = &query.topic {
                pairs.append_pair("topic", topic);
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(random) = query.random {
                pairs.append_pair("random", if random { "true" } else { "false" });
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let (status, body) = self.get(url).await?;
        decode(check_status(status, body)?)
    }

    #[instrument(skip(self))]
    async fn get_question(&self, id: &str) -> Result<Question, TransportError> {
        let (status, body) = self.get(self.endpoint(&["questions", id])).await?;
        decode(check_status(status, body)?)
    }

    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn mark_batch(&self, request: &MarkBatchRequest) -> Result<Value, TransportError> {
        let (status, body) = self.post(self.endpoint(&["mark-batch"]), request).await?;
        check_status(status, body)
    }

    #[instrument(skip(self))]
    async fn recent_attempts(&self, limit: u32) -> Result<Vec<Attempt>, TransportError> {
        let mut url = self.endpoint(&["attempts", "recent-list"]);
        url.query_pairs_mut().append_pair("limit", &limit.to_string());

        let (status, body) = self.get(url).await?;
        let list: AttemptList = decode(check_status(status, body)?)?;
        Ok(list.into())
    }

    #[instrument(skip(self))]
    async fn attempt(&self, id: i64) -> Result<Attempt, TransportError> {
        let (status, body) = self
            .get(self.endpoint(&["attempts", &id.to_string()]))
            .await?;
        decode(check_status(status, body)?)
    }

    #[instrument(skip(self))]
    async fn evaluate(&self, expr: &str) -> Result<Evaluation, TransportError> {
        let (status, body) = self
            .post(self.endpoint(&["evaluate"]), &serde_json::json!({ "expr": expr }))
            .await?;
        // A rejected expression may come back with a 4xx and the evaluation body.
        if !status.is_success() && body.get("ok").is_some() {
            return decode(body);
        }
        decode(check_status(status, body)?)
    }
}
