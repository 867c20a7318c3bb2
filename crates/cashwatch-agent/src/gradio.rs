//! Gradio queue API client.
//!
//! A call is two requests: `POST .../call/{api}` submits the inputs and
//! returns an `event_id`, then `GET .../call/{api}/{event_id}` streams
//! server-sent events until a `complete` (or `error`) event carries the
//! endpoint's output list.

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use cashwatch_core::{Error, Result};

use crate::payload::parse_agent_output;
use crate::settings::AgentSettings;
use crate::source::{FetchOutcome, RecordSource};

#[derive(Debug, Deserialize)]
struct CallResponse {
    event_id: String,
}

/// Browser agent reached through Gradio.
pub struct GradioAgent {
    client: Client,
    settings: AgentSettings,
}

impl GradioAgent {
    pub fn new(settings: AgentSettings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(client: Client, settings: AgentSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Submit the task and wait for the agent's final answer text.
    pub async fn run_task(&self) -> Result<String> {
        let call_url = self.settings.call_url();
        debug!("Submitting agent task to {}", call_url);

        let response = self
            .client
            .post(&call_url)
            .json(&json!({ "data": self.settings.request_data() }))
            .send()
            .await
            .map_err(|e| Error::Http(format!("submit failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!("submit returned {}: {}", status, body)));
        }

        let call: CallResponse = response
            .json()
            .await
            .map_err(|e| Error::Agent(format!("no event_id in submit response: {}", e)))?;

        let events_url = format!("{}/{}", call_url, call.event_id);
        debug!("Waiting for agent result at {}", events_url);

        let response = self
            .client
            .get(&events_url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("result stream failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Agent(format!(
                "result stream returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("result stream interrupted: {}", e)))?;

        parse_sse_result(&body, self.settings.result_index)
    }
}

impl RecordSource for GradioAgent {
    fn fetch(&self) -> BoxFuture<'_, FetchOutcome> {
        async move {
            info!("Starting agent job ({})", self.settings.llm_model_name);
            match self.run_task().await.and_then(|text| parse_agent_output(&text)) {
                Ok(batch) => {
                    info!(
                        "Agent returned {} candidates ({} malformed)",
                        batch.candidates.len(),
                        batch.malformed
                    );
                    FetchOutcome::Fetched(batch)
                }
                Err(e) => {
                    warn!("Agent fetch failed: {}", e);
                    FetchOutcome::failed(e.to_string())
                }
            }
        }
        .boxed()
    }

    fn name(&self) -> &str {
        "gradio"
    }
}

/// Pull the output at `index` out of the `complete` event of an SSE body.
///
/// String outputs are returned as-is; any other JSON value is returned
/// serialized so the payload parser can still look at it.
pub fn parse_sse_result(body: &str, index: usize) -> Result<String> {
    let mut event = String::new();
    let mut data: Vec<&str> = Vec::new();

    // Trailing empty line flushes an unterminated final event.
    for line in body.lines().chain(std::iter::once("")) {
        if line.is_empty() {
            if !data.is_empty() || !event.is_empty() {
                if let Some(result) = dispatch_event(&event, &data.join("\n"), index) {
                    return result;
                }
            }
            event.clear();
            data.clear();
        } else if let Some(name) = line.strip_prefix("event:") {
            event = name.trim().to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    Err(Error::Agent("result stream ended without a complete event".into()))
}

fn dispatch_event(event: &str, data: &str, index: usize) -> Option<Result<String>> {
    match event {
        "complete" => Some(complete_output(data, index)),
        "error" => Some(Err(Error::Agent(format!(
            "agent reported an error: {}",
            if data.is_empty() || data == "null" {
                "unspecified"
            } else {
                data
            }
        )))),
        _ => None,
    }
}

fn complete_output(data: &str, index: usize) -> Result<String> {
    let outputs: Vec<serde_json::Value> = serde_json::from_str(data)
        .map_err(|e| Error::Agent(format!("complete event is not a JSON list: {}", e)))?;
    match outputs.into_iter().nth(index) {
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(serde_json::Value::Null) | None => Err(Error::Agent(format!(
            "agent output has no value at position {}",
            index
        ))),
        Some(other) => Ok(other.to_string()),
    }
}
