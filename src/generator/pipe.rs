use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{CreatePipeRequest, Message, PipeRequest, PipeResponse};
use super::{parse_generator_output, Generator, GeneratorRole};
use crate::config::{LangbaseConfig, PipeConfig, RequestConfig};
use crate::error::{GeneratorError, GeneratorResult};
use crate::prompts::system_prompt;

/// Generator backed by Langbase pipes, one pipe per role
#[derive(Clone)]
pub struct PipeGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    pipes: PipeConfig,
    request_config: RequestConfig,
}

impl PipeGenerator {
    /// Create a new pipe generator
    pub fn new(
        config: &LangbaseConfig,
        pipes: PipeConfig,
        request_config: RequestConfig,
    ) -> GeneratorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(GeneratorError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            pipes,
            request_config,
        })
    }

    /// Pipe name configured for a role
    pub fn pipe_name(&self, role: GeneratorRole) -> &str {
        match role {
            GeneratorRole::Form => &self.pipes.form,
            GeneratorRole::FollowUp => &self.pipes.follow_up,
            GeneratorRole::Report => &self.pipes.report,
            GeneratorRole::Strategy => &self.pipes.strategy,
        }
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call a pipe, retrying with exponential backoff
    pub async fn call_pipe(&self, request: PipeRequest) -> GeneratorResult<PipeResponse> {
        let url = format!("{}/v1/pipes/run", self.base_url);
        let pipe_name = request.name.clone();

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    pipe = %pipe_name,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying pipe request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(response) => {
                    info!(
                        pipe = %pipe_name,
                        latency_ms = start.elapsed().as_millis(),
                        "Pipe call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    error!(
                        pipe = %pipe_name,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Pipe call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(GeneratorError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        request: &PipeRequest,
    ) -> GeneratorResult<PipeResponse> {
        debug!(
            pipe = %request.name,
            messages = request.messages.len(),
            "Calling pipe"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    GeneratorError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GeneratorError::InvalidOutput {
                message: format!("Failed to parse pipe response: {}", e),
            })
    }

    /// Create or update the pipe for every role
    pub async fn ensure_pipes(&self) -> GeneratorResult<()> {
        for role in [
            GeneratorRole::Form,
            GeneratorRole::FollowUp,
            GeneratorRole::Report,
            GeneratorRole::Strategy,
        ] {
            self.ensure_pipe(role).await?;
        }
        Ok(())
    }

    async fn ensure_pipe(&self, role: GeneratorRole) -> GeneratorResult<()> {
        let url = format!("{}/v1/pipes", self.base_url);
        let pipe_name = self.pipe_name(role);
        let request = CreatePipeRequest::new(pipe_name)
            .with_description(format!("Feedback form {} generator", role))
            .with_model("openai:gpt-4o-mini")
            .with_upsert(true)
            .with_json_output(true)
            .with_temperature(if role == GeneratorRole::Form { 0.3 } else { 0.5 })
            .with_messages(vec![Message::system(system_prompt(role))]);

        info!(pipe = %pipe_name, "Ensuring pipe exists");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(GeneratorError::Http)?;

        let status = response.status();
        if status.is_success() || status.as_u16() == 409 {
            info!(pipe = %pipe_name, "Pipe ready");
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();
        Err(GeneratorError::Api {
            status: status.as_u16(),
            message: error_body,
        })
    }
}

#[async_trait]
impl Generator for PipeGenerator {
    async fn generate(&self, role: GeneratorRole, request: &Value) -> GeneratorResult<Value> {
        let messages = vec![
            Message::system(system_prompt(role)),
            Message::user(request.to_string()),
        ];
        let response = self
            .call_pipe(PipeRequest::new(self.pipe_name(role), messages))
            .await?;

        if !response.success {
            return Err(GeneratorError::Reported {
                message: format!("Pipe {} reported failure", self.pipe_name(role)),
            });
        }

        parse_generator_output(&response.completion)
    }
}
