use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::traits::Enricher;
use crate::types::{DashboardError, Enrichment, Result};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Text-analysis collaborator backed by the Gemini `generateContent` API.
///
/// The API key travels in the `x-goog-api-key` header, not in the URL, so it
/// never shows up in logs or proxies.
pub struct GeminiEnricher {
    client: Client,
    api_key: String,
    model: String,
    target_language: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

impl GeminiEnricher {
    pub fn new(api_key: String, target_language: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(45))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            target_language,
        })
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    fn build_prompt(&self, title: &str, content: &str) -> String {
        format!(
            "You are a news analyst. For the article below, translate the title \
             into {lang} and write a 2-3 sentence summary in {lang}.\n\
             Respond with only a JSON object of the form \
             {{\"translated_title\": \"...\", \"summary\": \"...\"}}.\n\n\
             Title: {title}\n\nContent: {content}",
            lang = self.target_language,
            title = title,
            content = content,
        )
    }
}

#[async_trait]
impl Enricher for GeminiEnricher {
    fn name(&self) -> String {
        format!("gemini ({})", self.model)
    }

    async fn enrich(&self, title: &str, content: &str) -> Result<Enrichment> {
        let url = format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.model);

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![Part {
                    text: self.build_prompt(title, content),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let kind = match status.as_u16() {
                401 | 403 => "authentication",
                429 => {
                    if body.contains("quota") {
                        "quota exceeded"
                    } else {
                        "rate limited"
                    }
                }
                500..=599 => "server error",
                _ => "request rejected",
            };
            return Err(DashboardError::Enrichment(format!(
                "{} (HTTP {}): {}",
                kind, status, body
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| DashboardError::Enrichment("empty model response".to_string()))?;

        let json = extract_json(text)
            .ok_or_else(|| DashboardError::Enrichment("no JSON in model response".to_string()))?;
        let enrichment: Enrichment = serde_json::from_str(&json)
            .map_err(|e| DashboardError::Enrichment(format!("malformed model JSON: {}", e)))?;

        debug!("Enriched \"{}\" via {}", title, self.name());
        Ok(enrichment)
    }
}

/// Pulls a JSON object out of model text that may wrap it in markdown fences
/// or preamble.
fn extract_json(text: &str) -> Option<String> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return Some(text[start..=end].to_string());
        }
    }

    None
}

/// Mock enricher for development and testing. Tracks call counts and peak
/// concurrency so tests can assert dispatch behavior.
pub struct MockEnricher {
    response_delay_ms: u64,
    fail_marker: Option<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockEnricher {
    pub fn new() -> Self {
        Self {
            response_delay_ms: 0,
            fail_marker: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    /// Fail any enrichment whose title contains the marker.
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Enricher for MockEnricher {
    fn name(&self) -> String {
        "mock".to_string()
    }

    async fn enrich(&self, title: &str, content: &str) -> Result<Enrichment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(marker) = &self.fail_marker {
            if title.contains(marker) {
                return Err(DashboardError::Enrichment(format!(
                    "mock failure for \"{}\"",
                    title
                )));
            }
        }

        let summary: String = content.chars().take(120).collect();
        Ok(Enrichment {
            translated_title: format!("[translated] {}", title),
            summary,
        })
    }
}
