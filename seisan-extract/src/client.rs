//! Gemini Files API + generateContent client.
//!
//! Flow: upload the PDF, poll the file until the service finishes
//! processing it, then run the extraction prompt against it. The poll is
//! bounded by a deadline and an attempt cap, and checks a caller-owned
//! cancellation flag between polls, so a wedged remote job surfaces as an
//! error instead of an infinite wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::json;

use seisan_core::ReceiptRecord;

use crate::prompt;

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Bounds on the wait for remote document processing.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(180),
            max_attempts: 180,
        }
    }
}

/// Processing state reported by the Files API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FileState {
    #[serde(rename = "PROCESSING")]
    Processing,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(other)]
    Unknown,
}

/// Remote file handle returned by the Files API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    pub uri: String,
    pub state: FileState,
    #[serde(default)]
    pub mime_type: Option<String>,
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    /// Upload a PDF for analysis. The handle usually comes back still in
    /// the PROCESSING state.
    pub async fn upload_pdf(&self, bytes: Vec<u8>) -> Result<UploadedFile> {
        #[derive(Deserialize)]
        struct Resp {
            file: UploadedFile,
        }

        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);
        let resp = self
            .http
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(bytes)
            .send()
            .await
            .context("file upload request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("file upload failed: {status} {txt}");
        }
        let out: Resp = resp.json().await.context("parse upload response")?;
        Ok(out.file)
    }

    /// Fetch current metadata for an uploaded file.
    pub async fn get_file(&self, name: &str) -> Result<UploadedFile> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("file status request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("file status failed: {status} {txt}");
        }
        Ok(resp.json().await.context("parse file status response")?)
    }

    /// Poll until the service finishes processing the upload. Cancellation
    /// is checked between polls; a FAILED terminal state is fatal for the
    /// invocation, no partial results are produced.
    pub async fn wait_until_active(
        &self,
        mut file: UploadedFile,
        policy: &PollPolicy,
        cancel: &AtomicBool,
    ) -> Result<UploadedFile> {
        let deadline = Instant::now() + policy.timeout;
        let mut attempts = 0u32;

        while file.state == FileState::Processing {
            if cancel.load(Ordering::Relaxed) {
                bail!("extraction cancelled");
            }
            if Instant::now() >= deadline {
                bail!(
                    "remote processing did not finish within {}s",
                    policy.timeout.as_secs()
                );
            }
            attempts += 1;
            if attempts > policy.max_attempts {
                bail!("remote processing still pending after {} polls", policy.max_attempts);
            }
            tokio::time::sleep(policy.interval).await;
            file = self.get_file(&file.name).await?;
        }

        if file.state != FileState::Active {
            bail!("remote file processing failed (state {:?})", file.state);
        }
        Ok(file)
    }

    /// Run the extraction prompt against a processed file and parse the
    /// structured response.
    pub async fn extract_receipts(&self, file: &UploadedFile) -> Result<Vec<ReceiptRecord>> {
        let body = json!({
            "systemInstruction": { "parts": [ { "text": prompt::SYSTEM_INSTRUCTION } ] },
            "contents": [ {
                "role": "user",
                "parts": [
                    { "fileData": {
                        "fileUri": file.uri,
                        "mimeType": file.mime_type.as_deref().unwrap_or("application/pdf")
                    } },
                    { "text": prompt::USER_REQUEST }
                ]
            } ],
            "generationConfig": {
                "temperature": 0,
                "responseMimeType": "application/json"
            }
        });

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("generateContent request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("generateContent failed: {status} {txt}");
        }

        let out: GenerateResponse = resp.json().await.context("parse generateContent response")?;
        let text = out.concatenated_text();
        if text.trim().is_empty() {
            bail!("model returned no content");
        }
        parse_records(&text)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn concatenated_text(&self) -> String {
        let mut s = String::new();
        for c in &self.candidates {
            if let Some(content) = &c.content {
                for p in &content.parts {
                    if let Some(t) = &p.text {
                        s.push_str(t);
                    }
                }
            }
        }
        s
    }
}

/// Parse the model's JSON output into records. A fenced code block is
/// tolerated even though the call requests a bare JSON response.
pub fn parse_records(text: &str) -> Result<Vec<ReceiptRecord>> {
    let trimmed = strip_code_fence(text.trim());
    serde_json::from_str(trimmed).context("extraction output was not a JSON array of receipts")
}

fn strip_code_fence(s: &str) -> &str {
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    s.strip_suffix("```").unwrap_or(s).trim()
}

/// End-to-end extraction: upload, bounded wait, analyze.
pub async fn extract_from_pdf(
    client: &GeminiClient,
    pdf: Vec<u8>,
    policy: &PollPolicy,
    cancel: &AtomicBool,
) -> Result<Vec<ReceiptRecord>> {
    let uploaded = client.upload_pdf(pdf).await?;
    let active = client.wait_until_active(uploaded, policy, cancel).await?;
    client.extract_receipts(&active).await
}
