use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Client for the sandboxed Python execution service. The sandbox owns a
/// working directory per session; uploaded datasets and matplotlib output
/// live there for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct SandboxServiceClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("sandbox request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("sandbox returned malformed image data: {0}")]
    BadImage(#[from] base64::DecodeError),
    #[error("sandbox rejected request: {0}")]
    Rejected(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadRequest {
    pub session_id: String,
    pub filename: String,
    /// Base64 encoded file data
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub path: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub session_id: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// Base64 encoded PNGs saved during the run, in creation order
    #[serde(default)]
    pub images: Vec<String>,
    /// Traceback text when the code itself failed; transport stays Ok
    pub error: Option<String>,
    pub success: bool,
}

/// Result of one code execution with images decoded to raw bytes
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub images: Vec<Vec<u8>>,
    pub error: Option<String>,
}

impl SandboxServiceClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, base_url }
    }

    pub async fn create_session(&self) -> Result<String, SandboxError> {
        let url = format!("{}/sandbox/sessions", self.base_url);
        let response = self.client.post(&url).send().await?;
        let result: CreateSessionResponse = response.json().await?;
        if !result.success {
            return Err(SandboxError::Rejected(
                result.error.unwrap_or_else(|| "session creation failed".to_string()),
            ));
        }
        Ok(result.session_id)
    }

    pub async fn upload_csv(
        &self,
        session_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, SandboxError> {
        let url = format!("{}/sandbox/upload", self.base_url);
        let request = UploadRequest {
            session_id: session_id.to_string(),
            filename: filename.to_string(),
            data: BASE64.encode(bytes),
        };
        let response = self.client.post(&url).json(&request).send().await?;
        let result: UploadResponse = response.json().await?;
        if !result.success {
            return Err(SandboxError::Rejected(
                result.error.unwrap_or_else(|| "upload failed".to_string()),
            ));
        }
        Ok(result.path)
    }

    /// Run Python source in the session's working directory. Code failures
    /// (tracebacks) come back in-band in `ExecutionResult::error`.
    pub async fn run_code(
        &self,
        session_id: &str,
        code: &str,
    ) -> Result<ExecutionResult, SandboxError> {
        let url = format!("{}/sandbox/execute", self.base_url);
        let request = ExecuteRequest {
            session_id: session_id.to_string(),
            code: code.to_string(),
        };
        let response = self.client.post(&url).json(&request).send().await?;
        let result: ExecuteResponse = response.json().await?;

        let mut images = Vec::with_capacity(result.images.len());
        for encoded in &result.images {
            images.push(BASE64.decode(encoded.as_bytes())?);
        }

        let mut error = result.error;
        if error.is_none() && !result.success {
            error = Some("execution failed without a reported error".to_string());
        }

        Ok(ExecutionResult {
            stdout: result.stdout,
            stderr: result.stderr,
            images,
            error,
        })
    }

    /// Best-effort teardown; the sandbox reaps idle sessions on its own
    pub async fn close_session(&self, session_id: &str) {
        let url = format!("{}/sandbox/sessions/{}/close", self.base_url, session_id);
        if let Err(e) = self.client.post(&url).send().await {
            warn!("Failed to close sandbox session {}: {}", session_id, e);
        }
    }

    pub async fn health_check(&self) -> Result<bool, SandboxError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_response_decodes_images_in_order() {
        let json = serde_json::json!({
            "stdout": "done",
            "stderr": "",
            "images": [BASE64.encode(b"png-one"), BASE64.encode(b"png-two")],
            "error": null,
            "success": true,
        });
        let response: ExecuteResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.images.len(), 2);
        assert_eq!(BASE64.decode(&response.images[0]).unwrap(), b"png-one");
        assert_eq!(BASE64.decode(&response.images[1]).unwrap(), b"png-two");
    }

    #[test]
    fn execute_response_tolerates_missing_fields() {
        let response: ExecuteResponse =
            serde_json::from_str(r#"{"success": false, "error": "NameError: df"}"#).unwrap();
        assert!(response.images.is_empty());
        assert_eq!(response.error.as_deref(), Some("NameError: df"));
    }
}
