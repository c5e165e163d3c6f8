//! OAuth token lookup and the usage endpoint.

use super::{UsageData, UsageLimit};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const API_URL: &str = "https://api.anthropic.com/api/oauth/usage";
const API_BETA: &str = "oauth-2025-04-20";
const API_TIMEOUT: Duration = Duration::from_secs(3);
const KEYCHAIN_SERVICE: &str = "Claude Code-credentials";
const KEYCHAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Where usage data comes from.
#[async_trait]
pub trait UsageBackend: Send + Sync {
    /// OAuth access token, if the user is logged in.
    async fn token(&self) -> Option<String>;

    /// Fresh usage data; `None` on any failure.
    async fn fetch(&self, token: &str) -> Option<UsageData>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credentials {
    claude_ai_oauth: Option<OAuthEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuthEntry {
    access_token: Option<String>,
}

/// Access token from a credentials JSON payload.
fn parse_credentials(json: &str) -> Option<String> {
    let creds: Credentials = serde_json::from_str(json.trim()).ok()?;
    creds
        .claude_ai_oauth?
        .access_token
        .filter(|t| !t.is_empty())
}

/// `~/.claude/.credentials.json`
pub fn credentials_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join(".credentials.json"))
}

fn file_token(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_credentials(&content)
}

/// Token from the macOS keychain. Always `None` elsewhere.
async fn keychain_token() -> Option<String> {
    if !cfg!(target_os = "macos") {
        return None;
    }
    let mut cmd = Command::new("/usr/bin/security");
    cmd.args(["find-generic-password", "-s", KEYCHAIN_SERVICE, "-w"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    let output = match tokio::time::timeout(KEYCHAIN_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(_)) => return None,
        Ok(Err(e)) => {
            debug!("Keychain lookup failed: {e}");
            return None;
        }
        Err(_) => {
            debug!("Keychain lookup timed out");
            return None;
        }
    };
    parse_credentials(&String::from_utf8_lossy(&output.stdout))
}

/// Keychain first, then the credentials file.
pub async fn resolve_token(credentials: Option<&Path>) -> Option<String> {
    if let Some(token) = keychain_token().await {
        return Some(token);
    }
    credentials.and_then(file_token)
}

#[derive(Deserialize)]
struct ApiLimit {
    utilization: Option<f64>,
    resets_at: Option<DateTime<Utc>>,
}

impl ApiLimit {
    fn into_limit(self) -> Option<UsageLimit> {
        Some(UsageLimit {
            utilization: self.utilization?,
            resets_at: self.resets_at,
        })
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    five_hour: Option<ApiLimit>,
    seven_day: Option<ApiLimit>,
    seven_day_sonnet: Option<ApiLimit>,
}

/// Map the endpoint's windows onto [`UsageData`].
pub fn parse_api_response(json: &str, fetched_at: DateTime<Utc>) -> serde_json::Result<UsageData> {
    let response: ApiResponse = serde_json::from_str(json)?;
    Ok(UsageData {
        session: response.five_hour.and_then(ApiLimit::into_limit),
        weekly: response.seven_day.and_then(ApiLimit::into_limit),
        sonnet: response.seven_day_sonnet.and_then(ApiLimit::into_limit),
        fetched_at,
    })
}

/// The real thing: keychain/credentials file and the Anthropic API.
pub struct AnthropicBackend {
    client: reqwest::Client,
    credentials: Option<PathBuf>,
}

impl AnthropicBackend {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            credentials: credentials_path(),
        }
    }
}

impl Default for AnthropicBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageBackend for AnthropicBackend {
    async fn token(&self) -> Option<String> {
        resolve_token(self.credentials.as_deref()).await
    }

    async fn fetch(&self, token: &str) -> Option<UsageData> {
        let response = match self
            .client
            .get(API_URL)
            .bearer_auth(token)
            .header("anthropic-beta", API_BETA)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("Usage request failed: {e}");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("Usage request returned {}", response.status());
            return None;
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Usage response unreadable: {e}");
                return None;
            }
        };
        match parse_api_response(&body, Utc::now()) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!("Usage response malformed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_credentials() {
        assert_eq!(
            parse_credentials(
                r#"{"claudeAiOauth": {"accessToken": "sk-ant-oat01-abc", "refreshToken": "r"}}"#
            ),
            Some("sk-ant-oat01-abc".to_string())
        );
        assert_eq!(parse_credentials(r#"{"claudeAiOauth": {}}"#), None);
        assert_eq!(parse_credentials(r#"{"other": 1}"#), None);
        assert_eq!(parse_credentials("not json"), None);
    }

    #[test]
    fn test_file_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        assert_eq!(file_token(&path), None);

        std::fs::write(&path, r#"{"claudeAiOauth": {"accessToken": "tok"}}"#).unwrap();
        assert_eq!(file_token(&path).as_deref(), Some("tok"));
    }

    #[test]
    fn test_parse_api_response() {
        let now = Utc.with_ymd_and_hms(2025, 1, 16, 12, 0, 0).unwrap();
        let data = parse_api_response(
            r#"{
                "five_hour": {"utilization": 42.0, "resets_at": "2025-01-16T14:59:59.943648+00:00"},
                "seven_day": {"utilization": 17, "resets_at": null},
                "seven_day_sonnet": {"utilization": null, "resets_at": null},
                "seven_day_opus": null
            }"#,
            now,
        )
        .unwrap();

        let session = data.session.unwrap();
        assert_eq!(session.utilization, 42.0);
        assert_eq!(session.resets_at.unwrap().format("%H:%M").to_string(), "14:59");
        let weekly = data.weekly.unwrap();
        assert_eq!(weekly.utilization, 17.0);
        assert!(weekly.resets_at.is_none());
        assert!(data.sonnet.is_none());
        assert_eq!(data.fetched_at, now);
    }

    #[test]
    fn test_parse_api_response_missing_windows() {
        let data = parse_api_response("{}", Utc::now()).unwrap();
        assert!(data.session.is_none() && data.weekly.is_none() && data.sonnet.is_none());
        assert!(parse_api_response("[]", Utc::now()).is_err());
    }
}
