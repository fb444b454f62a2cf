//! Rank Source capability and an HTTP client for CLIP-style `/rank` services.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::types::{LogoError, LogoResult, PromptScore, RankedCandidate};

/// Description used when the caller supplies no entity name.
pub const DEFAULT_DESCRIPTION: &str = "a tech company or university";

/// Generic prompt whose runner-up position confirms a name match.
pub const COMPANY_LOGO_PROMPT: &str = "a company logo";

/// Fixed distractor prompts ranked alongside the target prompt.
pub const DISTRACTOR_PROMPTS: [&str; 9] = [
    COMPANY_LOGO_PROMPT,
    "a photo of a person",
    "a photo of an animal",
    "the facebook logo",
    "the google logo",
    "the instagram logo",
    "a social media logo",
    "abstract art",
    "a photo of nothing",
];

/// The prompt that names the target entity.
pub fn target_prompt(prefix: &str, entity_name: &str) -> String {
    format!("{prefix} {entity_name}")
}

/// The entity description sent to the ranker; empty names fall back to
/// [`DEFAULT_DESCRIPTION`].
pub fn entity_description(entity_name: &str) -> &str {
    if entity_name.trim().is_empty() {
        DEFAULT_DESCRIPTION
    } else {
        entity_name
    }
}

/// The full prompt list, target last.
pub fn rank_prompts(prefix: &str, entity_name: &str) -> Vec<String> {
    let description = entity_description(entity_name);
    let mut prompts: Vec<String> = DISTRACTOR_PROMPTS.iter().map(|p| p.to_string()).collect();
    prompts.push(target_prompt(prefix, description));
    prompts
}

/// Ranks an uploaded image against the fixed prompt list.
#[async_trait]
pub trait RankSource: Send + Sync {
    /// Return prompt matches ordered most similar first.
    async fn rank(
        &self,
        image_address: &str,
        entity_name: &str,
        prefix: &str,
    ) -> LogoResult<Vec<PromptScore>>;
}

/// Keep the two best matches; fewer than two is a rank failure.
pub fn into_ranked(address: &str, scores: Vec<PromptScore>) -> LogoResult<RankedCandidate> {
    let mut it = scores.into_iter();
    match (it.next(), it.next()) {
        (Some(top), Some(second)) => Ok(RankedCandidate {
            address: address.to_string(),
            top_two: [top, second],
        }),
        _ => Err(LogoError::Rank(format!(
            "Fewer than two prompt matches for {address}"
        ))),
    }
}

#[derive(Debug, Serialize)]
struct RankRequest {
    data: Vec<RankDocument>,
    #[serde(rename = "execEndpoint")]
    exec_endpoint: &'static str,
}

#[derive(Debug, Serialize)]
struct RankDocument {
    uri: String,
    matches: Vec<PromptText>,
}

#[derive(Debug, Serialize)]
struct PromptText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct RankResponse {
    data: Vec<RankedDocument>,
}

#[derive(Debug, Deserialize)]
struct RankedDocument {
    #[serde(default)]
    matches: Vec<RankedMatch>,
}

#[derive(Debug, Deserialize)]
struct RankedMatch {
    text: String,
    scores: MatchScores,
}

#[derive(Debug, Deserialize)]
struct MatchScores {
    clip_score: ScoreValue,
    clip_score_cosine: ScoreValue,
}

#[derive(Debug, Deserialize)]
struct ScoreValue {
    value: f64,
}

/// HTTP client for a CLIP-as-service style ranking endpoint.
#[derive(Clone)]
pub struct HttpRankSource {
    client: reqwest::Client,
    endpoint: String,
    authorization: Option<String>,
}

impl HttpRankSource {
    pub fn new(endpoint: impl Into<String>, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
            authorization: None,
        }
    }

    /// Send this value verbatim as the `Authorization` header.
    pub fn with_authorization(mut self, value: Option<String>) -> Self {
        self.authorization = value;
        self
    }

    /// Turn local `file://` uploads into inline data URIs the service can read.
    async fn resolve_uri(address: &str) -> LogoResult<String> {
        let Some(path) = address.strip_prefix("file://") else {
            return Ok(address.to_string());
        };
        let bytes = tokio::fs::read(path).await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("data:image/png;base64,{encoded}"))
    }
}

#[async_trait]
impl RankSource for HttpRankSource {
    async fn rank(
        &self,
        image_address: &str,
        entity_name: &str,
        prefix: &str,
    ) -> LogoResult<Vec<PromptScore>> {
        let request = RankRequest {
            data: vec![RankDocument {
                uri: Self::resolve_uri(image_address).await?,
                matches: rank_prompts(prefix, entity_name)
                    .into_iter()
                    .map(|text| PromptText { text })
                    .collect(),
            }],
            exec_endpoint: "/rank",
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(auth) = &self.authorization {
            builder = builder.header("Authorization", auth.as_str());
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(LogoError::Status {
                url: self.endpoint.clone(),
                status,
            });
        }

        let body: RankResponse = resp
            .json()
            .await
            .map_err(|e| LogoError::Rank(format!("Malformed rank response: {e}")))?;

        let document = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| LogoError::Rank("Rank response has no documents".to_string()))?;

        Ok(document
            .matches
            .into_iter()
            .map(|m| {
                PromptScore::new(
                    m.text,
                    m.scores.clip_score.value,
                    m.scores.clip_score_cosine.value,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_target_last() {
        let prompts = rank_prompts("the logo of", "Acme");
        assert_eq!(prompts.len(), 10);
        assert_eq!(prompts[0], "a company logo");
        assert_eq!(prompts[9], "the logo of Acme");
    }

    #[test]
    fn test_prompts_default_description() {
        let prompts = rank_prompts("the logo of", "");
        assert_eq!(prompts[9], "the logo of a tech company or university");
    }

    #[test]
    fn test_into_ranked_needs_two() {
        let one = vec![PromptScore::new("a company logo", 0.9, 0.3)];
        assert!(matches!(into_ranked("x", one), Err(LogoError::Rank(_))));

        let three = vec![
            PromptScore::new("the logo of Acme", 0.9, 0.3),
            PromptScore::new("a company logo", 0.05, 0.2),
            PromptScore::new("abstract art", 0.01, 0.1),
        ];
        let ranked = into_ranked("x", three).unwrap();
        assert_eq!(ranked.top().prompt_text, "the logo of Acme");
        assert_eq!(ranked.second().prompt_text, "a company logo");
    }

    #[tokio::test]
    async fn test_resolve_remote_uri_untouched() {
        let uri = HttpRankSource::resolve_uri("https://cdn.example/x.png").await.unwrap();
        assert_eq!(uri, "https://cdn.example/x.png");
    }

    #[tokio::test]
    async fn test_resolve_file_uri_inlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let uri = HttpRankSource::resolve_uri(&format!("file://{}", path.display()))
            .await
            .unwrap();
        assert_eq!(uri, "data:image/png;base64,AQID");
    }
}
