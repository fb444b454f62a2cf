//! HTTP rank source against a mock CLIP `/rank` service.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use agentic_logo::{HttpRankSource, LogoError, RankSource};

fn rank_response(matches: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": [ { "matches": matches } ] }))
}

#[tokio::test]
async fn test_rank_parses_scores_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rank"))
        .and(body_partial_json(json!({
            "execEndpoint": "/rank",
            "data": [ { "uri": "https://cdn.example/acme.png" } ]
        })))
        .respond_with(rank_response(json!([
            { "text": "the logo of Acme",
              "scores": { "clip_score": { "value": 0.91 }, "clip_score_cosine": { "value": 0.31 } } },
            { "text": "a company logo",
              "scores": { "clip_score": { "value": 0.05 }, "clip_score_cosine": { "value": 0.22 } } },
            { "text": "abstract art",
              "scores": { "clip_score": { "value": 0.01 }, "clip_score_cosine": { "value": 0.12 } } }
        ])))
        .mount(&server)
        .await;

    let ranker = HttpRankSource::new(format!("{}/rank", server.uri()), 5_000);
    let scores = ranker
        .rank("https://cdn.example/acme.png", "Acme", "the logo of")
        .await
        .unwrap();

    assert_eq!(scores.len(), 3);
    assert_eq!(scores[0].prompt_text, "the logo of Acme");
    assert!((scores[0].similarity_score - 0.91).abs() < 1e-9);
    assert!((scores[0].cosine_score - 0.31).abs() < 1e-9);
    assert_eq!(scores[1].prompt_text, "a company logo");
}

#[tokio::test]
async fn test_rank_sends_target_prompt_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "token-123"))
        .and(body_partial_json(json!({
            "data": [ { "matches": [
                { "text": "a company logo" },
                { "text": "a photo of a person" },
                { "text": "a photo of an animal" },
                { "text": "the facebook logo" },
                { "text": "the google logo" },
                { "text": "the instagram logo" },
                { "text": "a social media logo" },
                { "text": "abstract art" },
                { "text": "a photo of nothing" },
                { "text": "the emblem of Acme" }
            ] } ]
        })))
        .respond_with(rank_response(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let ranker = HttpRankSource::new(server.uri(), 5_000)
        .with_authorization(Some("token-123".to_string()));
    let scores = ranker
        .rank("https://cdn.example/acme.png", "Acme", "the emblem of")
        .await
        .unwrap();
    assert!(scores.is_empty());
}

#[tokio::test]
async fn test_rank_service_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let ranker = HttpRankSource::new(server.uri(), 5_000);
    let err = ranker
        .rank("https://cdn.example/acme.png", "Acme", "the logo of")
        .await
        .unwrap_err();
    assert!(matches!(err, LogoError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_rank_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let ranker = HttpRankSource::new(server.uri(), 5_000);
    let err = ranker
        .rank("https://cdn.example/acme.png", "Acme", "the logo of")
        .await
        .unwrap_err();
    assert!(matches!(err, LogoError::Rank(_)));
}
