//! TNRS (Taxonomic Name Resolution Service) client.
use crate::authority::{Authority, MatchType, NameMatch, NameResolver, Source};
use crate::config::TnrsConfig;
use crate::error::{CrateError, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

const SERVICE: &str = "TNRS";
const MIN_VALID_SCORE: f64 = 0.5;

#[derive(Debug, Serialize)]
struct TnrsRequest<'a> {
    names: Vec<&'a str>,
    sources: String,
    mode: &'static str,
    matches: &'static str,
    accuracy: f64,
}

#[derive(Debug, Deserialize)]
struct TnrsResponse {
    #[serde(default)]
    data: Vec<TnrsRecord>,
}

#[derive(Debug, Deserialize)]
struct TnrsRecord {
    #[serde(rename = "Name_matched", default)]
    name_matched: Option<String>,
    #[serde(rename = "Accepted_name", default)]
    accepted_name: Option<String>,
    #[serde(rename = "Overall_score", default)]
    overall_score: Option<Score>,
    #[serde(rename = "Match_summary", default)]
    match_summary: Option<String>,
    #[serde(rename = "Synonyms", default)]
    synonyms: Option<Synonyms>,
}

// TNRS serializes numbers as strings in some deployments
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Score {
    Number(f64),
    Text(String),
}

impl Score {
    fn value(&self) -> f64 {
        let raw = match self {
            Score::Number(value) => *value,
            Score::Text(text) => text.trim().parse().unwrap_or_else(|_| {
                warn!("Unparsable TNRS score {:?}; treating it as 0", text);
                0.0
            }),
        };
        if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Synonyms {
    List(Vec<String>),
    Text(String),
}

impl Synonyms {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            Synonyms::List(items) => items,
            Synonyms::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

pub struct TnrsClient {
    client: reqwest::Client,
    config: TnrsConfig,
}

impl TnrsClient {
    pub fn new(client: reqwest::Client, config: TnrsConfig) -> Self {
        Self { client, config }
    }

    /// Resolves `name` and reads back the best-ranked match only.
    pub async fn resolve_name(&self, name: &str, allow_partial: bool) -> Result<Option<NameMatch>> {
        let request = TnrsRequest {
            names: vec![name],
            sources: self.config.sources.join(","),
            mode: "resolve",
            matches: "all",
            accuracy: self.config.accuracy,
        };

        debug!("Querying TNRS for {} (partial: {})", name, allow_partial);
        let response = self
            .client
            .post(&self.config.url)
            .timeout(self.config.endpoint().timeout())
            .json(&request)
            .send()
            .await
            .map_err(CrateError::ApiRequestError)?;

        if !response.status().is_success() {
            return Err(CrateError::ApiStatusError {
                service: SERVICE,
                status: response.status(),
            });
        }

        let body = response.text().await.map_err(CrateError::ApiRequestError)?;
        let payload: TnrsResponse =
            serde_json::from_str(&body).map_err(CrateError::ApiResponseParseError)?;

        Ok(payload
            .data
            .into_iter()
            .next()
            .and_then(|record| interpret_record(name, record, allow_partial)))
    }
}

fn interpret_record(name: &str, record: TnrsRecord, allow_partial: bool) -> Option<NameMatch> {
    let matched_name = record
        .name_matched
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    let match_type = MatchType::from_summary(record.match_summary.as_deref().unwrap_or(""));
    if match_type == MatchType::Partial && !allow_partial {
        debug!("TNRS returned a partial match for {}; partial matching not allowed", name);
        return None;
    }

    let confidence = record.overall_score.map(|s| s.value()).unwrap_or(0.0);
    Some(NameMatch {
        original_name: name.to_string(),
        matched_name,
        accepted_name: record
            .accepted_name
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        match_type,
        confidence,
        source: Source::ResolutionService,
        is_valid: confidence >= MIN_VALID_SCORE,
        synonyms: record.synonyms.map(Synonyms::into_vec).unwrap_or_default(),
    })
}

#[async_trait]
impl Authority for TnrsClient {
    fn source(&self) -> Source {
        Source::ResolutionService
    }

    async fn attempt(&self, name: &str) -> Result<Option<NameMatch>> {
        self.resolve_name(name, false).await
    }
}

#[async_trait]
impl NameResolver for TnrsClient {
    async fn resolve(&self, name: &str, allow_partial: bool) -> Result<Option<NameMatch>> {
        self.resolve_name(name, allow_partial).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TnrsClient {
        let config = TnrsConfig {
            url: format!("{}/tnrs", server.uri()),
            ..TnrsConfig::default()
        };
        TnrsClient::new(reqwest::Client::new(), config)
    }

    async fn mount_response(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/tnrs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn reads_the_first_record() {
        let server = MockServer::start().await;
        mount_response(
            &server,
            json!({"data": [
                {
                    "Name_matched": "Chamaerops excelsa",
                    "Accepted_name": "Trachycarpus fortunei",
                    "Overall_score": "0.98",
                    "Match_summary": "Exact match, synonym",
                    "Synonyms": "Chamaerops excelsa, Chamaerops fortunei"
                },
                {"Name_matched": "Something else", "Overall_score": 1.0}
            ]}),
        )
        .await;

        let client = client_for(&server);
        let result = client.resolve_name("Chamaerops excelsa", false).await.unwrap().unwrap();
        assert_eq!(result.matched_name, "Chamaerops excelsa");
        assert_eq!(result.accepted_name, "Trachycarpus fortunei");
        assert_eq!(result.match_type, MatchType::Synonym);
        assert!((result.confidence - 0.98).abs() < 1e-9);
        assert!(result.is_valid);
        assert_eq!(result.source, Source::ResolutionService);
        assert_eq!(
            result.synonyms,
            vec!["Chamaerops excelsa".to_string(), "Chamaerops fortunei".to_string()]
        );
    }

    #[tokio::test]
    async fn sends_resolve_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tnrs"))
            .and(body_partial_json(json!({
                "names": ["Rosa canina"],
                "sources": "wcvp,wfo",
                "mode": "resolve",
                "matches": "all"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
                {"Name_matched": "Rosa canina", "Accepted_name": "Rosa canina",
                 "Overall_score": 1, "Match_summary": "Exact"}
            ]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.resolve_name("Rosa canina", false).await.unwrap();
        assert!(result.unwrap().is_valid);
    }

    #[tokio::test]
    async fn low_score_is_not_valid() {
        let server = MockServer::start().await;
        mount_response(
            &server,
            json!({"data": [{"Name_matched": "Rosa canina", "Overall_score": 0.3,
                             "Match_summary": "Fuzzy match"}]}),
        )
        .await;

        let client = client_for(&server);
        let result = client.resolve_name("Rosa cannina", false).await.unwrap().unwrap();
        assert_eq!(result.match_type, MatchType::Fuzzy);
        assert!(!result.is_valid);
    }

    #[tokio::test]
    async fn partial_matches_need_permission() {
        let server = MockServer::start().await;
        mount_response(
            &server,
            json!({"data": [{"Name_matched": "Rosa", "Accepted_name": "Rosa",
                             "Overall_score": 0.9, "Match_summary": "Partial match (genus)"}]}),
        )
        .await;

        let client = client_for(&server);
        assert!(client.resolve_name("Rosa foo", false).await.unwrap().is_none());
        let partial = client.resolve_name("Rosa foo", true).await.unwrap().unwrap();
        assert_eq!(partial.match_type, MatchType::Partial);
        assert!(partial.is_valid);
    }

    #[tokio::test]
    async fn empty_data_resolves_to_nothing() {
        let server = MockServer::start().await;
        mount_response(&server, json!({"data": []})).await;
        let client = client_for(&server);
        assert!(client.resolve_name("Nothing here", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn server_errors_surface_as_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let client = client_for(&server);
        let result = client.resolve_name("Rosa canina", false).await;
        assert!(matches!(result, Err(CrateError::ApiStatusError { .. })));
    }

    #[tokio::test]
    async fn garbage_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        let client = client_for(&server);
        let result = client.resolve_name("Rosa canina", false).await;
        assert!(matches!(result, Err(CrateError::ApiResponseParseError(_))));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": []}))
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = TnrsConfig {
            url: server.uri(),
            timeout_secs: 1,
            ..TnrsConfig::default()
        };
        let client = TnrsClient::new(reqwest::Client::new(), config);
        let result = client.resolve_name("Rosa canina", false).await;
        assert!(matches!(result, Err(CrateError::ApiRequestError(_))));
    }

    #[tokio::test]
    #[ignore] // Ignored by default to avoid hitting the live TNRS API
    async fn test_resolve_live() {
        let client = TnrsClient::new(reqwest::Client::new(), TnrsConfig::default());
        let result = client.resolve_name("Trachycarpus fortunei", false).await.unwrap();
        assert!(result.is_some());
    }
}
