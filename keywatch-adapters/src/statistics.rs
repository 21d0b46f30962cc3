//! Validator statistics from the network API.
//!
//! The endpoint returns the ratings of every validator on the network:
//!
//! ```json
//! {"data":{"statistics":{"<hex key>":{"tempRating":97.1,"rating":99.5}}},"error":"","code":"successful"}
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use keywatch_types::RatingsMap;

use crate::http::HttpTransport;
use crate::AdapterError;

const STATISTICS_ENDPOINT: &str = "validator/statistics";

/// Source of the per-cycle ratings snapshot.
#[async_trait]
pub trait StatisticsQuerier: Send + Sync {
    async fn query(&self, cancel: &CancellationToken) -> Result<RatingsMap, AdapterError>;
}

#[derive(Debug, Deserialize)]
struct StatisticsResponse {
    #[serde(default)]
    data: Option<StatisticsData>,
}

#[derive(Debug, Deserialize)]
struct StatisticsData {
    #[serde(default)]
    statistics: Option<RatingsMap>,
}

/// Queries `validator/statistics` on a node or proxy API.
pub struct ValidatorStatisticsQuerier {
    transport: Arc<dyn HttpTransport>,
}

impl ValidatorStatisticsQuerier {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl StatisticsQuerier for ValidatorStatisticsQuerier {
    async fn query(&self, cancel: &CancellationToken) -> Result<RatingsMap, AdapterError> {
        let response = self
            .transport
            .get(cancel, STATISTICS_ENDPOINT)
            .await?
            .error_for_status()?;

        let decoded: StatisticsResponse = serde_json::from_slice(&response.body)?;
        let statistics = decoded
            .data
            .and_then(|data| data.statistics)
            .ok_or(AdapterError::InvalidResponse)?;

        tracing::debug!(num_keys = statistics.len(), "fetched validator statistics");
        Ok(statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubTransport;
    use keywatch_types::RatingRecord;

    fn querier(transport: StubTransport) -> (ValidatorStatisticsQuerier, Arc<StubTransport>) {
        let transport = Arc::new(transport);
        (ValidatorStatisticsQuerier::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn decodes_statistics() {
        let body = r#"{
            "data": {"statistics": {
                "bls1": {"tempRating": 90.5, "rating": 95, "numLeaderSuccess": 3},
                "bls2": {"tempRating": 5, "rating": 50}
            }},
            "error": "",
            "code": "successful"
        }"#;
        let (querier, transport) = querier(StubTransport::replying(200, body));

        let ratings = querier.query(&CancellationToken::new()).await.unwrap();

        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings["bls1"], RatingRecord::new(90.5, 95.0));
        assert_eq!(ratings["bls2"], RatingRecord::new(5.0, 50.0));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].endpoint, "validator/statistics");
    }

    #[tokio::test]
    async fn empty_statistics_is_not_an_error() {
        let (querier, _) = querier(StubTransport::replying(200, r#"{"data":{"statistics":{}}}"#));
        let ratings = querier.query(&CancellationToken::new()).await.unwrap();
        assert!(ratings.is_empty());
    }

    #[tokio::test]
    async fn missing_statistics_is_invalid_response() {
        for body in [r#"{"data":{}}"#, r#"{"data":{"statistics":null}}"#, r#"{}"#] {
            let (querier, _) = querier(StubTransport::replying(200, body));
            let err = querier.query(&CancellationToken::new()).await.unwrap_err();
            assert!(matches!(err, AdapterError::InvalidResponse), "body {body}");
        }
    }

    #[tokio::test]
    async fn non_2xx_status_fails() {
        let (querier, _) = querier(StubTransport::replying(500, "{}"));
        let err = querier.query(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Status(500)));
    }

    #[tokio::test]
    async fn malformed_body_fails_to_parse() {
        let (querier, _) = querier(StubTransport::replying(200, "not json"));
        let err = querier.query(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Parse(_)));
    }

    #[tokio::test]
    async fn transport_error_is_propagated() {
        let (querier, _) = querier(StubTransport::new(|_, _| {
            Err(AdapterError::Connection("refused".into()))
        }));
        let err = querier.query(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Connection(_)));
    }
}
