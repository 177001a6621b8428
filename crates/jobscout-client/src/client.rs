//! HTTP client for the upstream job-search GraphQL endpoint.
//!
//! Wraps `reqwest` with the browser-like headers the endpoint expects, builds
//! the `searchJobCardsByLocation` payload for one target location and maps
//! every failure onto [`ClientError`]. No retries happen here: a failed
//! location is simply tried again on the next sweep.

use std::time::Duration;

use chrono::NaiveDate;
use jobscout_core::{JobCard, TargetLocation};
use reqwest::{Client, Url};

use crate::error::{is_auth_message, is_auth_status, ClientError};
use crate::source::JobSource;
use crate::types::{
    DateFilter, DateRange, GeoQueryClause, GraphqlResponse, SearchJobRequest, SearchRequestBody,
    SearchVariables, OPERATION_NAME, SEARCH_QUERY,
};

const HIRING_ORIGIN: &str = "https://hiring.amazon.ca";
const HIRING_REFERER: &str = "https://hiring.amazon.ca/";

/// Query and transport settings for [`JobSearchClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Longest wait for the next chunk of a response.
    pub read_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    pub locale: String,
    pub country: String,
    pub page_size: u32,
    pub radius_km: u32,
    pub start_date: Option<NaiveDate>,
}

impl ClientSettings {
    #[must_use]
    pub fn from_app_config(config: &jobscout_core::AppConfig) -> Self {
        Self {
            read_timeout_secs: config.request_timeout_secs,
            connect_timeout_secs: config.connect_timeout_secs,
            user_agent: config.user_agent.clone(),
            locale: config.locale.clone(),
            country: config.country.clone(),
            page_size: config.page_size,
            radius_km: config.search_radius_km,
            start_date: config.start_date_filter,
        }
    }
}

/// Client for the upstream job-search API.
///
/// Use [`JobSearchClient::new`] with the production endpoint or point it at a
/// mock server in tests.
pub struct JobSearchClient {
    client: Client,
    api_url: Url,
    settings: ClientSettings,
}

impl JobSearchClient {
    /// Creates a client for the given GraphQL endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidUrl`] if `api_url`
    /// does not parse.
    pub fn new(api_url: &str, settings: ClientSettings) -> Result<Self, ClientError> {
        let client = Client::builder()
            .read_timeout(Duration::from_secs(settings.read_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        let api_url = Url::parse(api_url).map_err(|e| ClientError::InvalidUrl {
            url: api_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_url,
            settings,
        })
    }

    /// Fetches the job cards visible around one target location.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Auth`] for HTTP 401/403/404 or an in-band auth error.
    /// - [`ClientError::UnexpectedStatus`] for any other non-2xx status.
    /// - [`ClientError::Api`] for an in-band error unrelated to auth.
    /// - [`ClientError::Transport`] on network failure or timeout.
    /// - [`ClientError::Deserialize`] if the body is not the expected JSON.
    pub async fn search_location(
        &self,
        credential: &str,
        location: &TargetLocation,
    ) -> Result<Vec<JobCard>, ClientError> {
        let body = self.request_body(location);

        let response = self
            .client
            .post(self.api_url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "*/*")
            .header(reqwest::header::ORIGIN, HIRING_ORIGIN)
            .header(reqwest::header::REFERER, HIRING_REFERER)
            .header(reqwest::header::AUTHORIZATION, credential)
            .header("Country", self.settings.country.as_str())
            .header("iscanary", "false")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(location = %location.name, %status, "job search: response received");
        if is_auth_status(status.as_u16()) {
            return Err(ClientError::Auth {
                status: status.as_u16(),
                message: format!("credential rejected with HTTP {status}"),
            });
        }
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.api_url.to_string(),
            });
        }

        let text = response.text().await?;
        let parsed = serde_json::from_str::<GraphqlResponse>(&text).map_err(|e| {
            ClientError::Deserialize {
                context: format!("{OPERATION_NAME}({})", location.name),
                source: e,
            }
        })?;

        Self::extract_cards(status.as_u16(), parsed)
    }

    /// Turns a parsed GraphQL envelope into job cards, surfacing any in-band
    /// errors. An auth-class error anywhere in the list wins over the rest.
    fn extract_cards(status: u16, response: GraphqlResponse) -> Result<Vec<JobCard>, ClientError> {
        if !response.errors.is_empty() {
            let message = response
                .errors
                .iter()
                .filter_map(|e| e.message.as_deref())
                .collect::<Vec<_>>()
                .join("; ");
            let auth = response
                .errors
                .iter()
                .any(|e| is_auth_message(e.error_type.as_deref(), e.message.as_deref()));
            tracing::debug!(status, auth, %message, "job search: in-band errors");
            if auth {
                return Err(ClientError::Auth { status, message });
            }
            return Err(ClientError::Api(if message.is_empty() {
                "unknown GraphQL error".to_string()
            } else {
                message
            }));
        }

        response
            .data
            .and_then(|d| d.search_job_cards_by_location)
            .map(|page| page.job_cards)
            .ok_or_else(|| {
                ClientError::Api(format!("response is missing {OPERATION_NAME} data"))
            })
    }

    fn request_body(&self, location: &TargetLocation) -> SearchRequestBody<'_> {
        let date_filters = self
            .settings
            .start_date
            .map(|date| DateFilter {
                key: "firstDayOnSite",
                range: DateRange {
                    start_date: date.format("%Y-%m-%d").to_string(),
                },
            })
            .into_iter()
            .collect();

        SearchRequestBody {
            operation_name: OPERATION_NAME,
            variables: SearchVariables {
                search_job_request: SearchJobRequest {
                    locale: &self.settings.locale,
                    country: &self.settings.country,
                    page_size: self.settings.page_size,
                    geo_query_clause: GeoQueryClause {
                        lat: location.lat,
                        lng: location.lng,
                        unit: "km",
                        distance: self.settings.radius_km,
                    },
                    date_filters,
                },
            },
            query: SEARCH_QUERY,
        }
    }
}

impl JobSource for JobSearchClient {
    async fn search(
        &self,
        credential: &str,
        location: &TargetLocation,
    ) -> Result<Vec<JobCard>, ClientError> {
        self.search_location(credential, location).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GraphqlError;

    fn test_settings() -> ClientSettings {
        ClientSettings {
            read_timeout_secs: 5,
            connect_timeout_secs: 5,
            user_agent: "jobscout-test/0.1".to_owned(),
            locale: "en-CA".to_owned(),
            country: "Canada".to_owned(),
            page_size: 100,
            radius_km: 100,
            start_date: NaiveDate::from_ymd_opt(2025, 12, 18),
        }
    }

    #[test]
    fn new_rejects_invalid_url() {
        let result = JobSearchClient::new("not a url", test_settings());
        assert!(matches!(result, Err(ClientError::InvalidUrl { .. })));
    }

    #[test]
    fn request_body_carries_location_and_date_filter() {
        let client = JobSearchClient::new("https://api.example.com/graphql", test_settings())
            .expect("client construction should not fail");
        let location = TargetLocation::new("Winnipeg", 49.8951, -97.1384);
        let value = serde_json::to_value(client.request_body(&location)).unwrap();
        let request = &value["variables"]["searchJobRequest"];
        assert_eq!(request["geoQueryClause"]["lat"], 49.8951);
        assert_eq!(request["geoQueryClause"]["lng"], -97.1384);
        assert_eq!(request["geoQueryClause"]["distance"], 100);
        assert_eq!(request["dateFilters"][0]["key"], "firstDayOnSite");
        assert_eq!(request["dateFilters"][0]["range"]["startDate"], "2025-12-18");
    }

    #[test]
    fn extract_cards_prefers_auth_error() {
        let response = GraphqlResponse {
            data: None,
            errors: vec![
                GraphqlError {
                    message: Some("Rate exceeded".to_owned()),
                    error_type: Some("Throttled".to_owned()),
                },
                GraphqlError {
                    message: Some("Token has expired".to_owned()),
                    error_type: None,
                },
            ],
        };
        let err = JobSearchClient::extract_cards(200, response).unwrap_err();
        assert!(matches!(err, ClientError::Auth { status: 200, .. }));
    }

    #[test]
    fn extract_cards_missing_data_is_api_error() {
        let response = GraphqlResponse {
            data: None,
            errors: Vec::new(),
        };
        let err = JobSearchClient::extract_cards(200, response).unwrap_err();
        assert!(matches!(err, ClientError::Api(_)));
    }
}
