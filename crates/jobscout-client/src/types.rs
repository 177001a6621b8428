//! Wire types for the `searchJobCardsByLocation` GraphQL operation.

use jobscout_core::JobCard;
use serde::{Deserialize, Serialize};

pub(crate) const OPERATION_NAME: &str = "searchJobCardsByLocation";

pub(crate) const SEARCH_QUERY: &str = "query searchJobCardsByLocation($searchJobRequest: SearchJobRequest!) {
  searchJobCardsByLocation(searchJobRequest: $searchJobRequest) {
    jobCards {
      jobId
      jobTitle
      city
      state
    }
  }
}";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequestBody<'a> {
    pub operation_name: &'static str,
    pub variables: SearchVariables<'a>,
    pub query: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchVariables<'a> {
    pub search_job_request: SearchJobRequest<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchJobRequest<'a> {
    pub locale: &'a str,
    pub country: &'a str,
    pub page_size: u32,
    pub geo_query_clause: GeoQueryClause,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub date_filters: Vec<DateFilter>,
}

#[derive(Debug, Serialize)]
pub struct GeoQueryClause {
    pub lat: f64,
    pub lng: f64,
    pub unit: &'static str,
    pub distance: u32,
}

#[derive(Debug, Serialize)]
pub struct DateFilter {
    pub key: &'static str,
    pub range: DateRange,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<SearchData>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    #[serde(default)]
    pub search_job_cards_by_location: Option<JobCardPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCardPage {
    #[serde(default)]
    pub job_cards: Vec<JobCard>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}
