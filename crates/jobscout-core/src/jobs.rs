use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One job card as returned by the upstream search API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCard {
    pub job_id: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// A discovered job, stamped with the time of the sweep that first saw it.
///
/// Serialized with the field names the dashboard reads (`jobId`, `jobTitle`,
/// `city`, `state`, `timestamp`). Never mutated after it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(rename = "jobTitle")]
    pub title: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "timestamp")]
    pub first_seen_at: DateTime<Utc>,
}

impl JobRecord {
    #[must_use]
    pub fn from_card(card: JobCard, first_seen_at: DateTime<Utc>) -> Self {
        Self {
            job_id: card.job_id,
            title: card.job_title,
            city: card.city,
            state: card.state,
            first_seen_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn job_card_tolerates_missing_optional_fields() {
        let card: JobCard = serde_json::from_str(r#"{"jobId":"JOB-CA-1"}"#).unwrap();
        assert_eq!(card.job_id, "JOB-CA-1");
        assert!(card.job_title.is_none());
        assert!(card.city.is_none());
    }

    #[test]
    fn job_record_serializes_with_dashboard_field_names() {
        let seen = Utc.with_ymd_and_hms(2025, 12, 20, 14, 0, 0).unwrap();
        let record = JobRecord::from_card(
            JobCard {
                job_id: "JOB-CA-7".to_string(),
                job_title: Some("Warehouse Associate".to_string()),
                city: Some("Calgary".to_string()),
                state: Some("AB".to_string()),
            },
            seen,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["jobId"], "JOB-CA-7");
        assert_eq!(value["jobTitle"], "Warehouse Associate");
        assert_eq!(value["city"], "Calgary");
        assert_eq!(value["state"], "AB");
        assert!(value["timestamp"].as_str().unwrap().starts_with("2025-12-20T14:00:00"));
    }
}
