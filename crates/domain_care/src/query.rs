//! Natural-language doctor searches and their outcome

use std::fmt;

use chrono::{DateTime, Utc};
use core_kernel::{define_record, DoctorId, FieldType, FieldValue, QueryId};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{validate, DomainError};
use crate::TEXT_LIST;

/// How soon the user needs care, as extracted from the query text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Routine,
    Urgent,
    Emergency,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Routine => "routine",
            UrgencyLevel::Urgent => "urgent",
            UrgencyLevel::Emergency => "emergency",
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<UrgencyLevel> for FieldValue {
    fn from(level: UrgencyLevel) -> Self {
        FieldValue::Text(level.as_str().to_string())
    }
}

/// One search submitted by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserQuery {
    pub id: QueryId,

    #[validate(length(min = 1, max = 2000))]
    pub original_query: String,
    /// City, address, or "current location"
    pub user_location: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub user_latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub user_longitude: Option<f64>,

    pub extracted_symptoms: Option<Vec<String>>,
    pub extracted_conditions: Option<Vec<String>>,
    pub extracted_specialties: Option<Vec<String>>,
    pub urgency_level: Option<UrgencyLevel>,
    pub appointment_type: Option<String>,

    #[validate(range(min = 1, max = 500))]
    pub preferred_distance_miles: Option<i32>,
    pub insurance_provider: Option<String>,
    pub insurance_plan: Option<String>,
    pub language_preference: Option<String>,
    pub gender_preference: Option<String>,

    pub search_results_count: Option<i32>,
    pub top_doctor_id: Option<DoctorId>,

    pub session_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,

    #[validate(range(min = 1, max = 5))]
    pub result_rating: Option<i32>,
    pub feedback_text: Option<String>,
    pub appointment_booked: bool,

    pub created_at: DateTime<Utc>,
}

define_record!(UserQuery => "user_queries", unique = id {
    id: FieldType::UUID,
    original_query: FieldType::TEXT,
    user_location: FieldType::TEXT,
    user_latitude: FieldType::FLOAT,
    user_longitude: FieldType::FLOAT,
    extracted_symptoms: TEXT_LIST,
    extracted_conditions: TEXT_LIST,
    extracted_specialties: TEXT_LIST,
    urgency_level: FieldType::TEXT,
    appointment_type: FieldType::TEXT,
    preferred_distance_miles: FieldType::INTEGER,
    insurance_provider: FieldType::TEXT,
    insurance_plan: FieldType::TEXT,
    language_preference: FieldType::TEXT,
    gender_preference: FieldType::TEXT,
    search_results_count: FieldType::INTEGER,
    top_doctor_id: FieldType::UUID,
    session_id: FieldType::TEXT,
    user_agent: FieldType::TEXT,
    ip_address: FieldType::TEXT,
    result_rating: FieldType::INTEGER,
    feedback_text: FieldType::TEXT,
    appointment_booked: FieldType::BOOL,
    created_at: FieldType::TIMESTAMP,
});

impl UserQuery {
    /// Creates a query with only the user's text filled in
    pub fn new(original_query: impl Into<String>) -> Self {
        Self {
            id: QueryId::new(),
            original_query: original_query.into(),
            user_location: None,
            user_latitude: None,
            user_longitude: None,
            extracted_symptoms: None,
            extracted_conditions: None,
            extracted_specialties: None,
            urgency_level: None,
            appointment_type: None,
            preferred_distance_miles: None,
            insurance_provider: None,
            insurance_plan: None,
            language_preference: None,
            gender_preference: None,
            search_results_count: None,
            top_doctor_id: None,
            session_id: None,
            user_agent: None,
            ip_address: None,
            result_rating: None,
            feedback_text: None,
            appointment_booked: false,
            created_at: Utc::now(),
        }
    }

    pub fn validate_record(&self) -> Result<(), DomainError> {
        validate(self)?;
        if self.user_latitude.is_some() != self.user_longitude.is_some() {
            return Err(DomainError::ValidationFailed(
                "user_latitude and user_longitude must be set together".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_emergency(&self) -> bool {
        self.urgency_level == Some(UrgencyLevel::Emergency)
    }

    /// Records the search outcome
    pub fn record_results(&mut self, count: i32, top_doctor: Option<DoctorId>) {
        self.search_results_count = Some(count);
        self.top_doctor_id = top_doctor;
    }

    /// Records the user's rating of the results
    pub fn record_feedback(&mut self, rating: i32, text: Option<String>) -> Result<(), DomainError> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::invalid(format!("result rating must be 1-5, got {}", rating)));
        }
        self.result_rating = Some(rating);
        self.feedback_text = text;
        Ok(())
    }
}
