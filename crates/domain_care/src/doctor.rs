//! Doctor directory entries

use chrono::{DateTime, Utc};
use core_kernel::{define_record, DoctorId, FieldType};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{validate, DomainError};
use crate::TEXT_LIST;

/// A practising doctor listed in the directory
///
/// `office_hours` is free-form JSON keyed by weekday, for example
/// `{"monday": ["09:00-12:00", "13:00-17:00"]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Doctor {
    pub id: DoctorId,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: String,

    // Credentials
    #[validate(length(min = 1))]
    pub medical_license_number: String,
    pub specialties: Vec<String>,
    pub subspecialties: Option<Vec<String>>,
    pub board_certifications: Vec<String>,
    pub medical_school: String,
    pub residency: Option<String>,
    pub fellowships: Option<Vec<String>>,
    #[validate(range(min = 0, max = 80))]
    pub years_in_practice: i32,

    // Practice
    pub practice_name: String,
    pub practice_address: String,
    pub practice_city: String,
    pub practice_state: String,
    pub practice_zip: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub practice_latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub practice_longitude: f64,
    pub office_hours: serde_json::Value,
    pub languages_spoken: Vec<String>,

    // Professional details
    pub conditions_treated: Vec<String>,
    pub procedures_performed: Option<Vec<String>>,
    pub hospital_affiliations: Option<Vec<String>>,
    pub insurance_networks: Vec<String>,

    // Patient experience
    #[validate(range(min = 1.0, max = 5.0))]
    pub overall_rating: Option<f64>,
    pub total_reviews: Option<i32>,
    pub telehealth_available: bool,
    pub new_patient_accepting: bool,

    // Availability
    pub next_available_appointment: Option<DateTime<Utc>>,
    pub average_wait_time_days: Option<i32>,

    // Verification
    pub credentials_verified: bool,
    pub license_active: bool,
    pub last_credential_check: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub is_active: bool,
}

define_record!(Doctor => "doctors", unique = id {
    id: FieldType::UUID,
    name: FieldType::TEXT,
    email: FieldType::TEXT,
    phone: FieldType::TEXT,
    medical_license_number: FieldType::TEXT,
    specialties: TEXT_LIST,
    subspecialties: TEXT_LIST,
    board_certifications: TEXT_LIST,
    medical_school: FieldType::TEXT,
    residency: FieldType::TEXT,
    fellowships: TEXT_LIST,
    years_in_practice: FieldType::INTEGER,
    practice_name: FieldType::TEXT,
    practice_address: FieldType::TEXT,
    practice_city: FieldType::TEXT,
    practice_state: FieldType::TEXT,
    practice_zip: FieldType::TEXT,
    practice_latitude: FieldType::FLOAT,
    practice_longitude: FieldType::FLOAT,
    office_hours: FieldType::JSON,
    languages_spoken: TEXT_LIST,
    conditions_treated: TEXT_LIST,
    procedures_performed: TEXT_LIST,
    hospital_affiliations: TEXT_LIST,
    insurance_networks: TEXT_LIST,
    overall_rating: FieldType::FLOAT,
    total_reviews: FieldType::INTEGER,
    telehealth_available: FieldType::BOOL,
    new_patient_accepting: FieldType::BOOL,
    next_available_appointment: FieldType::TIMESTAMP,
    average_wait_time_days: FieldType::INTEGER,
    credentials_verified: FieldType::BOOL,
    license_active: FieldType::BOOL,
    last_credential_check: FieldType::TIMESTAMP,
    created_at: FieldType::TIMESTAMP,
    last_updated: FieldType::TIMESTAMP,
    is_active: FieldType::BOOL,
});

impl Doctor {
    /// Runs field validation
    pub fn validate_record(&self) -> Result<(), DomainError> {
        validate(self)
    }

    /// Checks whether the doctor is in the given insurance network
    /// (case-insensitive)
    pub fn accepts_insurance(&self, network: &str) -> bool {
        self.insurance_networks
            .iter()
            .any(|n| n.eq_ignore_ascii_case(network))
    }

    pub fn speaks(&self, language: &str) -> bool {
        self.languages_spoken
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language))
    }

    /// Whether the doctor can currently be booked by a new patient
    pub fn is_bookable(&self) -> bool {
        self.is_active && self.license_active && self.new_patient_accepting
    }

    /// Folds a new review rating into the running average
    pub fn record_rating(&mut self, rating: i32) {
        let count = self.total_reviews.unwrap_or(0);
        let current = self.overall_rating.unwrap_or(0.0) * f64::from(count);
        self.total_reviews = Some(count + 1);
        self.overall_rating = Some((current + f64::from(rating)) / f64::from(count + 1));
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
