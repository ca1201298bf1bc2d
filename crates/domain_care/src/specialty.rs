//! Medical specialties and their matching keywords

use chrono::{DateTime, Utc};
use core_kernel::{define_record, FieldType, SpecialtyId};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{validate, DomainError};
use crate::TEXT_LIST;

/// A medical specialty such as Cardiology or Dermatology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MedicalSpecialty {
    pub id: SpecialtyId,
    #[validate(length(min = 1))]
    pub name: String,
    pub description: String,
    /// "Primary Care", "Medical Specialty" or "Surgical Specialty"
    pub category: String,
    pub common_keywords: Vec<String>,
    pub related_symptoms: Vec<String>,
    pub related_conditions: Vec<String>,
    pub body_parts: Vec<String>,
    pub emergency_keywords: Option<Vec<String>>,
    pub urgent_keywords: Option<Vec<String>>,
    pub parent_specialty: Option<String>,
    pub related_specialties: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub is_active: bool,
}

define_record!(MedicalSpecialty => "medical_specialties", unique = id {
    id: FieldType::UUID,
    name: FieldType::TEXT,
    description: FieldType::TEXT,
    category: FieldType::TEXT,
    common_keywords: TEXT_LIST,
    related_symptoms: TEXT_LIST,
    related_conditions: TEXT_LIST,
    body_parts: TEXT_LIST,
    emergency_keywords: TEXT_LIST,
    urgent_keywords: TEXT_LIST,
    parent_specialty: FieldType::TEXT,
    related_specialties: TEXT_LIST,
    created_at: FieldType::TIMESTAMP,
    last_updated: FieldType::TIMESTAMP,
    is_active: FieldType::BOOL,
});

impl MedicalSpecialty {
    pub fn validate_record(&self) -> Result<(), DomainError> {
        validate(self)
    }

    pub fn is_subspecialty(&self) -> bool {
        self.parent_specialty.is_some()
    }

    /// Checks whether `text` mentions one of the specialty's keywords or
    /// symptoms (case-insensitive substring match)
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.common_keywords
            .iter()
            .chain(self.related_symptoms.iter())
            .any(|keyword| text.contains(&keyword.to_lowercase()))
    }

    /// Checks whether `text` mentions one of the emergency keywords
    pub fn signals_emergency(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.emergency_keywords
            .iter()
            .flatten()
            .any(|keyword| text.contains(&keyword.to_lowercase()))
    }
}
