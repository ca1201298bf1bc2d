//! Patient reviews of doctors

use chrono::{DateTime, Utc};
use core_kernel::{define_record, AppointmentId, DoctorId, FieldType, ReviewId};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{validate, DomainError};

/// A patient's review of a doctor; ratings are on a 1-5 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DoctorReview {
    pub id: ReviewId,
    pub doctor_id: DoctorId,
    pub appointment_id: Option<AppointmentId>,

    pub patient_name: Option<String>,
    #[validate(email)]
    pub patient_email: Option<String>,
    /// Set when the review is tied to a real appointment
    pub verified_patient: bool,

    #[validate(range(min = 1, max = 5))]
    pub overall_rating: i32,
    #[validate(range(min = 1, max = 5))]
    pub communication_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub bedside_manner_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub wait_time_rating: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub office_staff_rating: Option<i32>,

    #[validate(length(max = 200))]
    pub review_title: Option<String>,
    #[validate(length(max = 5000))]
    pub review_text: Option<String>,
    pub condition_treated: Option<String>,
    /// "routine", "emergency" or "consultation"
    pub visit_type: Option<String>,

    #[validate(range(min = 0))]
    pub wait_time_minutes: Option<i32>,
    pub appointment_on_time: Option<bool>,
    pub would_recommend: bool,

    pub helpful_votes: i32,
    pub total_votes: i32,
    pub flagged_inappropriate: bool,
    pub moderator_approved: bool,

    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub is_active: bool,
}

define_record!(DoctorReview => "doctor_reviews", unique = id {
    id: FieldType::UUID,
    doctor_id: FieldType::UUID,
    appointment_id: FieldType::UUID,
    patient_name: FieldType::TEXT,
    patient_email: FieldType::TEXT,
    verified_patient: FieldType::BOOL,
    overall_rating: FieldType::INTEGER,
    communication_rating: FieldType::INTEGER,
    bedside_manner_rating: FieldType::INTEGER,
    wait_time_rating: FieldType::INTEGER,
    office_staff_rating: FieldType::INTEGER,
    review_title: FieldType::TEXT,
    review_text: FieldType::TEXT,
    condition_treated: FieldType::TEXT,
    visit_type: FieldType::TEXT,
    wait_time_minutes: FieldType::INTEGER,
    appointment_on_time: FieldType::BOOL,
    would_recommend: FieldType::BOOL,
    helpful_votes: FieldType::INTEGER,
    total_votes: FieldType::INTEGER,
    flagged_inappropriate: FieldType::BOOL,
    moderator_approved: FieldType::BOOL,
    created_at: FieldType::TIMESTAMP,
    last_updated: FieldType::TIMESTAMP,
    is_active: FieldType::BOOL,
});

impl DoctorReview {
    pub fn validate_record(&self) -> Result<(), DomainError> {
        validate(self)?;
        if self.helpful_votes > self.total_votes {
            return Err(DomainError::ValidationFailed(format!(
                "helpful_votes ({}) exceeds total_votes ({})",
                self.helpful_votes, self.total_votes
            )));
        }
        Ok(())
    }

    /// Whether the review is shown in listings
    pub fn is_visible(&self) -> bool {
        self.is_active && self.moderator_approved && !self.flagged_inappropriate
    }

    /// Records a reader's vote on whether the review helped
    pub fn vote(&mut self, helpful: bool) {
        self.total_votes += 1;
        if helpful {
            self.helpful_votes += 1;
        }
        self.last_updated = Utc::now();
    }

    /// Share of votes marking the review helpful, `None` before any vote
    pub fn helpful_ratio(&self) -> Option<f64> {
        (self.total_votes > 0).then(|| f64::from(self.helpful_votes) / f64::from(self.total_votes))
    }

    /// Mean of the overall rating and every detailed rating given
    pub fn average_rating(&self) -> f64 {
        let ratings: Vec<i32> = std::iter::once(self.overall_rating)
            .chain(
                [
                    self.communication_rating,
                    self.bedside_manner_rating,
                    self.wait_time_rating,
                    self.office_staff_rating,
                ]
                .into_iter()
                .flatten(),
            )
            .collect();
        f64::from(ratings.iter().sum::<i32>()) / ratings.len() as f64
    }
}
