//! Test Data Builders
//!
//! Provides builder patterns for constructing domain records with sensible
//! defaults. Tests set only the fields they care about; every builder starts
//! from the matching [`RecordFixtures`] record with a fresh identifier.

use core_kernel::{DoctorId, ReviewId};
use domain_care::{Doctor, DoctorReview};

use crate::fixtures::RecordFixtures;

/// Builder for doctors
pub struct DoctorBuilder {
    doctor: Doctor,
}

impl Default for DoctorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DoctorBuilder {
    /// Creates a new builder with a fresh id
    pub fn new() -> Self {
        let mut doctor = RecordFixtures::doctor();
        doctor.id = DoctorId::new();
        Self { doctor }
    }

    pub fn with_id(mut self, id: DoctorId) -> Self {
        self.doctor.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.doctor.name = name.into();
        self
    }

    /// Sets the practice city
    pub fn in_city(mut self, city: impl Into<String>) -> Self {
        self.doctor.practice_city = city.into();
        self
    }

    pub fn with_specialties(mut self, specialties: &[&str]) -> Self {
        self.doctor.specialties = specialties.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Replaces the office hours document
    pub fn with_office_hours(mut self, hours: serde_json::Value) -> Self {
        self.doctor.office_hours = hours;
        self
    }

    pub fn with_rating(mut self, rating: Option<f64>) -> Self {
        self.doctor.overall_rating = rating;
        self
    }

    /// Marks the doctor inactive
    pub fn inactive(mut self) -> Self {
        self.doctor.is_active = false;
        self
    }

    pub fn build(self) -> Doctor {
        self.doctor
    }

    /// Builds `count` doctors with distinct ids and numbered names
    pub fn build_many(self, count: usize) -> Vec<Doctor> {
        (0..count)
            .map(|i| {
                let mut doctor = self.doctor.clone();
                doctor.id = DoctorId::new();
                doctor.name = format!("{} #{}", self.doctor.name, i + 1);
                doctor
            })
            .collect()
    }
}

/// Builder for doctor reviews
pub struct ReviewBuilder {
    review: DoctorReview,
}

impl Default for ReviewBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewBuilder {
    /// Creates a new builder with a fresh id
    pub fn new() -> Self {
        let mut review = RecordFixtures::review();
        review.id = ReviewId::new();
        Self { review }
    }

    pub fn for_doctor(mut self, doctor_id: DoctorId) -> Self {
        self.review.doctor_id = doctor_id;
        self
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.review.overall_rating = rating;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.review.review_text = Some(text.into());
        self
    }

    /// Clears every optional field
    pub fn anonymous(mut self) -> Self {
        self.review.appointment_id = None;
        self.review.patient_name = None;
        self.review.patient_email = None;
        self.review.verified_patient = false;
        self
    }

    pub fn build(self) -> DoctorReview {
        self.review
    }

    /// Builds `count` reviews with distinct ids
    pub fn build_many(self, count: usize) -> Vec<DoctorReview> {
        (0..count)
            .map(|_| {
                let mut review = self.review.clone();
                review.id = ReviewId::new();
                review
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_builder_overrides() {
        let doctor = DoctorBuilder::new()
            .with_name("Dr. Lena Park")
            .in_city("Denver")
            .with_specialties(&["Dermatology"])
            .build();

        assert_eq!(doctor.name, "Dr. Lena Park");
        assert_eq!(doctor.practice_city, "Denver");
        assert_eq!(doctor.specialties, vec!["Dermatology".to_string()]);
        assert!(doctor.validate_record().is_ok());
    }

    #[test]
    fn test_build_many_distinct_ids() {
        let doctors = DoctorBuilder::new().build_many(5);
        let mut ids: Vec<_> = doctors.iter().map(|d| d.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_anonymous_review() {
        let review = ReviewBuilder::new().anonymous().with_rating(2).build();
        assert!(review.patient_email.is_none());
        assert_eq!(review.overall_rating, 2);
        assert!(review.validate_record().is_ok());
    }
}
