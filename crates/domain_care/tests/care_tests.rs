//! Tests for the care directory records

use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use serde_json::json;

use core_kernel::{
    AppointmentId, DoctorId, FieldValue, QueryId, Record, RecordType, ReviewId, SpecialtyId,
};
use domain_care::{
    Appointment, AppointmentStatus, Doctor, DoctorReview, DomainError, MedicalSpecialty,
    PaymentStatus, UrgencyLevel, User, UserQuery, VisitMode,
};

fn create_test_doctor() -> Doctor {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    Doctor {
        id: DoctorId::new(),
        name: "Dr. Amara Okafor".to_string(),
        email: "a.okafor@eastsideclinic.org".to_string(),
        phone: "+1-512-555-0142".to_string(),
        medical_license_number: "TX-M-448210".to_string(),
        specialties: vec!["Orthopedics".to_string()],
        subspecialties: Some(vec!["Sports Medicine".to_string()]),
        board_certifications: vec!["ABOS".to_string()],
        medical_school: "Baylor College of Medicine".to_string(),
        residency: Some("UT Southwestern".to_string()),
        fellowships: None,
        years_in_practice: 12,
        practice_name: "Eastside Orthopedic Clinic".to_string(),
        practice_address: "1200 E 6th St".to_string(),
        practice_city: "Austin".to_string(),
        practice_state: "TX".to_string(),
        practice_zip: "78702".to_string(),
        practice_latitude: 30.2649,
        practice_longitude: -97.7291,
        office_hours: json!({"monday": ["09:00-12:00", "13:00-17:00"]}),
        languages_spoken: vec!["English".to_string(), "Igbo".to_string()],
        conditions_treated: vec!["ACL tear".to_string(), "Tendinitis".to_string()],
        procedures_performed: Some(vec!["Arthroscopy".to_string()]),
        hospital_affiliations: None,
        insurance_networks: vec!["BlueCross PPO".to_string(), "Aetna".to_string()],
        overall_rating: Some(4.0),
        total_reviews: Some(3),
        telehealth_available: true,
        new_patient_accepting: true,
        next_available_appointment: None,
        average_wait_time_days: Some(6),
        credentials_verified: true,
        license_active: true,
        last_credential_check: now,
        created_at: now,
        last_updated: now,
        is_active: true,
    }
}

fn create_test_appointment() -> Appointment {
    let at = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
    Appointment {
        id: AppointmentId::new(),
        doctor_id: DoctorId::new(),
        patient_name: "Jordan Reyes".to_string(),
        patient_email: "jordan.reyes@example.com".to_string(),
        patient_phone: "+1-512-555-0199".to_string(),
        appointment_datetime: at,
        duration_minutes: 45,
        appointment_type: "consultation".to_string(),
        visit_type: VisitMode::InPerson,
        chief_complaint: "Knee pain after running".to_string(),
        symptoms_description: None,
        insurance_provider: Some("Aetna".to_string()),
        insurance_plan: None,
        insurance_id: None,
        status: AppointmentStatus::Scheduled,
        confirmation_sent: false,
        reminder_sent: false,
        check_in_time: None,
        check_out_time: None,
        visit_notes: None,
        follow_up_required: false,
        follow_up_in_days: None,
        estimated_cost: Some(dec!(180.00)),
        copay_amount: Some(dec!(35.00)),
        payment_status: PaymentStatus::Pending,
        cancelled_at: None,
        cancellation_reason: None,
        cancelled_by: None,
        created_at: at,
        last_updated: at,
        source_query_id: Some(QueryId::new()),
    }
}

fn create_test_review(overall: i32) -> DoctorReview {
    let now = Utc::now();
    DoctorReview {
        id: ReviewId::new(),
        doctor_id: DoctorId::new(),
        appointment_id: None,
        patient_name: None,
        patient_email: None,
        verified_patient: false,
        overall_rating: overall,
        communication_rating: Some(5),
        bedside_manner_rating: None,
        wait_time_rating: Some(3),
        office_staff_rating: None,
        review_title: Some("Great with athletes".to_string()),
        review_text: None,
        condition_treated: Some("ACL tear".to_string()),
        visit_type: Some("consultation".to_string()),
        wait_time_minutes: Some(10),
        appointment_on_time: Some(true),
        would_recommend: true,
        helpful_votes: 0,
        total_votes: 0,
        flagged_inappropriate: false,
        moderator_approved: true,
        created_at: now,
        last_updated: now,
        is_active: true,
    }
}

mod doctor_tests {
    use super::*;

    #[test]
    fn test_schema() {
        let schema = Doctor::record_schema();
        assert_eq!(schema.type_name(), "Doctor");
        assert_eq!(schema.table(), Some("doctors"));
        assert_eq!(schema.unique_key().map(|f| f.name), Some("id"));
        assert_eq!(schema.fields().len(), 37);
    }

    #[test]
    fn test_field_values_match_schema() {
        let doctor = create_test_doctor();
        let values = doctor.field_values();
        assert_eq!(values.len(), doctor.schema().fields().len());
        assert_eq!(values[0], FieldValue::Uuid(*doctor.id.as_uuid()));
        assert_eq!(values[10], FieldValue::Null);
    }

    #[test]
    fn test_valid_doctor() {
        assert!(create_test_doctor().validate_record().is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut doctor = create_test_doctor();
        doctor.email = "not-an-email".to_string();
        assert!(matches!(
            doctor.validate_record(),
            Err(DomainError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_coordinates_range() {
        let mut doctor = create_test_doctor();
        doctor.practice_latitude = 120.0;
        assert!(doctor.validate_record().is_err());
    }

    #[test]
    fn test_insurance_and_language_lookup() {
        let doctor = create_test_doctor();
        assert!(doctor.accepts_insurance("aetna"));
        assert!(!doctor.accepts_insurance("Cigna"));
        assert!(doctor.speaks("igbo"));
    }

    #[test]
    fn test_record_rating_updates_average() {
        let mut doctor = create_test_doctor();
        doctor.record_rating(5);
        assert_eq!(doctor.total_reviews, Some(4));
        assert_eq!(doctor.overall_rating, Some(4.25));
    }

    #[test]
    fn test_bookable() {
        let mut doctor = create_test_doctor();
        assert!(doctor.is_bookable());
        doctor.license_active = false;
        assert!(!doctor.is_bookable());
    }
}

mod appointment_tests {
    use super::*;

    #[test]
    fn test_schema() {
        let schema = Appointment::record_schema();
        assert_eq!(schema.table(), Some("appointments"));
        assert_eq!(schema.fields().len(), 31);
    }

    #[test]
    fn test_enums_stored_as_text() {
        let appointment = create_test_appointment();
        let values = appointment.field_values();
        let schema = appointment.schema();
        let position = |name: &str| schema.fields().iter().position(|f| f.name == name).unwrap();

        assert_eq!(values[position("status")], FieldValue::Text("scheduled".into()));
        assert_eq!(values[position("visit_type")], FieldValue::Text("in-person".into()));
        assert_eq!(values[position("estimated_cost")], FieldValue::Decimal(dec!(180.00)));
    }

    #[test]
    fn test_lifecycle() {
        let mut appointment = create_test_appointment();
        appointment.confirm().unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Confirmed);
        assert!(appointment.confirmation_sent);

        let start = appointment.appointment_datetime;
        appointment.check_in(start).unwrap();
        appointment.complete(start + Duration::minutes(40)).unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Completed);
        assert!(appointment.cancel("late", "patient", Utc::now()).is_err());
    }

    #[test]
    fn test_complete_requires_check_in() {
        let mut appointment = create_test_appointment();
        let err = appointment.complete(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_cancel_records_details() {
        let mut appointment = create_test_appointment();
        appointment.cancel("schedule conflict", "patient", Utc::now()).unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Cancelled);
        assert_eq!(appointment.cancelled_by.as_deref(), Some("patient"));
        assert!(appointment.mark_no_show().is_err());
    }

    #[test]
    fn test_ends_at_and_balance() {
        let appointment = create_test_appointment();
        assert_eq!(
            appointment.ends_at(),
            appointment.appointment_datetime + Duration::minutes(45)
        );
        assert_eq!(appointment.patient_balance(), Some(dec!(35.00)));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("no-show".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::NoShow);
        assert!("rescheduled".parse::<AppointmentStatus>().is_err());
    }
}

mod review_tests {
    use super::*;

    #[test]
    fn test_rating_range() {
        assert!(create_test_review(5).validate_record().is_ok());
        assert!(create_test_review(0).validate_record().is_err());
        assert!(create_test_review(6).validate_record().is_err());
    }

    #[test]
    fn test_detailed_rating_range() {
        let mut review = create_test_review(4);
        review.wait_time_rating = Some(9);
        assert!(review.validate_record().is_err());
    }

    #[test]
    fn test_votes() {
        let mut review = create_test_review(4);
        assert_eq!(review.helpful_ratio(), None);
        review.vote(true);
        review.vote(false);
        assert_eq!(review.helpful_ratio(), Some(0.5));
        assert!(review.validate_record().is_ok());
    }

    #[test]
    fn test_average_rating_ignores_missing() {
        let review = create_test_review(4);
        assert_eq!(review.average_rating(), 4.0);
    }

    #[test]
    fn test_visibility() {
        let mut review = create_test_review(2);
        assert!(review.is_visible());
        review.flagged_inappropriate = true;
        assert!(!review.is_visible());
    }

    proptest::proptest! {
        #[test]
        fn prop_average_stays_in_rating_range(
            overall in 1i32..=5,
            detailed in proptest::collection::vec(proptest::option::of(1i32..=5), 4),
        ) {
            let mut review = create_test_review(overall);
            review.communication_rating = detailed[0];
            review.bedside_manner_rating = detailed[1];
            review.wait_time_rating = detailed[2];
            review.office_staff_rating = detailed[3];

            let average = review.average_rating();
            proptest::prop_assert!((1.0..=5.0).contains(&average));
            proptest::prop_assert!(review.validate_record().is_ok());
        }
    }
}

mod query_tests {
    use super::*;

    #[test]
    fn test_new_query_is_valid() {
        let query = UserQuery::new("rash on my arm that won't go away");
        assert!(query.validate_record().is_ok());
        assert!(!query.is_emergency());
    }

    #[test]
    fn test_empty_query_rejected() {
        assert!(UserQuery::new("").validate_record().is_err());
    }

    #[test]
    fn test_coordinates_must_be_paired() {
        let mut query = UserQuery::new("cardiologist near me");
        query.user_latitude = Some(30.27);
        assert!(query.validate_record().is_err());
        query.user_longitude = Some(-97.74);
        assert!(query.validate_record().is_ok());
    }

    #[test]
    fn test_urgency_and_feedback() {
        let mut query = UserQuery::new("chest pain and shortness of breath");
        query.urgency_level = Some(UrgencyLevel::Emergency);
        assert!(query.is_emergency());
        assert!(query.record_feedback(7, None).is_err());
        query.record_feedback(4, Some("helpful".to_string())).unwrap();
        assert_eq!(query.result_rating, Some(4));
    }

    #[test]
    fn test_record_results() {
        let mut query = UserQuery::new("pediatrician");
        let doctor = DoctorId::new();
        query.record_results(12, Some(doctor));
        let values = query.field_values();
        let top = query
            .schema()
            .fields()
            .iter()
            .position(|f| f.name == "top_doctor_id")
            .unwrap();
        assert_eq!(values[top], FieldValue::Uuid(*doctor.as_uuid()));
    }
}

mod specialty_tests {
    use super::*;

    fn cardiology() -> MedicalSpecialty {
        let now = Utc::now();
        MedicalSpecialty {
            id: SpecialtyId::new(),
            name: "Cardiology".to_string(),
            description: "Heart and blood vessel disorders".to_string(),
            category: "Medical Specialty".to_string(),
            common_keywords: vec!["heart".to_string(), "cardiac".to_string()],
            related_symptoms: vec!["palpitations".to_string()],
            related_conditions: vec!["arrhythmia".to_string()],
            body_parts: vec!["heart".to_string()],
            emergency_keywords: Some(vec!["chest pain".to_string()]),
            urgent_keywords: None,
            parent_specialty: None,
            related_specialties: None,
            created_at: now,
            last_updated: now,
            is_active: true,
        }
    }

    #[test]
    fn test_keyword_matching() {
        let specialty = cardiology();
        assert!(specialty.matches("I keep having Palpitations at night"));
        assert!(!specialty.matches("itchy skin"));
        assert!(specialty.signals_emergency("sudden CHEST PAIN"));
        assert!(!specialty.is_subspecialty());
    }

    #[test]
    fn test_schema() {
        assert_eq!(MedicalSpecialty::record_schema().table(), Some("medical_specialties"));
        assert!(cardiology().validate_record().is_ok());
    }
}

mod user_tests {
    use super::*;

    #[test]
    fn test_user() {
        let user = User::new("care.admin@example.com");
        assert!(user.validate_record().is_ok());
        assert_eq!(user.schema().type_name(), "User");
        assert_eq!(user.field_values().len(), 2);
        assert!(User::new("nope").validate_record().is_err());
    }
}
