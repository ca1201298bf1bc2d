//! Appointments booked with directory doctors

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use core_kernel::{define_record, AppointmentId, DoctorId, FieldType, FieldValue, QueryId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{validate, DomainError};

/// Lifecycle status of an appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    /// Completed, cancelled and no-show appointments cannot change again
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no-show" => Ok(AppointmentStatus::NoShow),
            other => Err(DomainError::invalid(format!("unknown appointment status: {}", other))),
        }
    }
}

impl From<AppointmentStatus> for FieldValue {
    fn from(status: AppointmentStatus) -> Self {
        FieldValue::Text(status.as_str().to_string())
    }
}

/// Whether the visit happens on site or remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisitMode {
    InPerson,
    Telehealth,
}

impl VisitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitMode::InPerson => "in-person",
            VisitMode::Telehealth => "telehealth",
        }
    }
}

impl From<VisitMode> for FieldValue {
    fn from(mode: VisitMode) -> Self {
        FieldValue::Text(mode.as_str().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    InsuranceBilled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::InsuranceBilled => "insurance_billed",
        }
    }
}

impl From<PaymentStatus> for FieldValue {
    fn from(status: PaymentStatus) -> Self {
        FieldValue::Text(status.as_str().to_string())
    }
}

/// An appointment between a patient and a doctor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Appointment {
    pub id: AppointmentId,
    pub doctor_id: DoctorId,
    #[validate(length(min = 1))]
    pub patient_name: String,
    #[validate(email)]
    pub patient_email: String,
    pub patient_phone: String,

    pub appointment_datetime: DateTime<Utc>,
    #[validate(range(min = 5, max = 480))]
    pub duration_minutes: i32,
    /// "consultation", "follow-up", "routine" or "urgent"
    pub appointment_type: String,
    pub visit_type: VisitMode,

    pub chief_complaint: String,
    pub symptoms_description: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_plan: Option<String>,
    pub insurance_id: Option<String>,

    pub status: AppointmentStatus,
    pub confirmation_sent: bool,
    pub reminder_sent: bool,

    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub visit_notes: Option<String>,
    pub follow_up_required: bool,
    pub follow_up_in_days: Option<i32>,

    pub estimated_cost: Option<Decimal>,
    pub copay_amount: Option<Decimal>,
    pub payment_status: PaymentStatus,

    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    /// "patient", "doctor" or "system"
    pub cancelled_by: Option<String>,

    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    /// The search that led to this booking
    pub source_query_id: Option<QueryId>,
}

define_record!(Appointment => "appointments", unique = id {
    id: FieldType::UUID,
    doctor_id: FieldType::UUID,
    patient_name: FieldType::TEXT,
    patient_email: FieldType::TEXT,
    patient_phone: FieldType::TEXT,
    appointment_datetime: FieldType::TIMESTAMP,
    duration_minutes: FieldType::INTEGER,
    appointment_type: FieldType::TEXT,
    visit_type: FieldType::TEXT,
    chief_complaint: FieldType::TEXT,
    symptoms_description: FieldType::TEXT,
    insurance_provider: FieldType::TEXT,
    insurance_plan: FieldType::TEXT,
    insurance_id: FieldType::TEXT,
    status: FieldType::TEXT,
    confirmation_sent: FieldType::BOOL,
    reminder_sent: FieldType::BOOL,
    check_in_time: FieldType::TIMESTAMP,
    check_out_time: FieldType::TIMESTAMP,
    visit_notes: FieldType::TEXT,
    follow_up_required: FieldType::BOOL,
    follow_up_in_days: FieldType::INTEGER,
    estimated_cost: FieldType::DECIMAL,
    copay_amount: FieldType::DECIMAL,
    payment_status: FieldType::TEXT,
    cancelled_at: FieldType::TIMESTAMP,
    cancellation_reason: FieldType::TEXT,
    cancelled_by: FieldType::TEXT,
    created_at: FieldType::TIMESTAMP,
    last_updated: FieldType::TIMESTAMP,
    source_query_id: FieldType::UUID,
});

impl Appointment {
    pub fn validate_record(&self) -> Result<(), DomainError> {
        validate(self)
    }

    /// Scheduled end of the visit
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.appointment_datetime + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn confirm(&mut self) -> Result<(), DomainError> {
        self.transition(AppointmentStatus::Confirmed)?;
        self.confirmation_sent = true;
        Ok(())
    }

    pub fn check_in(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status.is_final() {
            return Err(self.invalid_transition(AppointmentStatus::Completed));
        }
        self.check_in_time = Some(at);
        self.touch();
        Ok(())
    }

    /// Marks the visit completed; requires a prior check-in
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        if self.check_in_time.is_none() {
            return Err(self.invalid_transition(AppointmentStatus::Completed));
        }
        self.transition(AppointmentStatus::Completed)?;
        self.check_out_time = Some(at);
        Ok(())
    }

    pub fn cancel(
        &mut self,
        reason: impl Into<String>,
        by: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.transition(AppointmentStatus::Cancelled)?;
        self.cancelled_at = Some(at);
        self.cancellation_reason = Some(reason.into());
        self.cancelled_by = Some(by.into());
        Ok(())
    }

    pub fn mark_no_show(&mut self) -> Result<(), DomainError> {
        self.transition(AppointmentStatus::NoShow)
    }

    /// Patient share of the estimated cost, if both amounts are known
    pub fn patient_balance(&self) -> Option<Decimal> {
        match (self.estimated_cost, self.copay_amount) {
            (Some(cost), Some(copay)) => Some(copay.min(cost)),
            (Some(cost), None) => Some(cost),
            _ => None,
        }
    }

    fn transition(&mut self, to: AppointmentStatus) -> Result<(), DomainError> {
        if self.status.is_final() || self.status == to {
            return Err(self.invalid_transition(to));
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    fn invalid_transition(&self, to: AppointmentStatus) -> DomainError {
        DomainError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
