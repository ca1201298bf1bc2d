//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating records that satisfy the
//! domain's validation rules, plus batch shapes for the upsert engine.

use core_kernel::{DoctorId, ReviewId};
use domain_care::{DoctorReview, UrgencyLevel, UserQuery};
use proptest::prelude::*;

use crate::fixtures::RecordFixtures;

/// Strategy for valid 1-5 ratings
pub fn rating_strategy() -> impl Strategy<Value = i32> {
    1i32..=5
}

/// Strategy for optional detailed ratings
pub fn optional_rating_strategy() -> impl Strategy<Value = Option<i32>> {
    prop::option::of(rating_strategy())
}

pub fn urgency_strategy() -> impl Strategy<Value = UrgencyLevel> {
    prop_oneof![
        Just(UrgencyLevel::Routine),
        Just(UrgencyLevel::Urgent),
        Just(UrgencyLevel::Emergency),
    ]
}

/// Strategy for short free-text values, including quotes and non-ASCII text
pub fn free_text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.'\"é-]{1,60}"
}

/// Strategy for valid doctor reviews with a fresh id
pub fn review_strategy() -> impl Strategy<Value = DoctorReview> {
    (
        rating_strategy(),
        optional_rating_strategy(),
        optional_rating_strategy(),
        prop::option::of(free_text_strategy()),
        0i32..50,
        any::<bool>(),
    )
        .prop_map(|(overall, communication, wait, text, votes, recommend)| {
            let mut review = RecordFixtures::review();
            review.id = ReviewId::new();
            review.doctor_id = DoctorId::new();
            review.overall_rating = overall;
            review.communication_rating = communication;
            review.wait_time_rating = wait;
            review.review_text = text;
            review.total_votes = votes;
            review.helpful_votes = votes / 2;
            review.would_recommend = recommend;
            review
        })
}

/// Strategy for valid user queries
pub fn user_query_strategy() -> impl Strategy<Value = UserQuery> {
    (
        free_text_strategy(),
        prop::option::of(urgency_strategy()),
        prop::option::of(prop::collection::vec(free_text_strategy(), 0..4)),
    )
        .prop_map(|(text, urgency, symptoms)| {
            let mut query = UserQuery::new(text);
            query.urgency_level = urgency;
            query.extracted_symptoms = symptoms;
            query
        })
}

/// Strategy for `(record count, batch size)` pairs used to exercise batching
pub fn batch_shape_strategy() -> impl Strategy<Value = (usize, usize)> {
    (0usize..120, 1usize..40)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_generated_reviews_validate(review in review_strategy()) {
            prop_assert!(review.validate_record().is_ok());
        }

        #[test]
        fn prop_generated_queries_validate(query in user_query_strategy()) {
            prop_assert!(query.validate_record().is_ok());
        }
    }
}
