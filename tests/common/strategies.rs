//! Proptest strategies for selector output and router input.

#![allow(dead_code)]

use medal_workflow::{Category, StepState};
use proptest::prelude::*;

pub fn category_strategy() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

/// Strings that are not the exact textual form of any category
pub fn unrecognized_selection_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        ".*",
        "[a-z]{1,10}",
        category_strategy().prop_map(|c| c.as_str().to_lowercase()),
        category_strategy().prop_map(|c| format!(" {c}")),
        category_strategy().prop_map(|c| format!("calc_{c}")),
    ]
    .prop_filter("must not name a category", |value| {
        value.parse::<Category>().is_err()
    })
}

/// States a predecessor can be in once it has finished
pub fn terminal_state_strategy() -> impl Strategy<Value = StepState> {
    prop::sample::select(vec![
        StepState::Success,
        StepState::Skipped,
        StepState::Failed,
        StepState::UpstreamFailed,
    ])
}
