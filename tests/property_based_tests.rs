mod common;

use common::strategies::*;
use medal_workflow::orchestration::{
    is_fresh, route, route_category, JoinCondition, JoinDecision, RandomSelector,
    SelectionSource,
};
use medal_workflow::{Category, StepState};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    /// Property: the selector only ever emits a member of the category set
    #[test]
    fn selector_output_is_a_category(seed in any::<u64>()) {
        let selector = RandomSelector::with_seed(seed);
        for _ in 0..16 {
            let emitted = selector.emit();
            prop_assert!(emitted.parse::<Category>().is_ok(), "unexpected selection {}", emitted);
        }
    }

    /// Property: every category routes to exactly its own branch
    #[test]
    fn router_selects_the_matching_branch(category in category_strategy()) {
        let branch = route(category.as_str());
        prop_assert_eq!(branch, Some(route_category(category)));
        prop_assert_eq!(branch.map(|b| b.category()), Some(category));
        prop_assert_eq!(
            branch.map(|b| b.as_str().to_string()),
            Some(format!("calc_{category}"))
        );
    }

    /// Property: anything outside the set routes to no branch
    #[test]
    fn router_rejects_unrecognized_values(value in unrecognized_selection_strategy()) {
        prop_assert_eq!(route(&value), None);
    }

    /// Property: a record is fresh exactly while its age is below the window
    #[test]
    fn freshness_matches_record_age(age in 0u64..120, window in 1u64..120) {
        let now = chrono::Utc::now();
        let created_at = now - chrono::Duration::seconds(age as i64);
        prop_assert_eq!(
            is_fresh(Some(created_at), now, Duration::from_secs(window)),
            age < window
        );
    }

    /// Property: `any` runs whenever a predecessor succeeded or none failed
    #[test]
    fn any_join_runs_unless_only_failures_remain(
        states in prop::collection::vec(terminal_state_strategy(), 1..6)
    ) {
        let succeeded = states.iter().any(|s| *s == StepState::Success);
        let failed = states.iter().any(|s| s.is_failure());
        let expected = if succeeded || !failed {
            JoinDecision::Run
        } else {
            JoinDecision::UpstreamFailed
        };
        prop_assert_eq!(JoinCondition::Any.evaluate(&states), expected);
    }

    /// Property: `all` runs exactly when every predecessor succeeded
    #[test]
    fn all_join_runs_only_on_full_success(
        states in prop::collection::vec(terminal_state_strategy(), 1..6)
    ) {
        let decision = JoinCondition::All.evaluate(&states);
        prop_assert_eq!(
            decision == JoinDecision::Run,
            states.iter().all(|s| *s == StepState::Success)
        );
        if states.iter().any(|s| s.is_failure()) {
            prop_assert_eq!(decision, JoinDecision::UpstreamFailed);
        }
    }
}
