//! Property-based tests for the auto-match strategy
//!
//! These tests verify the determinism and ordering invariants that member
//! matching relies on: repeated calls agree, the first matching candidate in
//! enumeration order always wins, and case sensitivity follows the option
//! flag exactly.

use proptest::prelude::*;
use remold_core::{AutoMatchOptions, AutoMatchStrategy, Member};

fn member_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9]{0,15}"
}

fn members_strategy() -> impl Strategy<Value = Vec<Member>> {
    proptest::collection::vec(member_name_strategy(), 1..8)
        .prop_map(|names| names.into_iter().map(|n| Member::new(n, "String")).collect())
}

proptest! {
    /// Repeated calls over the same inputs always return the same member
    #[test]
    fn match_is_deterministic(source in members_strategy(), target_name in member_name_strategy()) {
        let strategy = AutoMatchStrategy::exact();
        let target = Member::new(target_name, "String");

        let first = strategy.try_match(&source, &target).map(|m| m.name.clone());
        for _ in 0..3 {
            let again = strategy.try_match(&source, &target).map(|m| m.name.clone());
            prop_assert_eq!(first.clone(), again);
        }
    }

    /// The winner is always the first candidate in enumeration order that
    /// matches at all
    #[test]
    fn first_match_in_enumeration_order_wins(source in members_strategy(), target_name in member_name_strategy()) {
        let strategy = AutoMatchStrategy::new(
            remold_core::NAME_PLACEHOLDER,
            AutoMatchOptions::NONE.ignore_case(),
        ).unwrap();
        let target = Member::new(target_name.clone(), "String");

        let expected = source
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(&target_name))
            .map(|m| m.name.clone());
        let actual = strategy.try_match(&source, &target).map(|m| m.name.clone());
        prop_assert_eq!(expected, actual);
    }

    /// Exact matching without IgnoreCase never matches names differing only
    /// in case
    #[test]
    fn case_sensitivity_honours_option(name in "[a-z][a-z0-9]{0,13}") {
        let upper = {
            let mut chars = name.chars();
            let first = chars.next().map(|c| c.to_ascii_uppercase());
            first.into_iter().chain(chars).collect::<String>()
        };
        prop_assume!(upper != name);

        let source = vec![Member::new(name, "String")];
        let target = Member::new(upper, "String");

        let strict = AutoMatchStrategy::exact();
        prop_assert!(strict.try_match(&source, &target).is_none());

        let relaxed = AutoMatchStrategy::new(
            remold_core::NAME_PLACEHOLDER,
            AutoMatchOptions::NONE.ignore_case(),
        ).unwrap();
        prop_assert!(relaxed.try_match(&source, &target).is_some());
    }

    /// Strategy construction either succeeds or fails with InvalidArgument -
    /// it never panics, whatever the template
    #[test]
    fn construction_never_panics(template in ".{0,24}") {
        match AutoMatchStrategy::new(template, AutoMatchOptions::NONE) {
            Ok(_) => {}
            Err(remold_core::Error::InvalidArgument { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    /// Prefix matching round-trips: a source member built as prefix + target
    /// name is always found for that target
    #[test]
    fn prefix_source_finds_prefixed_member(prefix in "[a-z]{1,4}", base in "[A-Z][a-z]{1,10}") {
        let strategy = AutoMatchStrategy::prefix_source(&prefix).unwrap();
        let source = vec![Member::new(format!("{prefix}{base}"), "String")];
        let target = Member::new(base, "String");
        prop_assert_eq!(
            strategy.try_match(&source, &target).map(|m| m.name.clone()),
            Some(format!("{prefix}{}", target.name))
        );
    }
}
