// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Topic Routing
//!
//! Routing keys are dot-separated tokens. `*` matches exactly one token and
//! `>` matches one or more trailing tokens.

use inventory_events::subjects::{
    matches, routing_key_of, subject_for, validate_pattern, validate_routing_key,
};
use proptest::prelude::*;

fn token() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,8}"
}

fn routing_key() -> impl Strategy<Value = String> {
    prop::collection::vec(token(), 1..5).prop_map(|tokens| tokens.join("."))
}

proptest! {
    /// Every valid routing key matches itself and is accepted for publishing
    #[test]
    fn prop_key_matches_itself(key in routing_key()) {
        prop_assert!(validate_routing_key(&key).is_ok());
        prop_assert!(validate_pattern(&key).is_ok());
        prop_assert!(matches(&key, &key));
    }

    /// `{first}.>` matches every longer key starting with `first`
    #[test]
    fn prop_tail_wildcard_matches_descendants(
        first in token(),
        rest in prop::collection::vec(token(), 1..4),
    ) {
        let key = format!("{}.{}", first, rest.join("."));
        let pattern = format!("{}.>", first);

        prop_assert!(matches(&pattern, &key));
        prop_assert!(!matches(&pattern, &first));
    }

    /// Replacing any single token with `*` still matches; adding a token does not
    #[test]
    fn prop_single_wildcard_is_one_token(
        tokens in prop::collection::vec(token(), 1..5),
        index in any::<prop::sample::Index>(),
        extra in token(),
    ) {
        let key = tokens.join(".");
        let mut pattern_tokens = tokens.clone();
        pattern_tokens[index.index(tokens.len())] = "*".to_string();
        let pattern = pattern_tokens.join(".");

        let descendant = format!("{key}.{extra}");
        prop_assert!(matches(&pattern, &key));
        prop_assert!(!matches(&pattern, &descendant));
    }

    /// Distinct concrete keys never match each other
    #[test]
    fn prop_distinct_keys_do_not_match(a in routing_key(), b in routing_key()) {
        prop_assume!(a != b);
        prop_assert!(!matches(&a, &b));
    }

    /// Publishing rejects any key containing a wildcard token
    #[test]
    fn prop_publish_rejects_wildcards(
        tokens in prop::collection::vec(token(), 1..4),
        index in any::<prop::sample::Index>(),
        wildcard in prop_oneof![Just("*"), Just(">")],
    ) {
        let mut tokens = tokens;
        let position = index.index(tokens.len());
        tokens[position] = wildcard.to_string();
        prop_assert!(validate_routing_key(&tokens.join(".")).is_err());
    }

    /// The exchange prefix round-trips through wire subjects
    #[test]
    fn prop_subject_prefix_strips_back(exchange in token(), key in routing_key()) {
        let subject = subject_for(&exchange, &key);
        prop_assert_eq!(routing_key_of(&exchange, &subject), Some(key.as_str()));
    }
}
