use proptest::prelude::*;
use statechart_lint::primitives::{closest_matches, levenshtein};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn distance_is_a_metric(a in "[a-c]{0,6}", b in "[a-c]{0,6}", c in "[a-c]{0,6}") {
        prop_assert_eq!(levenshtein(&a, &a), 0);
        prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
        prop_assert!(levenshtein(&a, &c) <= levenshtein(&a, &b) + levenshtein(&b, &c));
        prop_assert!(levenshtein(&a, &b) <= a.chars().count().max(b.chars().count()));
    }

    #[test]
    fn closest_matches_are_bounded_and_ordered(
        target in "[a-d]{1,5}",
        pool in prop::collection::vec("[a-d]{1,5}", 0..12),
        limit in 1usize..4,
    ) {
        let found = closest_matches(&target, pool.iter().map(String::as_str), 2, limit);
        prop_assert!(found.len() <= limit);
        prop_assert!(!found.contains(&target.as_str()));
        let distances: Vec<usize> = found.iter().map(|c| levenshtein(&target, c)).collect();
        prop_assert!(distances.iter().all(|d| *d <= 2));
        prop_assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }
}
