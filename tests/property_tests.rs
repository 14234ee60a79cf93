use proptest::prelude::*;
use rulematch::{EquivalenceClass, Rule};

const PATTERNS: &[&str] = &[
    "ab+c",
    "(a,ab)c*",
    "[a-c]{2,4}",
    "(a|x,b|y)+c?",
    "<v:a,ab,abc>+",
    "a*(b,)*c",
];

proptest! {
    #[test]
    fn longer_members_precede_their_prefixes(words in prop::collection::vec("[ab]{0,4}", 0..12)) {
        let mut class = EquivalenceClass::new("c");
        for word in &words {
            class.add_member(word, None);
        }
        let members = class.members();
        for i in 0..members.len() {
            for j in i + 1..members.len() {
                let (earlier, later) = (members[i].text(), members[j].text());
                prop_assert!(
                    !later.starts_with(earlier) || later == earlier,
                    "{:?} precedes longer {:?}",
                    earlier,
                    later
                );
                prop_assert_ne!(earlier, later);
            }
        }
    }

    #[test]
    fn compiling_twice_matches_identically(index in 0..PATTERNS.len(), word in "[abcxy]{0,6}") {
        let first = Rule::new(PATTERNS[index], "%0", ());
        let second = Rule::new(PATTERNS[index], "%0", ());
        prop_assert_eq!(first.r#match(&word), second.r#match(&word));
    }

    #[test]
    fn matches_consume_the_whole_word(index in 0..PATTERNS.len(), word in "[abc]{0,6}") {
        let rule = Rule::new(PATTERNS[index], "%0", ());
        if let Some(m) = rule.apply(&word) {
            prop_assert_eq!(m.consumed(), word.len());
        }
        if let Some(pattern) = rule.pattern() {
            if let Some(m) = pattern.longest_match(rule.classes(), &word) {
                prop_assert!(m.consumed() <= word.len());
            }
        }
    }

    #[test]
    fn count_bounds_hold(n in 0usize..8) {
        let rule = Rule::new("a{2,4}", "", ());
        let word = "a".repeat(n);
        prop_assert_eq!(rule.apply(&word).is_some(), (2..=4).contains(&n));
    }
}
