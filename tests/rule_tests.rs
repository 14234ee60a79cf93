use rulematch::{Rule, Warning};

#[cfg(test)]
mod template_tests {
    use super::*;

    #[test]
    fn test_escapes_and_references() {
        let rule = Rule::new("(a,b)", "x%%y%1%q", ());
        assert_eq!(rule.r#match("b").as_deref(), Some("x%ybq"));
    }

    #[test]
    fn test_trailing_escape_is_literal() {
        let rule = Rule::new("a", "50%", ());
        assert_eq!(rule.r#match("a").as_deref(), Some("50%"));
    }

    #[test]
    fn test_unset_group_substitutes_nothing() {
        let rule = Rule::new("(a)?b", "[%1]", ());
        let rewrite = rule.rewrite("b").expect("should match");
        assert_eq!(rewrite.text, "[]");
        assert_eq!(rewrite.warnings, vec![Warning::UnsetGroup { index: 1 }]);
        assert_eq!(rule.r#match("ab").as_deref(), Some("[a]"));
    }

    #[test]
    fn test_unknown_group_reported_at_construction() {
        let rule = Rule::new("abc", "%2", ());
        assert_eq!(rule.warnings(), &[Warning::UnknownGroup { index: 2 }]);
        assert!(Rule::new("abc", "%0", ()).warnings().is_empty());
    }

    #[test]
    fn test_no_match_is_none() {
        let rule = Rule::new("ab", "x", ());
        assert_eq!(rule.r#match("abc"), None);
        assert!(rule.rewrite("a").is_none());
    }
}

#[cfg(test)]
mod rule_shape_tests {
    use super::*;

    #[test]
    fn test_empty_pattern() {
        let rule = Rule::new("", "x", ());
        assert!(rule.pattern().is_none());
        assert_eq!(rule.r#match("").as_deref(), Some("x"));
        assert_eq!(rule.r#match("a"), None);
    }

    #[test]
    fn test_catch_all() {
        let rule = Rule::catch_all("[%0]", ());
        assert_eq!(rule.r#match("hello").as_deref(), Some("[hello]"));
        assert_eq!(rule.r#match("").as_deref(), Some("[]"));
    }

    #[test]
    fn test_tag_is_kept() {
        let rule = Rule::new("a", "b", "vowel-shift");
        assert_eq!(*rule.tag(), "vowel-shift");
        assert_eq!(rule.template(), "b");
    }

    #[test]
    fn test_consumed_is_whole_word() {
        let rule = Rule::new("[a-z]+(ing,ed)", "%1", ());
        let m = rule.apply("walked").expect("should match");
        assert_eq!(m.consumed(), "walked".len());
        assert_eq!(m.captures().get(1), Some("ed"));
    }
}

#[cfg(test)]
mod rule_list_tests {
    use super::*;

    fn list() -> Rule<u32> {
        let mut first = Rule::new("a+", "A", 1);
        let mut second = Rule::new("b+", "B", 2);
        second.set_next(Rule::catch_all("?", 3));
        first.set_next(second);
        first
    }

    #[test]
    fn test_iteration_order() {
        let tags: Vec<u32> = list().iter().map(|rule| *rule.tag()).collect();
        assert_eq!(tags, vec![1, 2, 3]);
    }

    #[test]
    fn test_first_matching_rule() {
        let rules = list();
        let first_match = |word: &str| {
            rules
                .iter()
                .find_map(|rule| rule.r#match(word).map(|text| (*rule.tag(), text)))
        };
        assert_eq!(first_match("aa"), Some((1, "A".to_string())));
        assert_eq!(first_match("bb"), Some((2, "B".to_string())));
        assert_eq!(first_match("cc"), Some((3, "?".to_string())));
    }

    #[test]
    fn test_set_next_returns_previous() {
        let mut rule = Rule::new("a", "", 1);
        assert!(rule.set_next(Rule::new("b", "", 2)).is_none());
        let previous = rule.set_next(Rule::new("c", "", 3)).expect("had a next rule");
        assert_eq!(*previous.tag(), 2);
        assert_eq!(rule.next().map(|next| *next.tag()), Some(3));
        assert_eq!(rule.take_next().map(|next| *next.tag()), Some(3));
        assert!(rule.next().is_none());
    }

    #[test]
    fn test_next_mut_edits_a_linked_rule() {
        let mut rules = list();
        let second = rules.next_mut().expect("second rule");
        assert!(second.add_to_class("v", "x", None));
        second.set_next(Rule::new("(a,b)<w:x>", "%1", 4));

        let tags: Vec<u32> = rules.iter().map(|rule| *rule.tag()).collect();
        assert_eq!(tags, vec![1, 2, 4]);
        let last = rules.iter().last().expect("last rule");
        assert_eq!(last.r#match("bx"), Some("b".to_string()));
        assert!(rules.next().unwrap().classes().lookup("v").is_some());
    }
}
