use crate::class::ClassRegistry;
use crate::matcher::{Captures, Match};
use crate::parser::{compile, ESCAPE};
use crate::pattern::{Node, Pattern};
use crate::warning::Warning;

/// Rendered replacement for a matched word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    pub warnings: Vec<Warning>,
}

/// A compiled pattern with its replacement template and an opaque tag.
/// Rules can be linked into a list; walking it is up to the caller.
#[derive(Debug, Clone)]
pub struct Rule<T> {
    pattern: Option<Pattern>,
    template: String,
    tag: T,
    classes: ClassRegistry,
    warnings: Vec<Warning>,
    next: Option<Box<Rule<T>>>,
}

impl<T> Rule<T> {
    /// Compiles `pattern`. Problems with the pattern or with group
    /// references in `template` are kept in [`Rule::warnings`].
    pub fn new(pattern: &str, template: &str, tag: T) -> Self {
        let mut classes = ClassRegistry::new();
        let compiled = compile(pattern, &mut classes);
        let groups = compiled.pattern.group_count();
        let mut warnings = compiled.warnings;
        warnings.extend(
            references(template)
                .into_iter()
                .filter(|&index| index > groups)
                .map(|index| Warning::UnknownGroup { index }),
        );

        Self {
            pattern: (!compiled.pattern.is_empty()).then_some(compiled.pattern),
            template: template.to_string(),
            tag,
            classes,
            warnings,
            next: None,
        }
    }

    /// A rule that accepts every word.
    pub fn catch_all(template: &str, tag: T) -> Self {
        Self {
            pattern: Some(Pattern::from_nodes(vec![Node::accept()])),
            template: template.to_string(),
            tag,
            classes: ClassRegistry::new(),
            warnings: Vec::new(),
            next: None,
        }
    }

    /// `None` for a rule built from an empty pattern.
    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn tag(&self) -> &T {
        &self.tag
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn add_to_class(&mut self, class: &str, member: &str, replacement: Option<&str>) -> bool {
        self.classes.add_member(class, member, replacement).is_added()
    }

    pub fn set_case_sensitive(&mut self, class: &str, case_sensitive: bool) {
        self.classes.find_or_create(class);
        if let Some(class) = self.classes.lookup_mut(class) {
            class.set_case_sensitive(case_sensitive);
        }
    }

    /// Matches the whole of `word`.
    pub fn apply(&self, word: &str) -> Option<Match> {
        match &self.pattern {
            Some(pattern) => pattern.whole_match(&self.classes, word),
            None => Pattern::default().whole_match(&self.classes, word),
        }
    }

    pub fn rewrite(&self, word: &str) -> Option<Rewrite> {
        self.apply(word)
            .map(|m| render(&self.template, m.captures()))
    }

    pub fn r#match(&self, word: &str) -> Option<String> {
        self.rewrite(word).map(|rewrite| rewrite.text)
    }

    pub fn next(&self) -> Option<&Rule<T>> {
        self.next.as_deref()
    }

    pub fn next_mut(&mut self) -> Option<&mut Rule<T>> {
        self.next.as_deref_mut()
    }

    /// Links `next` after this rule, returning whatever was linked before.
    pub fn set_next(&mut self, next: Rule<T>) -> Option<Rule<T>> {
        self.next.replace(Box::new(next)).map(|previous| *previous)
    }

    pub fn take_next(&mut self) -> Option<Rule<T>> {
        self.next.take().map(|next| *next)
    }

    /// This rule followed by every rule linked after it.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { next: Some(self) }
    }
}

pub struct Iter<'r, T> {
    next: Option<&'r Rule<T>>,
}

impl<'r, T> Iterator for Iter<'r, T> {
    type Item = &'r Rule<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let rule = self.next?;
        self.next = rule.next.as_deref();
        Some(rule)
    }
}

/// Renders `template`: `%N` inserts capture N, `%` before anything else
/// inserts that character.
pub fn render(template: &str, captures: &Captures) -> Rewrite {
    let mut text = String::with_capacity(template.len());
    let mut warnings = Vec::new();
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != char::from(ESCAPE) {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped) => match escaped.to_digit(10) {
                Some(digit) => {
                    let index = digit as usize;
                    match captures.get(index) {
                        Some(captured) => text.push_str(captured),
                        None => warnings.push(Warning::UnsetGroup { index }),
                    }
                }
                None => text.push(escaped),
            },
            None => text.push(c),
        }
    }
    Rewrite { text, warnings }
}

fn references(template: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c == char::from(ESCAPE) {
            if let Some(digit) = chars.next().and_then(|escaped| escaped.to_digit(10)) {
                found.push(digit as usize);
            }
        }
    }
    found
}
