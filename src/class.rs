use std::collections::HashMap;

/// Outcome of adding a member to an equivalence class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Added,
    Duplicate,
    OutOfMemory,
}

impl Insert {
    pub fn is_added(self) -> bool {
        self == Insert::Added
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    text: Vec<u8>,
    replacement: Vec<u8>,
}

impl Member {
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn replacement(&self) -> &[u8] {
        &self.replacement
    }
}

/// A named, ordered set of literal strings. A member always precedes every
/// other member that is a prefix of it, so a forward scan finds the most
/// specific member first.
#[derive(Debug, Clone)]
pub struct EquivalenceClass {
    name: String,
    case_sensitive: bool,
    members: Vec<Member>,
}

impl EquivalenceClass {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            case_sensitive: false,
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Changing the flag re-inserts every member under the new comparison.
    /// Members that now compare equal collapse into the one listed first.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        if self.case_sensitive == case_sensitive {
            return;
        }
        self.case_sensitive = case_sensitive;
        for member in std::mem::take(&mut self.members) {
            self.insert(member);
        }
    }

    /// Adds `text` unless an equal member already exists. The replacement
    /// defaults to the member text itself.
    pub fn add_member(&mut self, text: &str, replacement: Option<&str>) -> Insert {
        if self.members.try_reserve(1).is_err() {
            return Insert::OutOfMemory;
        }
        let replacement = replacement.unwrap_or(text);
        self.insert(Member {
            text: text.as_bytes().to_vec(),
            replacement: replacement.as_bytes().to_vec(),
        })
    }

    fn insert(&mut self, member: Member) -> Insert {
        if self.members.iter().any(|m| self.same(&m.text, &member.text)) {
            return Insert::Duplicate;
        }
        // Before the first member that is a prefix of the new one. Anything
        // the new member is a prefix of already sits in front of that point.
        let at = self
            .members
            .iter()
            .position(|m| self.is_prefix(&m.text, &member.text))
            .unwrap_or(self.members.len());
        self.members.insert(at, member);
        Insert::Added
    }

    /// Returns `(member_length, member_index)` for the first member at or
    /// after `start` that is a prefix of `candidate`.
    pub fn find_member(&self, candidate: &[u8], start: usize) -> Option<(usize, usize)> {
        self.members
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, m)| self.is_prefix(&m.text, candidate))
            .map(|(index, m)| (m.text.len(), index))
    }

    fn same(&self, a: &[u8], b: &[u8]) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    fn is_prefix(&self, prefix: &[u8], of: &[u8]) -> bool {
        of.len() >= prefix.len() && self.same(prefix, &of[..prefix.len()])
    }
}

/// Handle to a class inside a [`ClassRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(usize);

/// The classes visible to one rule, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: Vec<EquivalenceClass>,
    by_name: HashMap<String, ClassId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_or_create(&mut self, name: &str) -> ClassId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = ClassId(self.classes.len());
        self.classes.push(EquivalenceClass::new(name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<&EquivalenceClass> {
        self.by_name.get(name).and_then(|&id| self.get(id))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut EquivalenceClass> {
        let id = *self.by_name.get(name)?;
        self.classes.get_mut(id.0)
    }

    /// `None` when `id` belongs to another registry.
    pub fn get(&self, id: ClassId) -> Option<&EquivalenceClass> {
        self.classes.get(id.0)
    }

    pub fn add_member(&mut self, class: &str, text: &str, replacement: Option<&str>) -> Insert {
        let id = self.find_or_create(class);
        self.classes[id.0].add_member(text, replacement)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(class: &EquivalenceClass) -> Vec<&str> {
        class
            .members()
            .iter()
            .map(|m| std::str::from_utf8(m.text()).unwrap())
            .collect()
    }

    #[test]
    fn longer_member_moves_ahead_of_its_prefix() {
        let mut class = EquivalenceClass::new("animal");
        assert!(class.add_member("cat", None).is_added());
        assert!(class.add_member("catfish", None).is_added());
        assert_eq!(texts(&class), vec!["catfish", "cat"]);
    }

    #[test]
    fn shorter_member_goes_behind_longer() {
        let mut class = EquivalenceClass::new("animal");
        class.add_member("catfish", None);
        class.add_member("dog", None);
        class.add_member("cat", None);
        assert_eq!(texts(&class), vec!["catfish", "dog", "cat"]);
    }

    #[test]
    fn middle_length_lands_between() {
        let mut class = EquivalenceClass::new("c");
        class.add_member("abc", None);
        class.add_member("a", None);
        class.add_member("ab", None);
        assert_eq!(texts(&class), vec!["abc", "ab", "a"]);
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut class = EquivalenceClass::new("c");
        assert_eq!(class.add_member("th", Some("þ")), Insert::Added);
        assert_eq!(class.add_member("TH", None), Insert::Duplicate);
        assert_eq!(class.members().len(), 1);
        assert_eq!(class.members()[0].replacement(), "þ".as_bytes());
    }

    #[test]
    fn case_sensitive_class_keeps_both_cases() {
        let mut class = EquivalenceClass::new("c");
        class.set_case_sensitive(true);
        assert!(class.add_member("th", None).is_added());
        assert!(class.add_member("TH", None).is_added());
        assert_eq!(class.find_member(b"The", 0), None);
    }

    #[test]
    fn switching_to_insensitive_reorders_members() {
        let mut class = EquivalenceClass::new("c");
        class.set_case_sensitive(true);
        class.add_member("t", None);
        class.add_member("Th", None);
        assert_eq!(texts(&class), vec!["t", "Th"]);

        class.set_case_sensitive(false);
        assert!(!class.is_case_sensitive());
        assert_eq!(texts(&class), vec!["Th", "t"]);
        assert_eq!(class.find_member(b"th", 0), Some((2, 0)));
    }

    #[test]
    fn switching_to_insensitive_drops_case_duplicates() {
        let mut class = EquivalenceClass::new("c");
        class.set_case_sensitive(true);
        class.add_member("th", Some("1"));
        class.add_member("TH", Some("2"));
        assert_eq!(class.members().len(), 2);

        class.set_case_sensitive(false);
        assert_eq!(texts(&class), vec!["th"]);
        assert_eq!(class.members()[0].replacement(), b"1");
        assert_eq!(class.add_member("Th", None), Insert::Duplicate);
    }

    #[test]
    fn find_member_scans_from_start_index() {
        let mut class = EquivalenceClass::new("c");
        class.add_member("a", None);
        class.add_member("ab", None);
        assert_eq!(class.find_member(b"abc", 0), Some((2, 0)));
        assert_eq!(class.find_member(b"abc", 1), Some((1, 1)));
        assert_eq!(class.find_member(b"abc", 2), None);
        assert_eq!(class.find_member(b"x", 0), None);
    }

    #[test]
    fn registry_accumulates_under_one_name() {
        let mut registry = ClassRegistry::new();
        assert!(registry.is_empty());
        let id = registry.find_or_create("v");
        registry.add_member("v", "a", None);
        registry.add_member("v", "e", None);
        assert_eq!(registry.find_or_create("v"), id);
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert_eq!(registry.lookup("v").unwrap().members().len(), 2);
        assert!(registry.lookup("w").is_none());
    }
}
