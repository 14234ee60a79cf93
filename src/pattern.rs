use crate::class::{ClassId, ClassRegistry};
use crate::matcher::{self, Match};

/// A 256-entry membership table over byte values.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteSet([bool; 256]);

impl ByteSet {
    pub fn empty() -> Self {
        ByteSet([false; 256])
    }

    pub fn full() -> Self {
        ByteSet([true; 256])
    }

    /// Inserts `byte` together with its other ASCII case.
    pub fn insert_folded(&mut self, byte: u8) {
        self.0[usize::from(byte)] = true;
        self.0[usize::from(byte.to_ascii_lowercase())] = true;
        self.0[usize::from(byte.to_ascii_uppercase())] = true;
    }

    pub fn insert_range_folded(&mut self, low: u8, high: u8) {
        for byte in low..=high {
            self.insert_folded(byte);
        }
    }

    pub fn negate(&mut self) {
        for bit in self.0.iter_mut() {
            *bit = !*bit;
        }
    }

    pub fn contains(&self, byte: u8) -> bool {
        self.0[usize::from(byte)]
    }
}

impl std::fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.0.iter().filter(|&&bit| bit).count();
        write!(f, "ByteSet({} of 256)", count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Char(u8),
    CharSet(Box<ByteSet>),
    Literal { text: Vec<u8>, replacement: Vec<u8> },
    Group { alternatives: Vec<Alternative>, number: usize }, // (a,b|c), group_number
    ClassRef(ClassId),                                        // <name>
    End,                                                      // end of candidate
    Accept,                                                   // rest of candidate
}

/// One branch of a group. Without an explicit replacement the branch
/// contributes whatever its own nodes rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub(crate) nodes: Vec<Node>,
    pub(crate) replacement: Option<Vec<u8>>,
}

impl Alternative {
    pub fn new(nodes: Vec<Node>, replacement: Option<&str>) -> Self {
        Self {
            nodes,
            replacement: replacement.map(|r| r.as_bytes().to_vec()),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn replacement(&self) -> Option<&[u8]> {
        self.replacement.as_deref()
    }
}

/// A pattern element with its repetition bounds. `max == None` is unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) element: Element,
    pub(crate) min: usize,
    pub(crate) max: Option<usize>,
}

impl Node {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            min: 1,
            max: Some(1),
        }
    }

    pub fn char(byte: u8) -> Self {
        Node::new(Element::Char(byte))
    }

    /// A single byte becomes a `Char`, anything longer a `Literal`.
    pub fn literal(text: &[u8]) -> Self {
        match text {
            [byte] => Node::char(*byte),
            _ => Node::new(Element::Literal {
                text: text.to_vec(),
                replacement: text.to_vec(),
            }),
        }
    }

    pub fn end() -> Self {
        Node::new(Element::End)
    }

    pub fn accept() -> Self {
        Node::new(Element::Accept)
    }

    /// Sets the repetition range; `max` is clamped up to `min`.
    pub fn repeat(mut self, min: usize, max: Option<usize>) -> Self {
        self.set_reps(min, max);
        self
    }

    pub(crate) fn set_reps(&mut self, min: usize, max: Option<usize>) {
        self.min = min;
        self.max = max.map(|high| high.max(min));
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn min_reps(&self) -> usize {
        self.min
    }

    pub fn max_reps(&self) -> Option<usize> {
        self.max
    }
}

/// A compiled chain of nodes and the number of groups it numbered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pattern {
    pub(crate) nodes: Vec<Node>,
    pub(crate) groups: usize,
}

impl Pattern {
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let groups = nodes.iter().map(max_group).max().unwrap_or(0);
        Self { nodes, groups }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups
    }

    /// The match that consumes the most of `candidate`, whether or not it
    /// reaches the end.
    pub fn longest_match(&self, classes: &ClassRegistry, candidate: &str) -> Option<Match> {
        matcher::longest_match(self, classes, candidate.as_bytes())
    }

    /// Like [`Pattern::longest_match`] but only succeeds when the whole
    /// candidate is consumed.
    pub fn whole_match(&self, classes: &ClassRegistry, candidate: &str) -> Option<Match> {
        self.longest_match(classes, candidate)
            .filter(|m| m.consumed() == candidate.len())
    }
}

fn max_group(node: &Node) -> usize {
    match &node.element {
        Element::Group {
            alternatives,
            number,
        } => alternatives
            .iter()
            .flat_map(|alt| alt.nodes.iter())
            .map(max_group)
            .fold(*number, usize::max),
        _ => 0,
    }
}
