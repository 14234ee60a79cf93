use std::cell::RefCell;

use crate::class::ClassRegistry;
use crate::pattern::{Alternative, Element, Node, Pattern};

/// Number of capture slots, one per `%0`..`%9`.
pub const CAPTURE_SLOTS: usize = 10;

type Slots = [Option<Vec<u8>>; CAPTURE_SLOTS];

/// Text recorded per group number. Slot 0 holds the whole rendered output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    slots: [Option<String>; CAPTURE_SLOTS],
}

impl Captures {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.slots.get(index)?.as_deref()
    }
}

/// The result of a successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    consumed: usize,
    output: String,
    captures: Captures,
}

impl Match {
    /// Bytes of the candidate consumed by the match.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// What the nodes rendered: input bytes for characters and sets,
    /// replacement text for literals, branches and class members.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn captures(&self) -> &Captures {
        &self.captures
    }
}

// A complete way through the pattern, snapshotted when the chain runs out.
struct Found {
    end: usize,
    output: Vec<u8>,
    slots: Slots,
}

impl Found {
    fn into_match(self) -> Match {
        let output = lossy(&self.output);
        let mut captures = Captures::default();
        for (slot, text) in captures.slots.iter_mut().zip(self.slots) {
            *slot = text.as_deref().map(lossy);
        }
        captures.slots[0] = Some(output.clone());
        Match {
            consumed: self.end,
            output,
            captures,
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// Output and captures of the path currently being explored. Every step
// leaves it exactly as it found it once it returns.
#[derive(Default)]
struct Trail {
    output: Vec<u8>,
    slots: Slots,
}

// One way a single repetition can end. `reach` is how far the rest of the
// chain got when the repetition stopped there.
struct Exit {
    end: usize,
    output: Vec<u8>,
    slots: Slots,
    reach: Option<usize>,
}

impl Exit {
    fn rank(&self) -> usize {
        self.reach.map_or(self.end, |reach| reach.max(self.end))
    }
}

#[derive(Clone, Copy)]
struct Branch<'a> {
    alt: &'a Alternative,
    number: usize,
    mark: usize,
    stop: bool,
}

// What remains to be matched after the current node.
enum Next<'a> {
    Done,
    Seq {
        nodes: &'a [Node],
        then: &'a Next<'a>,
    },
    Close {
        branch: Branch<'a>,
        chosen: &'a RefCell<Option<Exit>>,
        then: &'a Next<'a>,
    },
}

struct Search<'p> {
    classes: &'p ClassRegistry,
    input: &'p [u8],
}

pub(crate) fn longest_match(
    pattern: &Pattern,
    classes: &ClassRegistry,
    input: &[u8],
) -> Option<Match> {
    let search = Search { classes, input };
    let mut trail = Trail::default();
    let start = Next::Seq {
        nodes: &pattern.nodes,
        then: &Next::Done,
    };
    search
        .resume(&start, 0, &mut trail)
        .map(Found::into_match)
}

fn keep(best: &mut Option<Found>, found: Option<Found>) {
    if let Some(found) = found {
        if best.as_ref().map_or(true, |b| found.end > b.end) {
            *best = Some(found);
        }
    }
}

// Like `keep`, but a later repetition count wins a tie.
fn keep_latest(best: &mut Option<Found>, found: Option<Found>) {
    if let Some(found) = found {
        if best.as_ref().map_or(true, |b| found.end >= b.end) {
            *best = Some(found);
        }
    }
}

fn record(chosen: &RefCell<Option<Exit>>, exit: Exit) {
    let mut chosen = chosen.borrow_mut();
    if chosen.as_ref().map_or(true, |c| exit.rank() > c.rank()) {
        *chosen = Some(exit);
    }
}

impl Search<'_> {
    fn is_full(&self, best: &Option<Found>) -> bool {
        best.as_ref().is_some_and(|b| b.end == self.input.len())
    }

    fn resume(&self, next: &Next<'_>, pos: usize, trail: &mut Trail) -> Option<Found> {
        match *next {
            Next::Done => Some(Found {
                end: pos,
                output: trail.output.clone(),
                slots: trail.slots.clone(),
            }),
            Next::Seq { nodes, then } => match nodes.split_first() {
                None => self.resume(then, pos, trail),
                Some((node, rest)) => {
                    self.node(node, &Next::Seq { nodes: rest, then }, pos, trail)
                }
            },
            Next::Close {
                branch,
                chosen,
                then,
            } => self.close(branch, chosen, then, pos, trail),
        }
    }

    fn node(&self, node: &Node, then: &Next<'_>, pos: usize, trail: &mut Trail) -> Option<Found> {
        match &node.element {
            Element::Char(_) | Element::CharSet(_) => self.bytes(node, then, pos, trail),
            Element::Literal { text, replacement } => {
                self.literal(node, text, replacement, then, pos, trail)
            }
            Element::Group { .. } | Element::ClassRef(_) => self.repeat(node, then, pos, trail),
            Element::End => {
                if pos == self.input.len() || node.min == 0 {
                    self.resume(then, pos, trail)
                } else {
                    None
                }
            }
            Element::Accept => {
                let mark = trail.output.len();
                trail.output.extend_from_slice(&self.input[pos..]);
                let mut best = self.resume(then, self.input.len(), trail);
                trail.output.truncate(mark);
                if best.is_none() && node.min == 0 {
                    best = self.resume(then, pos, trail);
                }
                best
            }
        }
    }

    fn bytes(&self, node: &Node, then: &Next<'_>, pos: usize, trail: &mut Trail) -> Option<Found> {
        let rest = &self.input[pos..];
        let limit = node.max.unwrap_or(rest.len()).min(rest.len());
        let available = rest[..limit]
            .iter()
            .take_while(|&&byte| accepts(&node.element, byte))
            .count();
        if available < node.min {
            return None;
        }

        let mark = trail.output.len();
        let mut best = None;
        for reps in (node.min..=available).rev() {
            trail.output.extend_from_slice(&rest[..reps]);
            let found = self.resume(then, pos + reps, trail);
            trail.output.truncate(mark);
            keep(&mut best, found);
            if self.is_full(&best) {
                break;
            }
        }
        best
    }

    fn literal(
        &self,
        node: &Node,
        text: &[u8],
        replacement: &[u8],
        then: &Next<'_>,
        pos: usize,
        trail: &mut Trail,
    ) -> Option<Found> {
        let mark = trail.output.len();
        if text.is_empty() {
            trail.output.extend_from_slice(replacement);
            let found = self.resume(then, pos, trail);
            trail.output.truncate(mark);
            return found;
        }

        let rest = &self.input[pos..];
        let available = rest
            .chunks_exact(text.len())
            .take(node.max.unwrap_or(usize::MAX))
            .take_while(|chunk| chunk.eq_ignore_ascii_case(text))
            .count();
        if available < node.min {
            return None;
        }

        let mut best = None;
        for reps in (node.min..=available).rev() {
            for _ in 0..reps {
                trail.output.extend_from_slice(replacement);
            }
            let found = self.resume(then, pos + reps * text.len(), trail);
            trail.output.truncate(mark);
            keep(&mut best, found);
            if self.is_full(&best) {
                break;
            }
        }
        best
    }

    /// Repeats a group or class reference one step at a time. Each step
    /// looks ahead through the rest of the chain and moves on along the
    /// ending that reached farthest. Stopping after every allowed count is
    /// kept as a candidate.
    fn repeat(&self, node: &Node, then: &Next<'_>, pos: usize, trail: &mut Trail) -> Option<Found> {
        let mark = trail.output.len();
        let saved = trail.slots.clone();
        let mut best = None;
        if node.min == 0 {
            keep(&mut best, self.resume(then, pos, trail));
        }

        let mut count = 0;
        let mut at = pos;
        while node.max.map_or(true, |max| count < max) {
            let stop = count + 1 >= node.min;
            let (found, exit) = self.step(node, then, at, stop, trail);
            keep_latest(&mut best, found);
            if self.is_full(&best) {
                break;
            }
            let Some(exit) = exit else {
                break;
            };
            trail.output.extend_from_slice(&exit.output);
            trail.slots = exit.slots;
            // Nothing consumed: further steps would end in the same place.
            if exit.end == at {
                if !stop {
                    keep_latest(&mut best, self.resume(then, at, trail));
                }
                break;
            }
            count += 1;
            at = exit.end;
        }

        trail.output.truncate(mark);
        trail.slots = saved;
        best
    }

    /// One repetition from `pos`. Returns the best match that stops right
    /// after it (only when `stop` is set) and the ending to continue from.
    fn step(
        &self,
        node: &Node,
        then: &Next<'_>,
        pos: usize,
        stop: bool,
        trail: &mut Trail,
    ) -> (Option<Found>, Option<Exit>) {
        let chosen = RefCell::new(None);
        let mut best = None;
        match &node.element {
            Element::Group {
                alternatives,
                number,
            } => {
                for alt in alternatives {
                    let close = Next::Close {
                        branch: Branch {
                            alt,
                            number: *number,
                            mark: trail.output.len(),
                            stop,
                        },
                        chosen: &chosen,
                        then,
                    };
                    let inner = Next::Seq {
                        nodes: &alt.nodes,
                        then: &close,
                    };
                    keep(&mut best, self.resume(&inner, pos, trail));
                    if self.is_full(&best) {
                        break;
                    }
                }
            }
            Element::ClassRef(id) => {
                if let Some(class) = self.classes.get(*id) {
                    let rest = &self.input[pos..];
                    let mark = trail.output.len();
                    let mut from = 0;
                    while let Some((len, index)) = class.find_member(rest, from) {
                        let replacement = class.members()[index].replacement();
                        let mut reach = None;
                        if stop {
                            trail.output.extend_from_slice(replacement);
                            let found = self.resume(then, pos + len, trail);
                            trail.output.truncate(mark);
                            reach = found.as_ref().map(|f| f.end);
                            keep(&mut best, found);
                        }
                        record(
                            &chosen,
                            Exit {
                                end: pos + len,
                                output: replacement.to_vec(),
                                slots: trail.slots.clone(),
                                reach,
                            },
                        );
                        if self.is_full(&best) {
                            break;
                        }
                        from = index + 1;
                    }
                }
            }
            _ => {}
        }
        (best, chosen.into_inner())
    }

    /// Runs once a branch's own nodes have matched: swaps in the branch's
    /// replacement, records the capture and offers the ending to the step.
    fn close(
        &self,
        branch: Branch<'_>,
        chosen: &RefCell<Option<Exit>>,
        then: &Next<'_>,
        pos: usize,
        trail: &mut Trail,
    ) -> Option<Found> {
        let rendered = trail.output.split_off(branch.mark);
        let local = match &branch.alt.replacement {
            Some(replacement) => replacement.clone(),
            None => rendered.clone(),
        };
        trail.output.extend_from_slice(&local);
        let previous = trail
            .slots
            .get_mut(branch.number)
            .map(|slot| std::mem::replace(slot, Some(local.clone())));

        let found = if branch.stop {
            self.resume(then, pos, trail)
        } else {
            None
        };
        record(
            chosen,
            Exit {
                end: pos,
                output: local,
                slots: trail.slots.clone(),
                reach: found.as_ref().map(|f| f.end),
            },
        );

        if let (Some(slot), Some(previous)) = (trail.slots.get_mut(branch.number), previous) {
            *slot = previous;
        }
        trail.output.truncate(branch.mark);
        trail.output.extend_from_slice(&rendered);
        found
    }
}

fn accepts(element: &Element, byte: u8) -> bool {
    match element {
        Element::Char(c) => c.eq_ignore_ascii_case(&byte),
        Element::CharSet(set) => set.contains(byte),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{ByteSet, Node};

    fn probe(nodes: Vec<Node>, input: &str) -> Option<Match> {
        Pattern::from_nodes(nodes).longest_match(&ClassRegistry::new(), input)
    }

    fn letters() -> Node {
        let mut set = ByteSet::empty();
        set.insert_range_folded(b'a', b'z');
        Node::new(Element::CharSet(Box::new(set)))
    }

    #[test]
    fn bounded_repeat_stops_at_max() {
        let m = probe(vec![letters().repeat(2, Some(4))], "abcde").unwrap();
        assert_eq!(m.consumed(), 4);
        assert_eq!(m.output(), "abcd");
    }

    #[test]
    fn bounded_repeat_needs_min() {
        assert!(probe(vec![letters().repeat(3, Some(4))], "ab").is_none());
    }

    #[test]
    fn greedy_repeat_gives_back_for_the_rest() {
        let m = probe(vec![letters().repeat(0, None), Node::char(b'z')], "abz").unwrap();
        assert_eq!(m.consumed(), 3);
    }

    #[test]
    fn literal_renders_its_replacement() {
        let m = probe(vec![Node::literal(b"ab").repeat(1, None)], "ABab").unwrap();
        assert_eq!(m.consumed(), 4);
        assert_eq!(m.output(), "abab");
    }

    #[test]
    fn char_copies_the_candidate_byte() {
        let m = probe(vec![Node::char(b'a')], "A").unwrap();
        assert_eq!(m.output(), "A");
    }

    #[test]
    fn end_only_at_exhaustion() {
        assert!(probe(vec![Node::char(b'a'), Node::end()], "a").is_some());
        assert!(probe(vec![Node::char(b'a').repeat(0, None), Node::end()], "aab").is_none());
        assert!(probe(vec![Node::char(b'b'), Node::end()], "ba").is_none());
    }

    #[test]
    fn accept_takes_the_rest() {
        let m = probe(vec![Node::char(b'x'), Node::accept()], "xyz").unwrap();
        assert_eq!(m.consumed(), 3);
        assert_eq!(m.output(), "xyz");
    }

    #[test]
    fn empty_branch_does_not_loop() {
        let group = Node::new(Element::Group {
            alternatives: vec![Alternative::new(vec![], None)],
            number: 1,
        })
        .repeat(2, None);
        let m = probe(vec![group], "abc").unwrap();
        assert_eq!(m.consumed(), 0);
        assert_eq!(m.captures().get(1), Some(""));
    }
}
