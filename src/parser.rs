use nom::{
    bytes::complete::take_till,
    character::complete::{char, digit1},
    combinator::{map_opt, opt},
    sequence::{delimited, pair, preceded},
    IResult,
};
use std::cell::RefCell;

use crate::class::{ClassRegistry, Insert};
use crate::matcher::CAPTURE_SLOTS;
use crate::pattern::{Alternative, ByteSet, Element, Node, Pattern};
use crate::warning::Warning;

pub const ESCAPE: u8 = b'%';
pub const OPTIONAL: u8 = b'?';
pub const STAR: u8 = b'*';
pub const PLUS: u8 = b'+';
pub const GROUP_BEGIN: u8 = b'(';
pub const ALT_SEPARATOR: u8 = b',';
pub const GROUP_END: u8 = b')';
pub const REPLACE: u8 = b'|';
pub const CLASS_BEGIN: u8 = b'<';
pub const CLASS_DECLARE: u8 = b':';
pub const CLASS_END: u8 = b'>';
pub const COUNT_BEGIN: u8 = b'{';
pub const COUNT_SEPARATOR: u8 = b',';
pub const COUNT_END: u8 = b'}';
pub const SET_BEGIN: u8 = b'[';
pub const SET_NEGATE: u8 = b'^';
pub const SET_RANGE: u8 = b'-';
pub const SET_END: u8 = b']';
pub const WILDCARD: u8 = b'.';

/// A compiled pattern and whatever had to be recovered along the way.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub pattern: Pattern,
    pub warnings: Vec<Warning>,
}

struct ParseContext<'r> {
    source_len: usize,
    group_counter: RefCell<usize>,
    warnings: RefCell<Vec<Warning>>,
    classes: RefCell<&'r mut ClassRegistry>,
}

impl<'r> ParseContext<'r> {
    fn new(source: &[u8], classes: &'r mut ClassRegistry) -> Self {
        Self {
            source_len: source.len(),
            group_counter: RefCell::new(0),
            warnings: RefCell::new(Vec::new()),
            classes: RefCell::new(classes),
        }
    }

    fn next_group_number(&self) -> usize {
        let mut counter = self.group_counter.borrow_mut();
        *counter += 1;
        *counter
    }

    fn pos(&self, input: &[u8]) -> usize {
        self.source_len - input.len()
    }

    fn warn(&self, warning: Warning) {
        self.warnings.borrow_mut().push(warning);
    }
}

/// Compiles `source`, registering any classes it names or declares in
/// `classes`. Malformed syntax is recovered and reported, never rejected.
pub fn compile(source: &str, classes: &mut ClassRegistry) -> Compiled {
    let bytes = source.as_bytes();
    let context = ParseContext::new(bytes, classes);
    let (_, nodes) = sequence(bytes, &context, false);
    let ParseContext {
        group_counter,
        warnings,
        ..
    } = context;
    Compiled {
        pattern: Pattern {
            nodes,
            groups: group_counter.into_inner(),
        },
        warnings: warnings.into_inner(),
    }
}

fn sequence<'a>(
    mut input: &'a [u8],
    context: &ParseContext<'_>,
    in_group: bool,
) -> (&'a [u8], Vec<Node>) {
    let mut nodes = Vec::new();
    while let Some(&byte) = input.first() {
        if in_group && is_terminator(byte) {
            break;
        }
        let (rest, mut atoms) = atom(input, context, in_group);
        let (rest, reps) = quantifier(rest, context);
        if let (Some((min, max)), Some(last)) = (reps, atoms.last_mut()) {
            last.set_reps(min, max);
        }
        nodes.append(&mut atoms);
        input = rest;
    }
    (input, nodes)
}

// Always consumes at least one byte of a non-empty input.
fn atom<'a>(input: &'a [u8], context: &ParseContext<'_>, in_group: bool) -> (&'a [u8], Vec<Node>) {
    match input[0] {
        GROUP_BEGIN => {
            let (rest, node) = group(input, context);
            (rest, vec![node])
        }
        CLASS_BEGIN => {
            let (rest, node) = class_ref(input, context);
            (rest, vec![node])
        }
        SET_BEGIN => {
            let (rest, node) = set(input, context);
            (rest, vec![node])
        }
        WILDCARD => (
            &input[1..],
            vec![Node::new(Element::CharSet(Box::new(ByteSet::full())))],
        ),
        OPTIONAL | STAR | PLUS => {
            context.warn(Warning::DanglingQuantifier {
                pos: context.pos(input),
            });
            literal_run(input, context, in_group)
        }
        COUNT_BEGIN => {
            if count(input).is_ok() {
                context.warn(Warning::DanglingQuantifier {
                    pos: context.pos(input),
                });
            }
            literal_run(input, context, in_group)
        }
        _ => literal_run(input, context, in_group),
    }
}

fn is_special(byte: u8) -> bool {
    matches!(byte, GROUP_BEGIN | CLASS_BEGIN | SET_BEGIN | WILDCARD)
}

fn is_terminator(byte: u8) -> bool {
    matches!(byte, ALT_SEPARATOR | GROUP_END | REPLACE)
}

fn is_quantifier_start(input: &[u8]) -> bool {
    match input.first() {
        Some(&(OPTIONAL | STAR | PLUS)) => true,
        Some(&COUNT_BEGIN) => count(input).is_ok(),
        _ => false,
    }
}

fn quantifier<'a>(
    input: &'a [u8],
    context: &ParseContext<'_>,
) -> (&'a [u8], Option<(usize, Option<usize>)>) {
    match input.first() {
        Some(&OPTIONAL) => (&input[1..], Some((0, Some(1)))),
        Some(&STAR) => (&input[1..], Some((0, None))),
        Some(&PLUS) => (&input[1..], Some((1, None))),
        Some(&COUNT_BEGIN) => match count(input) {
            Ok((rest, reps)) => (rest, Some(reps)),
            Err(_) => {
                context.warn(Warning::MalformedCount {
                    pos: context.pos(input),
                });
                (input, None)
            }
        },
        _ => (input, None),
    }
}

/// `{low}`, `{low,}` or `{low,high}`.
fn count(input: &[u8]) -> IResult<&[u8], (usize, Option<usize>)> {
    let (rest, (low, high)) = delimited(
        char(char::from(COUNT_BEGIN)),
        pair(
            number,
            opt(preceded(char(char::from(COUNT_SEPARATOR)), opt(number))),
        ),
        char(char::from(COUNT_END)),
    )(input)?;

    let high = match high {
        None => Some(low),
        Some(None) => None,
        Some(Some(high)) => Some(high),
    };
    Ok((rest, (low, high)))
}

fn number(input: &[u8]) -> IResult<&[u8], usize> {
    map_opt(digit1, |digits: &[u8]| {
        digits.iter().try_fold(0usize, |acc, &digit| {
            acc.checked_mul(10)?.checked_add(usize::from(digit - b'0'))
        })
    })(input)
}

/// Reads one byte, resolving an escape.
fn unescape<'a>(input: &'a [u8], context: &ParseContext<'_>) -> Option<(&'a [u8], u8)> {
    match input {
        [ESCAPE, escaped, rest @ ..] => Some((rest, *escaped)),
        [ESCAPE] => {
            context.warn(Warning::TrailingEscape {
                pos: context.pos(input),
            });
            Some((&input[1..], ESCAPE))
        }
        [byte, rest @ ..] => Some((rest, *byte)),
        [] => None,
    }
}

fn escaped_until<'a>(
    mut input: &'a [u8],
    context: &ParseContext<'_>,
    stop: impl Fn(u8) -> bool,
) -> (&'a [u8], Vec<u8>) {
    let mut text = Vec::new();
    while let Some(&byte) = input.first() {
        if stop(byte) {
            break;
        }
        let Some((rest, resolved)) = unescape(input, context) else {
            break;
        };
        text.push(resolved);
        input = rest;
    }
    (input, text)
}

/// Collects literal bytes up to the next special character or quantifier.
/// A quantifier after a run of several bytes only repeats the last one.
fn literal_run<'a>(
    input: &'a [u8],
    context: &ParseContext<'_>,
    in_group: bool,
) -> (&'a [u8], Vec<Node>) {
    let mut text = Vec::new();
    let mut rest = input;
    while let Some(&byte) = rest.first() {
        if !text.is_empty() {
            if is_special(byte)
                || (in_group && is_terminator(byte))
                || matches!(byte, OPTIONAL | STAR | PLUS)
            {
                break;
            }
            if byte == COUNT_BEGIN {
                if count(rest).is_ok() {
                    break;
                }
                context.warn(Warning::MalformedCount {
                    pos: context.pos(rest),
                });
            }
        }
        let Some((after, resolved)) = unescape(rest, context) else {
            break;
        };
        text.push(resolved);
        rest = after;
    }

    let peeled = if text.len() > 1 && is_quantifier_start(rest) {
        text.pop()
    } else {
        None
    };
    let mut nodes = vec![Node::literal(&text)];
    if let Some(last) = peeled {
        nodes.push(Node::char(last));
    }
    (rest, nodes)
}

fn group<'a>(input: &'a [u8], context: &ParseContext<'_>) -> (&'a [u8], Node) {
    let open = context.pos(input);
    let number = context.next_group_number();
    if number >= CAPTURE_SLOTS {
        context.warn(Warning::GroupOutOfRange { number, pos: open });
    }

    let mut alternatives = Vec::new();
    let mut rest = &input[1..];
    loop {
        let (after, nodes) = sequence(rest, context, true);
        let (after, replacement) = match after.first() {
            Some(&REPLACE) => {
                let (after, text) = escaped_until(&after[1..], context, |b| {
                    b == ALT_SEPARATOR || b == GROUP_END
                });
                (after, Some(text))
            }
            _ => (after, None),
        };
        alternatives.push(Alternative { nodes, replacement });

        match after.first() {
            Some(&ALT_SEPARATOR) => rest = &after[1..],
            Some(&GROUP_END) => {
                rest = &after[1..];
                break;
            }
            _ => {
                context.warn(Warning::UnterminatedGroup { pos: open });
                rest = after;
                break;
            }
        }
    }
    (
        rest,
        Node::new(Element::Group {
            alternatives,
            number,
        }),
    )
}

fn class_name(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_till(|b| b == CLASS_END || b == CLASS_DECLARE)(input)
}

/// `<name>` or `<name:member,member|replacement,...>`.
fn class_ref<'a>(input: &'a [u8], context: &ParseContext<'_>) -> (&'a [u8], Node) {
    let open = context.pos(input);
    let body = &input[1..];
    let (mut rest, name) = class_name(body).unwrap_or((&body[body.len()..], body));
    let name = String::from_utf8_lossy(name).into_owned();
    let id = context.classes.borrow_mut().find_or_create(&name);

    if rest.first() == Some(&CLASS_DECLARE) {
        rest = &rest[1..];
        loop {
            let (after, member) = escaped_until(rest, context, |b| {
                matches!(b, ALT_SEPARATOR | CLASS_END | REPLACE)
            });
            let (after, replacement) = if after.first() == Some(&REPLACE) {
                let (after, text) = escaped_until(&after[1..], context, |b| {
                    b == ALT_SEPARATOR || b == CLASS_END
                });
                (after, Some(text))
            } else {
                (after, None)
            };
            if !member.is_empty() {
                declare(context, &name, &member, replacement.as_deref());
            }
            match after.first() {
                Some(&ALT_SEPARATOR) => rest = &after[1..],
                _ => {
                    rest = after;
                    break;
                }
            }
        }
    }

    match rest.first() {
        Some(&CLASS_END) => rest = &rest[1..],
        _ => context.warn(Warning::UnterminatedClass { pos: open }),
    }
    (rest, Node::new(Element::ClassRef(id)))
}

fn declare(context: &ParseContext<'_>, class: &str, member: &[u8], replacement: Option<&[u8]>) {
    let member = String::from_utf8_lossy(member);
    let replacement = replacement.map(String::from_utf8_lossy);
    let outcome = context
        .classes
        .borrow_mut()
        .add_member(class, &member, replacement.as_deref());
    if outcome == Insert::OutOfMemory {
        context.warn(Warning::ClassAllocation {
            name: class.to_string(),
        });
    }
}

/// `[...]`: a leading `^` negates, a leading `]` or `-` is a member.
fn set<'a>(input: &'a [u8], context: &ParseContext<'_>) -> (&'a [u8], Node) {
    let open = context.pos(input);
    let mut rest = &input[1..];
    let negated = rest.first() == Some(&SET_NEGATE);
    if negated {
        rest = &rest[1..];
    }

    let mut members = ByteSet::empty();
    let mut first = true;
    let mut closed = false;
    while let Some(&byte) = rest.first() {
        if byte == SET_END && !first {
            rest = &rest[1..];
            closed = true;
            break;
        }
        first = false;
        let Some((after, low)) = unescape(rest, context) else {
            break;
        };
        rest = match after {
            [SET_RANGE, high, ..] if *high != SET_END => match unescape(&after[1..], context) {
                Some((after, high)) => {
                    members.insert_range_folded(low.min(high), low.max(high));
                    after
                }
                None => after,
            },
            _ => {
                members.insert_folded(low);
                after
            }
        };
    }

    if !closed {
        context.warn(Warning::UnterminatedSet { pos: open });
    }
    if negated {
        members.negate();
    }
    (rest, Node::new(Element::CharSet(Box::new(members))))
}
