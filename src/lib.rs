pub mod class;
pub mod matcher;
pub mod parser;
pub mod pattern;
pub mod rule;
pub mod warning;

pub use class::{ClassId, ClassRegistry, EquivalenceClass, Insert, Member};
pub use matcher::{Captures, Match, CAPTURE_SLOTS};
pub use parser::{compile, Compiled};
pub use pattern::{Alternative, ByteSet, Element, Node, Pattern};
pub use rule::{render, Rewrite, Rule};
pub use warning::Warning;
