/// A recoverable problem found while compiling a pattern or rendering a
/// replacement. None of these stop compilation or matching.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("unterminated group opened at {pos}")]
    UnterminatedGroup { pos: usize },
    #[error("unterminated character set opened at {pos}")]
    UnterminatedSet { pos: usize },
    #[error("unterminated class reference opened at {pos}")]
    UnterminatedClass { pos: usize },
    #[error("malformed repetition count at {pos}, taken literally")]
    MalformedCount { pos: usize },
    #[error("quantifier at {pos} has nothing to repeat, taken literally")]
    DanglingQuantifier { pos: usize },
    #[error("pattern ends with an escape character at {pos}")]
    TrailingEscape { pos: usize },
    #[error("group {number} opened at {pos} has no capture slot")]
    GroupOutOfRange { number: usize, pos: usize },
    #[error("replacement refers to group {index}, which the pattern does not define")]
    UnknownGroup { index: usize },
    #[error("replacement refers to group {index}, which did not match")]
    UnsetGroup { index: usize },
    #[error("could not grow class <{name}>")]
    ClassAllocation { name: String },
}
