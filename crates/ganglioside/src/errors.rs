use std::fmt::Display;

use miette::{Diagnostic, LabeledSpan, SourceCode, SourceSpan};
use nom::error::{ErrorKind, ParseError};
use thiserror::Error;

pub type Result<T, E = Box<NameParseError>> = std::result::Result<T, E>;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("could not interpret {:?} as a ganglioside name: {kind}", .name.trim_end())]
pub struct NameParseError {
    name: String,
    span: SourceSpan,
    kind: NameErrorKind,
}

impl Diagnostic for NameParseError {
    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.name)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.kind
            .help()
            .map(|help| Box::new(help) as Box<dyn Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new_with_span(Some(self.kind.label().to_owned()), self.span);
        Some(Box::new(std::iter::once(label)))
    }
}

impl NameParseError {
    pub(crate) fn new(name: &str, offset: usize, kind: NameErrorKind) -> Self {
        // NOTE: The extra space lets a zero-length label point at the end of the input
        let name = format!("{name} ");
        let span = SourceSpan::from((offset, 1));
        Self { name, span, kind }
    }

    #[must_use]
    pub const fn kind(&self) -> &NameErrorKind {
        &self.kind
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum NameErrorKind {
    #[error("expected a head group (like GD1a or LacCer) starting with a letter")]
    ExpectedHead,

    #[error("expected a modifier (like OAc or dHex), optionally preceded by a count")]
    ExpectedModifier,

    #[error("counts cannot start with 0")]
    ExpectedNoLeadingZero,

    #[error("expected an ASCII digit")]
    ExpectedDigit,

    #[error("expected '(' to open the lipid chain")]
    ExpectedChainStart,

    #[error("expected a lipid chain like 36:1;O2")]
    ExpectedChain,

    #[error("expected ':' between the carbon count and the number of double bonds")]
    ExpectedChainSeparator,

    #[error("expected ')' to close the lipid chain")]
    ExpectedChainEnd,

    #[error("internal `nom` error: {0:?}")]
    NomError(ErrorKind),

    #[error("could not interpret the full input as a ganglioside name")]
    Incomplete,
}

impl NameErrorKind {
    const fn label(&self) -> &'static str {
        match self {
            Self::ExpectedHead => "expected a head group",
            Self::ExpectedModifier => "expected a modifier",
            Self::ExpectedNoLeadingZero => "expected non-zero",
            Self::ExpectedDigit => "expected digit",
            Self::ExpectedChainStart => "expected '('",
            Self::ExpectedChain => "expected a lipid chain",
            Self::ExpectedChainSeparator => "expected ':'",
            Self::ExpectedChainEnd => "expected ')'",
            Self::NomError(_) => "the region that triggered this bug!",
            Self::Incomplete => "input was valid up until this point",
        }
    }

    const fn help(&self) -> Option<&'static str> {
        Some(match self {
            Self::ExpectedModifier => "modifiers are written as `+OAc`, `+2OAc`, or `+dHex`",
            Self::ExpectedNoLeadingZero => {
                "a leading zero doesn't make sense in a count, so write `+2OAc` instead of `+02OAc`"
            }
            Self::ExpectedChainEnd => "you've probably forgotten to close an earlier '(' bracket",
            Self::NomError(_) => {
                "this is an internal error that you shouldn't ever see! If you have gotten this error, \
                then please report it as a bug!"
            }
            Self::Incomplete => {
                "check the unparsed region for errors, or remove it from the rest of the name"
            }
            _ => return None,
        })
    }
}

impl From<ErrorKind> for NameErrorKind {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::Eof => Self::Incomplete,
            kind => Self::NomError(kind),
        }
    }
}

// Parser-internal error ===============================================================================================

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct ParseFailure<'s> {
    pub(crate) input: &'s str,
    pub(crate) kind: NameErrorKind,
}

impl<'s> ParseFailure<'s> {
    pub(crate) const fn new(input: &'s str, kind: NameErrorKind) -> Self {
        Self { input, kind }
    }
}

impl<'s> ParseError<&'s str> for ParseFailure<'s> {
    fn from_error_kind(input: &'s str, kind: ErrorKind) -> Self {
        Self::new(input, kind.into())
    }

    // NOTE: The innermost error is the most specific one, so it's kept as-is
    fn append(_input: &'s str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}
