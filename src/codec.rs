//! Leaf-level textual encoding.
//!
//! A string leaf is one of three things:
//!
//! * a literal: `#` followed by a JSON literal (`#3`, `#"x"`, `#{"a":[true]}`)
//! * a reference token: a slot marker, a decimal slot index and a free-form
//!   suffix (`$2.Alleged: instance`, `&0`)
//! * a plain string with no special meaning
use core::fmt;

use nom::{
    branch::alt,
    character::complete::{char, digit1},
    combinator::{all_consuming, map, rest},
    sequence::tuple,
    IResult,
};
use tracing::instrument;

use crate::{
    error::{MarshalError, MarshalResult},
    value::Value,
};

pub const LITERAL_MARKER: char = '#';

/// What a reference token points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Remotable,
    Promise,
}

impl SlotKind {
    pub fn marker(self) -> char {
        match self {
            SlotKind::Remotable => '$',
            SlotKind::Promise => '&',
        }
    }
}

/// Parsed form of a reference token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceToken {
    pub kind: SlotKind,
    pub index: usize,
    /// Everything after the digit run, kept byte-for-byte.
    pub suffix: String,
}

impl ReferenceToken {
    pub fn with_index(&self, index: usize) -> Self {
        Self {
            kind: self.kind,
            index,
            suffix: self.suffix.clone(),
        }
    }
}

impl fmt::Display for ReferenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.kind.marker(), self.index, self.suffix)
    }
}

/// Classification of a raw string leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedToken<'a> {
    Literal(&'a str),
    Reference(ReferenceToken),
    Plain(&'a str),
}

impl<'a> EncodedToken<'a> {
    pub fn classify(token: &'a str) -> Self {
        if let Some(literal) = token.strip_prefix(LITERAL_MARKER) {
            return EncodedToken::Literal(literal);
        }
        match parse_reference(token) {
            Ok(reference) => EncodedToken::Reference(reference),
            Err(_) => EncodedToken::Plain(token),
        }
    }
}

fn slot_kind(input: &str) -> IResult<&str, SlotKind> {
    alt((
        map(char('$'), |_| SlotKind::Remotable),
        map(char('&'), |_| SlotKind::Promise),
    ))(input)
}

/// A digit run too long for `usize` saturates so that it fails the range
/// check instead of the grammar.
fn slot_index(input: &str) -> IResult<&str, usize> {
    map(digit1, |s: &str| s.parse::<usize>().unwrap_or(usize::MAX))(input)
}

fn reference(input: &str) -> IResult<&str, ReferenceToken> {
    map(
        tuple((slot_kind, slot_index, rest)),
        |(kind, index, suffix): (SlotKind, usize, &str)| ReferenceToken {
            kind,
            index,
            suffix: suffix.to_string(),
        },
    )(input)
}

/// Parses `marker digit+ suffix*`.
pub fn parse_reference(token: &str) -> MarshalResult<ReferenceToken> {
    all_consuming(reference)(token)
        .map(|(_, reference)| reference)
        .map_err(|_| MarshalError::MalformedReference {
            value: token.to_string(),
        })
}

/// Decodes one string leaf.
///
/// Literals are parsed into a [`Value`]; reference tokens and plain strings come
/// back unchanged as [`Value::String`].
#[instrument(level = "trace")]
pub fn decode(token: &str) -> MarshalResult<Value> {
    match EncodedToken::classify(token) {
        EncodedToken::Literal(literal) => serde_json::from_str::<serde_json::Value>(literal)
            .map(Value::from)
            .map_err(|e| MarshalError::encoding(token, e)),
        EncodedToken::Reference(_) | EncodedToken::Plain(_) => Ok(Value::string(token)),
    }
}

/// Renders a literal value with the literal marker.
pub fn encode(value: &Value) -> String {
    format!("{}{}", LITERAL_MARKER, value.to_json_string())
}

/// Leaf function used when serializing a tree: strings not meant as literals
/// pass through.
pub fn encode_leaf(token: String) -> String {
    token
}
