use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// IRI of `xsd:string`, the implicit datatype of plain literals.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// A structured RDF term.
///
/// Terms travel to and from an archive in a flat string encoding:
///
/// | Term | Encoding |
/// |---|---|
/// | named node | `http://example.org/a` (no angle brackets) |
/// | blank node | `_:b0` |
/// | variable | `?s` |
/// | plain literal | `"value"` |
/// | language literal | `"value"@en` |
/// | typed literal | `"value"^^http://example.org/type` |
///
/// [`Term::encode`] and [`Term::decode`] convert between the two forms.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Term {
    NamedNode { iri: String },
    BlankNode { label: String },
    Literal(Literal),
    Variable { name: String },
}

/// An RDF literal: a lexical value with either a language or a datatype.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    /// `None` for plain (`xsd:string`) and language-tagged literals.
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    /// A plain string literal.
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    /// A literal with an explicit datatype. `xsd:string` collapses to plain.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        Self {
            value: value.into(),
            datatype: (datatype != XSD_STRING).then_some(datatype),
            language: None,
        }
    }

    /// A language-tagged literal.
    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    fn encode(&self) -> String {
        match (&self.language, &self.datatype) {
            (Some(language), _) => format!("\"{}\"@{}", self.value, language),
            (None, Some(datatype)) => format!("\"{}\"^^{}", self.value, datatype),
            (None, None) => format!("\"{}\"", self.value),
        }
    }

    fn decode(encoded: &str) -> Result<Self, TypeError> {
        // The lexical value runs up to the last quote; anything after it is a suffix.
        let close = encoded
            .rfind('"')
            .filter(|&index| index > 0)
            .ok_or_else(|| TypeError::UnterminatedLiteral(encoded.to_string()))?;
        let value = &encoded[1..close];
        let suffix = &encoded[close + 1..];

        if suffix.is_empty() {
            return Ok(Self::plain(value));
        }
        if let Some(language) = suffix.strip_prefix('@') {
            if !language.is_empty()
                && language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            {
                return Ok(Self::lang(value, language));
            }
        }
        if let Some(datatype) = suffix.strip_prefix("^^") {
            if !datatype.is_empty() {
                return Ok(Self::typed(value, datatype));
            }
        }
        Err(TypeError::InvalidLiteralSuffix {
            literal: encoded.to_string(),
            suffix: suffix.to_string(),
        })
    }
}

impl Term {
    pub fn named_node(iri: impl Into<String>) -> Self {
        Self::NamedNode { iri: iri.into() }
    }

    pub fn blank_node(label: impl Into<String>) -> Self {
        Self::BlankNode {
            label: label.into(),
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(Literal::plain(value))
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal(Literal::typed(value, datatype))
    }

    pub fn lang_literal(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal(Literal::lang(value, language))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable { name: name.into() }
    }

    /// Returns `true` for variables, which act as wildcards in patterns.
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable { .. })
    }

    /// Encode this term into the flat archive string form.
    pub fn encode(&self) -> String {
        match self {
            Self::NamedNode { iri } => iri.clone(),
            Self::BlankNode { label } => format!("_:{label}"),
            Self::Literal(literal) => literal.encode(),
            Self::Variable { name } => format!("?{name}"),
        }
    }

    /// Decode a term from the flat archive string form.
    pub fn decode(encoded: &str) -> Result<Self, TypeError> {
        if encoded.is_empty() {
            return Err(TypeError::EmptyTerm);
        }
        if encoded.starts_with('"') {
            return Literal::decode(encoded).map(Self::Literal);
        }
        if let Some(label) = encoded.strip_prefix("_:") {
            return Ok(Self::blank_node(label));
        }
        if let Some(name) = encoded.strip_prefix('?') {
            return Ok(Self::variable(name));
        }
        Ok(Self::named_node(encoded))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Term {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
