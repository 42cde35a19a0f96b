use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::term::Term;

/// A subject/predicate/object triple of structured terms.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Encode all three positions into the flat archive form.
    pub fn encode(&self) -> EncodedTriple {
        EncodedTriple {
            subject: self.subject.encode(),
            predicate: self.predicate.encode(),
            object: self.object.encode(),
        }
    }

    /// Encode for storage, rejecting any position that could not be read
    /// back: variables, empty IRIs and other strings that do not decode.
    pub fn try_encode(&self) -> Result<EncodedTriple, TypeError> {
        Ok(EncodedTriple {
            subject: encode_position("subject", &self.subject)?,
            predicate: encode_position("predicate", &self.predicate)?,
            object: encode_position("object", &self.object)?,
        })
    }

    /// Canonical SPO comparison on the encoded terms.
    pub fn cmp_spo(&self, other: &Self) -> Ordering {
        self.subject
            .encode()
            .cmp(&other.subject.encode())
            .then_with(|| self.predicate.encode().cmp(&other.predicate.encode()))
            .then_with(|| self.object.encode().cmp(&other.object.encode()))
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// A triple in the flat string form exchanged with an archive engine.
///
/// The derived `Ord` compares subject, then predicate, then object, each as
/// raw bytes. That is the canonical SPO order every append batch and every
/// result page follows.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EncodedTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl EncodedTriple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Decode into structured terms.
    pub fn decode(&self) -> Result<Triple, TypeError> {
        Ok(Triple {
            subject: decode_position("subject", &self.subject)?,
            predicate: decode_position("predicate", &self.predicate)?,
            object: decode_position("object", &self.object)?,
        })
    }
}

fn decode_position(position: &'static str, encoded: &str) -> Result<Term, TypeError> {
    let term = Term::decode(encoded)?;
    if term.is_variable() {
        return Err(TypeError::InvalidPosition {
            position,
            term: encoded.to_string(),
            reason: "variables cannot be stored",
        });
    }
    Ok(term)
}

fn encode_position(position: &'static str, term: &Term) -> Result<String, TypeError> {
    let encoded = term.encode();
    decode_position(position, &encoded)?;
    Ok(encoded)
}

/// A triple tagged as an addition or a deletion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripleDelta {
    pub triple: Triple,
    pub addition: bool,
}

impl TripleDelta {
    pub fn addition(triple: Triple) -> Self {
        Self {
            triple,
            addition: true,
        }
    }

    pub fn deletion(triple: Triple) -> Self {
        Self {
            triple,
            addition: false,
        }
    }

    pub fn encode(&self) -> EncodedDelta {
        EncodedDelta {
            triple: self.triple.encode(),
            addition: self.addition,
        }
    }

    /// See [`Triple::try_encode`].
    pub fn try_encode(&self) -> Result<EncodedDelta, TypeError> {
        Ok(EncodedDelta {
            triple: self.triple.try_encode()?,
            addition: self.addition,
        })
    }
}

/// Flat form of a [`TripleDelta`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedDelta {
    pub triple: EncodedTriple,
    pub addition: bool,
}

impl EncodedDelta {
    pub fn decode(&self) -> Result<TripleDelta, TypeError> {
        Ok(TripleDelta {
            triple: self.triple.decode()?,
            addition: self.addition,
        })
    }
}

/// A triple with every version at which it was present, ascending.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripleVersions {
    pub triple: Triple,
    pub versions: Vec<u32>,
}

/// Flat form of a [`TripleVersions`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedVersions {
    pub triple: EncodedTriple,
    pub versions: Vec<u32>,
}

impl EncodedVersions {
    pub fn decode(&self) -> Result<TripleVersions, TypeError> {
        Ok(TripleVersions {
            triple: self.triple.decode()?,
            versions: self.versions.clone(),
        })
    }
}

/// Sort deltas into canonical SPO order. The sort is stable, so repeated
/// entries for one triple keep their relative order.
pub fn sort_deltas(deltas: &mut [TripleDelta]) {
    deltas.sort_by_cached_key(|delta| delta.triple.encode());
}

/// Index of the first element that breaks canonical SPO order, if any.
pub fn first_unsorted(deltas: &[EncodedDelta]) -> Option<usize> {
    deltas
        .windows(2)
        .position(|pair| pair[0].triple > pair[1].triple)
        .map(|index| index + 1)
}
