use serde::{Deserialize, Serialize};

use crate::term::Term;
use crate::triple::EncodedTriple;

/// One position of a triple pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermPattern {
    /// Match exactly this encoded term.
    Bound(String),
    /// Match any term.
    #[default]
    Wildcard,
}

impl TermPattern {
    /// Missing terms and variables become wildcards.
    pub fn from_term(term: Option<&Term>) -> Self {
        match term {
            Some(term) if !term.is_variable() => Self::Bound(term.encode()),
            _ => Self::Wildcard,
        }
    }

    pub fn matches(&self, encoded: &str) -> bool {
        match self {
            Self::Bound(expected) => expected == encoded,
            Self::Wildcard => true,
        }
    }
}

/// A subject/predicate/object pattern in encoded form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
}

impl TriplePattern {
    /// The pattern matching every triple.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn from_terms(
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
    ) -> Self {
        Self {
            subject: TermPattern::from_term(subject),
            predicate: TermPattern::from_term(predicate),
            object: TermPattern::from_term(object),
        }
    }

    pub fn matches(&self, triple: &EncodedTriple) -> bool {
        self.subject.matches(&triple.subject)
            && self.predicate.matches(&triple.predicate)
            && self.object.matches(&triple.object)
    }
}

/// Offset/limit window over a result set. `limit == 0` means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Apply the window to an ordered sequence of matches.
    pub fn apply<T>(&self, matches: impl IntoIterator<Item = T>) -> Vec<T> {
        let skipped = matches.into_iter().skip(self.offset);
        if self.limit == 0 {
            skipped.collect()
        } else {
            skipped.take(self.limit).collect()
        }
    }
}

/// One page of query results with the total match count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage<T> {
    pub triples: Vec<T>,
    pub total_count: usize,
    /// `false` when `total_count` is an estimate.
    pub has_exact_count: bool,
}

impl<T> SearchPage<T> {
    pub fn exact(triples: Vec<T>, total_count: usize) -> Self {
        Self {
            triples,
            total_count,
            has_exact_count: true,
        }
    }

    pub fn count(&self) -> Count {
        Count {
            total_count: self.total_count,
            has_exact_count: self.has_exact_count,
        }
    }

    /// Convert every result, keeping the counts.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<SearchPage<U>, E> {
        Ok(SearchPage {
            triples: self.triples.into_iter().map(f).collect::<Result<_, _>>()?,
            total_count: self.total_count,
            has_exact_count: self.has_exact_count,
        })
    }
}

/// Result of a count-only query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count {
    pub total_count: usize,
    pub has_exact_count: bool,
}
