//! Candidate names and their sequence ordering.
//!
//! The coordination service appends a fixed-width, zero-padded sequence
//! number to every sequential create, so lexicographic comparison of the
//! suffix after the last `-` is numeric comparison. Names are parsed once
//! into [`Candidate`] values; ordering itself is total and infallible.

use std::cmp::Ordering;
use std::fmt;

use crate::error::LockError;
use crate::session::SessionId;

/// A parsed candidate entry name, `<prefix>-<sequence>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    name: String,
    // Byte offset of the sequence suffix, one past the last '-'.
    suffix_at: usize,
}

impl Candidate {
    /// Parses a sibling name, rejecting names without a sequence suffix.
    ///
    /// A name with no separator, or with nothing after the last one, cannot
    /// have come from a sequential create and is treated as a fatal
    /// precondition violation.
    pub fn parse(name: &str) -> Result<Self, LockError> {
        let sep = name
            .rfind('-')
            .ok_or_else(|| LockError::MalformedCandidate(name.to_string()))?;
        let suffix_at = sep + 1;
        if suffix_at == name.len() {
            return Err(LockError::MalformedCandidate(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            suffix_at,
        })
    }

    /// The full entry name as assigned by the service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The service-assigned sequence suffix.
    pub fn sequence(&self) -> &str {
        &self.name[self.suffix_at..]
    }

    /// True if this candidate was created under `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.name.starts_with(prefix)
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Sequence first; full name as a deterministic tie-breaker. Equal
        // sequences on distinct names are corruption, detected by the
        // decision engine rather than here.
        self.sequence()
            .cmp(other.sequence())
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Renders the candidate-name prefix for a session: `x-<16-hex-session>-`.
///
/// Two live sessions never share an id, so two live processes never share
/// a prefix.
pub fn session_prefix(session: SessionId) -> String {
    format!("x-{:016x}-", session.as_u64())
}
