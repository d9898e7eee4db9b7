use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity key for clients and price-book entries: trimmed, case-folded,
/// internal whitespace collapsed to single spaces.
///
/// Matching is exact on the canonical form. "Maria  Garcia " and
/// "maria garcia" share a key; "Maria G." does not — partial matches must
/// never silently merge two different people.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn new(raw: &str) -> Self {
        let folded = raw.trim().to_lowercase();
        Self(folded.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CanonicalKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
