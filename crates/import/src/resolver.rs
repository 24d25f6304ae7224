use kontera_core::DuplicateStrategy;
use std::collections::HashMap;

/// What to do with one incoming record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Persist under a freshly minted identity.
    Insert,
    /// Drop the incoming record, leaving the stored one untouched.
    Skip,
    /// Overwrite all fields of the stored record, reusing its identity.
    Replace { existing_id: String },
}

/// Decides per incoming record against a `vernr → identity` index of the
/// target collection. The index is built once per batch, before any row
/// is processed; `keep` never consults it.
pub struct DuplicateResolver {
    strategy: DuplicateStrategy,
    index: HashMap<String, String>,
}

impl DuplicateResolver {
    pub fn new(strategy: DuplicateStrategy, index: HashMap<String, String>) -> Self {
        DuplicateResolver { strategy, index }
    }

    pub fn resolve(&self, vernr: &str) -> Resolution {
        match self.strategy {
            DuplicateStrategy::Keep => Resolution::Insert,
            DuplicateStrategy::Skip => {
                if self.index.contains_key(vernr) {
                    Resolution::Skip
                } else {
                    Resolution::Insert
                }
            }
            DuplicateStrategy::Replace => match self.index.get(vernr) {
                Some(existing_id) => Resolution::Replace { existing_id: existing_id.clone() },
                None => Resolution::Insert,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> HashMap<String, String> {
        HashMap::from([("V1".to_string(), "id-1".to_string())])
    }

    #[test]
    fn keep_always_inserts() {
        let resolver = DuplicateResolver::new(DuplicateStrategy::Keep, index());
        assert_eq!(resolver.resolve("V1"), Resolution::Insert);
        assert_eq!(resolver.resolve("V2"), Resolution::Insert);
    }

    #[test]
    fn skip_drops_known_keys() {
        let resolver = DuplicateResolver::new(DuplicateStrategy::Skip, index());
        assert_eq!(resolver.resolve("V1"), Resolution::Skip);
        assert_eq!(resolver.resolve("V2"), Resolution::Insert);
    }

    #[test]
    fn replace_reuses_existing_identity() {
        let resolver = DuplicateResolver::new(DuplicateStrategy::Replace, index());
        assert_eq!(
            resolver.resolve("V1"),
            Resolution::Replace { existing_id: "id-1".to_string() }
        );
        assert_eq!(resolver.resolve("V2"), Resolution::Insert);
    }
}
