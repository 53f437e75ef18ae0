//! Completion predicates for outstanding requests

use std::collections::HashSet;

use super::{Record, RecordKind};

/// A set of acceptable `(kind, message)` signatures.
///
/// A batch of records satisfies the wait spec as soon as any one record matches
/// any one signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    signatures: HashSet<(RecordKind, String)>,
}

impl WaitSpec {
    /// Build a wait spec from `(kind, message)` pairs
    pub fn new<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = (RecordKind, S)>,
        S: Into<String>,
    {
        Self {
            signatures: signatures.into_iter().map(|(k, m)| (k, m.into())).collect(),
        }
    }

    /// The session became ready: the replay stopped at its first event
    pub fn ready() -> Self {
        Self::new([(RecordKind::Notify, "stopped")])
    }

    /// A command fully settled: either its synchronous acknowledgment or an
    /// asynchronous stop, whichever comes first
    pub fn settled() -> Self {
        Self::new([(RecordKind::Result, "done"), (RecordKind::Notify, "stopped")])
    }

    /// Add another acceptable signature
    pub fn with(mut self, kind: RecordKind, message: impl Into<String>) -> Self {
        self.signatures.insert((kind, message.into()));
        self
    }

    /// Check a single record against the wait spec
    pub fn matches(&self, record: &Record) -> bool {
        match &record.message {
            Some(message) => self.signatures.contains(&(record.kind, message.clone())),
            None => false,
        }
    }

    /// Index of the first record in `records` that satisfies the wait spec
    pub fn first_match(&self, records: &[Record]) -> Option<usize> {
        records.iter().position(|r| self.matches(r))
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(line: &str) -> Record {
        Record::decode(line).unwrap()
    }

    #[test]
    fn test_ready_matches_only_stopped() {
        let spec = WaitSpec::ready();
        assert!(spec.matches(&rec("*stopped,reason=\"exited-normally\"")));
        assert!(!spec.matches(&rec("^done")));
        assert!(!spec.matches(&rec("*running,thread-id=\"all\"")));
    }

    #[test]
    fn test_settled_matches_done_or_stopped() {
        let spec = WaitSpec::settled();
        assert_eq!(spec.len(), 2);
        assert!(spec.matches(&rec("^done")));
        assert!(spec.matches(&rec("*stopped")));
        assert!(!spec.matches(&rec("^running")));
        assert!(!spec.matches(&rec("^error,msg=\"boom\"")));
    }

    #[test]
    fn test_kind_must_match_too() {
        // `=stopped` would be a notify with message "stopped"; a stream never matches
        let spec = WaitSpec::settled();
        assert!(!spec.matches(&rec("~\"done\"")));
        assert!(!spec.matches(&rec("done")));
    }

    #[test]
    fn test_with_extends() {
        let spec = WaitSpec::settled().with(RecordKind::Result, "error");
        assert!(spec.matches(&rec("^error,msg=\"boom\"")));
        assert_eq!(spec.len(), 3);
    }

    #[test]
    fn test_first_match() {
        let records = vec![rec("~\"a\""), rec("^running"), rec("*stopped"), rec("^done")];
        assert_eq!(WaitSpec::settled().first_match(&records), Some(2));
        assert_eq!(WaitSpec::new([(RecordKind::Result, "exit")]).first_match(&records), None);
    }

    #[test]
    fn test_empty_spec_never_matches() {
        let spec = WaitSpec::new(Vec::<(RecordKind, String)>::new());
        assert!(spec.is_empty());
        assert!(!spec.matches(&rec("^done")));
    }
}
