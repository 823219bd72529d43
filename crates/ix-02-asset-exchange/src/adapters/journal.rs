//! In-Memory Transition Journal

use crate::domain::TransitionRecord;
use crate::ports::TransitionJournal;
use parking_lot::RwLock;
use shared_types::SessionId;

/// Append-only journal held in memory.
#[derive(Debug, Default)]
pub struct InMemoryJournal {
    records: RwLock<Vec<TransitionRecord>>,
}

impl InMemoryJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether nothing was journaled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransitionJournal for InMemoryJournal {
    fn append(&self, record: TransitionRecord) -> Result<u64, String> {
        let mut records = self.records.write();
        records.push(record);
        Ok(records.len() as u64)
    }

    fn history(&self, session_id: &SessionId) -> Vec<TransitionRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| &r.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::SessionState;

    fn record(session: &str, to: SessionState) -> TransitionRecord {
        TransitionRecord {
            session_id: SessionId::new(session),
            from: SessionState::Initiated,
            to,
            at: 0,
            reason: None,
        }
    }

    #[test]
    fn test_append_order_and_filter() {
        let journal = InMemoryJournal::new();
        assert_eq!(journal.append(record("a", SessionState::LockRequested)), Ok(1));
        assert_eq!(journal.append(record("b", SessionState::LockRequested)), Ok(2));
        assert_eq!(journal.append(record("a", SessionState::Failed)), Ok(3));

        let history = journal.history(&SessionId::new("a"));
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].to, SessionState::Failed);
        assert_eq!(journal.len(), 3);
    }
}
