//! Append-only activity log with SHA-256 hash chaining.
//!
//! Every mutating user-lifecycle operation appends one entry. Entries are
//! never edited; the chain lets `verify_chain` detect any that were.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use civic_core::types::ActivityLogEntry;

const GENESIS: &str = "genesis";

struct LogState {
    entries: Vec<ActivityLogEntry>,
    last_hash: String,
}

/// Append-only, hash-chained activity log. Safe under concurrent writers.
pub struct ActivityLog {
    state: RwLock<LogState>,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LogState {
                entries: Vec::new(),
                last_hash: GENESIS.to_string(),
            }),
        }
    }

    /// Assign the next sequence number and timestamp, chain the entry to its
    /// predecessor and append it. Timestamps are non-decreasing in sequence
    /// order.
    pub fn append(&self, mut entry: ActivityLogEntry) -> ActivityLogEntry {
        let mut state = self.state.write();
        entry.timestamp = Utc::now();
        entry.sequence = state.entries.len() as u64 + 1;
        entry.previous_hash = state.last_hash.clone();
        entry.event_hash = entry_hash(&entry);
        state.last_hash = entry.event_hash.clone();
        state.entries.push(entry.clone());

        info!(
            entry_id = %entry.id,
            sequence = entry.sequence,
            actor = %entry.actor,
            subject = %entry.subject,
            action = %entry.action,
            "Activity logged"
        );
        entry
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// All entries in append order, for audit replay.
    pub fn entries(&self) -> Vec<ActivityLogEntry> {
        self.state.read().entries.clone()
    }

    /// Newest first, at most `limit` entries.
    pub fn recent(&self, limit: usize) -> Vec<ActivityLogEntry> {
        self.state
            .read()
            .entries
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Entries performed by `actor`, in append order.
    pub fn for_actor(&self, actor: Uuid) -> Vec<ActivityLogEntry> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|e| e.actor == actor)
            .cloned()
            .collect()
    }

    /// Entries applied to `subject`, in append order.
    pub fn for_subject(&self, subject: Uuid) -> Vec<ActivityLogEntry> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|e| e.subject == subject)
            .cloned()
            .collect()
    }

    /// Walk the chain and report entries whose link or hash does not match.
    pub fn verify_chain(&self) -> ChainVerification {
        verify_entries(&self.state.read().entries)
    }
}

/// Result of walking the hash chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainVerification {
    pub total: usize,
    pub valid: usize,
    pub broken_sequences: Vec<u64>,
    pub intact: bool,
}

/// Verify a sequence of entries as read back from any store.
pub fn verify_entries(entries: &[ActivityLogEntry]) -> ChainVerification {
    let mut expected_prev = GENESIS.to_string();
    let mut broken = Vec::new();

    for entry in entries {
        if entry.previous_hash != expected_prev || entry.event_hash != entry_hash(entry) {
            broken.push(entry.sequence);
        }
        expected_prev = entry.event_hash.clone();
    }

    ChainVerification {
        total: entries.len(),
        valid: entries.len() - broken.len(),
        intact: broken.is_empty(),
        broken_sequences: broken,
    }
}

fn entry_hash(entry: &ActivityLogEntry) -> String {
    let content = format!(
        "{}:{}:{}:{}:{}:{}:{}:{}",
        entry.sequence,
        entry.id,
        entry.actor,
        entry.subject,
        entry.action,
        entry.detail,
        entry.timestamp.to_rfc3339(),
        entry.previous_hash,
    );
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_core::types::ActivityAction;
    use std::sync::Arc;
    use std::thread;

    fn entry(actor: Uuid, subject: Uuid, action: ActivityAction) -> ActivityLogEntry {
        ActivityLogEntry::new(actor, subject, action, format!("{action} test"))
    }

    #[test]
    fn test_append_assigns_sequence_and_chain() {
        let log = ActivityLog::new();
        let actor = Uuid::new_v4();
        let first = log.append(entry(actor, Uuid::new_v4(), ActivityAction::UserCreated));
        let second = log.append(entry(actor, Uuid::new_v4(), ActivityAction::UserCreated));

        assert_eq!(first.sequence, 1);
        assert_eq!(first.previous_hash, GENESIS);
        assert_eq!(second.sequence, 2);
        assert_eq!(second.previous_hash, first.event_hash);
        assert!(log.verify_chain().intact);
    }

    #[test]
    fn test_recent_is_reverse_chronological() {
        let log = ActivityLog::new();
        let actor = Uuid::new_v4();
        for _ in 0..5 {
            log.append(entry(actor, Uuid::new_v4(), ActivityAction::PasswordReset));
        }
        let recent = log.recent(3);
        let seqs: Vec<u64> = recent.iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![5, 4, 3]);

        let all = log.entries();
        assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_filters() {
        let log = ActivityLog::new();
        let admin = Uuid::new_v4();
        let other = Uuid::new_v4();
        let target = Uuid::new_v4();
        log.append(entry(admin, target, ActivityAction::UserCreated));
        log.append(entry(other, Uuid::new_v4(), ActivityAction::UserCreated));
        log.append(entry(admin, target, ActivityAction::UserDeactivated));

        assert_eq!(log.for_actor(admin).len(), 2);
        assert_eq!(log.for_subject(target).len(), 2);
        assert_eq!(log.for_actor(Uuid::new_v4()).len(), 0);
    }

    #[test]
    fn test_tampering_detected() {
        let log = ActivityLog::new();
        let actor = Uuid::new_v4();
        for _ in 0..3 {
            log.append(entry(actor, actor, ActivityAction::UserActivated));
        }
        let mut entries = log.entries();
        entries[1].detail = "rewritten".into();

        let report = verify_entries(&entries);
        assert!(!report.intact);
        assert_eq!(report.broken_sequences, vec![2]);
        assert_eq!(report.valid, 2);
    }

    #[test]
    fn test_concurrent_appends_keep_chain_intact() {
        let log = Arc::new(ActivityLog::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    let actor = Uuid::new_v4();
                    for _ in 0..25 {
                        log.append(entry(actor, actor, ActivityAction::UserActivated));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(log.len(), 200);
        let report = log.verify_chain();
        assert!(report.intact);
        assert_eq!(report.total, 200);
    }
}
