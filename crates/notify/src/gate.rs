//! Send-vs-suppress decision against the last delivered fingerprint.

use crate::fingerprint::content_hash;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use factor_pulse_core::config::DedupConfig;
use factor_pulse_core::NotificationSink;
use factor_pulse_data::{GateTransaction, StoreError, SummaryRecord, SummaryRepository};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Digest delivered; last-sent hash advanced.
    Sent,
    /// Fingerprint matched the last delivered digest; nothing sent.
    Suppressed,
    /// Delivery failed; recorded, hash not advanced, so the next cycle
    /// retries a materially identical digest.
    SendFailed,
}

/// One locked view of the dedup state, held across decide-send-record.
#[async_trait]
pub trait GateState: Send {
    /// Fingerprint of the most recently delivered digest.
    fn last_sent_hash(&self) -> Option<&str>;

    /// Writes the cycle's summary row, advances the last-sent fingerprint
    /// only when asked, and releases the lock.
    async fn finish(self, record: &SummaryRecord, advance_hash: bool) -> Result<(), StoreError>;
}

/// Where the gate keeps its single-writer state.
#[async_trait]
pub trait GateStore: Send + Sync {
    type State: GateState;

    /// Opens and locks the state for one evaluation.
    async fn begin(&self) -> Result<Self::State, StoreError>;
}

#[async_trait]
impl GateStore for SummaryRepository {
    type State = GateTransaction<'static>;

    async fn begin(&self) -> Result<Self::State, StoreError> {
        self.begin_gate().await
    }
}

#[async_trait]
impl GateState for GateTransaction<'static> {
    fn last_sent_hash(&self) -> Option<&str> {
        GateTransaction::last_sent_hash(self)
    }

    async fn finish(self, record: &SummaryRecord, advance_hash: bool) -> Result<(), StoreError> {
        GateTransaction::finish(self, record, advance_hash).await
    }
}

pub struct DedupGate<S = SummaryRepository> {
    repo: S,
    config: DedupConfig,
}

impl<S: GateStore> DedupGate<S> {
    #[must_use]
    pub fn new(repo: S, config: DedupConfig) -> Self {
        Self { repo, config }
    }

    /// Runs one gate evaluation for a rendered digest.
    ///
    /// The dedup state is locked for the whole decide-send-record sequence,
    /// so two overlapping cycles cannot both read "new" and double-send.
    /// Exactly one SummaryRecord is written per call.
    ///
    /// # Errors
    /// Returns an error only on storage failure; a delivery failure is a
    /// recorded outcome, not an error.
    pub async fn evaluate(
        &self,
        digest_text: &str,
        timestamp: DateTime<Utc>,
        sink: &dyn NotificationSink,
    ) -> Result<GateOutcome, StoreError> {
        let hash = content_hash(digest_text, &self.config);
        let gate = self.repo.begin().await?;

        let record = |sent: bool| SummaryRecord {
            id: None,
            timestamp,
            content_hash: hash.clone(),
            full_text: digest_text.to_string(),
            sent,
        };

        if gate.last_sent_hash() == Some(hash.as_str()) {
            info!(%hash, "Digest unchanged since last send, suppressing");
            gate.finish(&record(false), false).await?;
            return Ok(GateOutcome::Suppressed);
        }

        match sink.send(digest_text).await {
            Ok(()) => {
                info!(%hash, "Digest sent");
                gate.finish(&record(true), true).await?;
                Ok(GateOutcome::Sent)
            }
            Err(e) => {
                warn!(%hash, error = %e, "Digest delivery failed, hash not advanced");
                gate.finish(&record(false), false).await?;
                Ok(GateOutcome::SendFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use factor_pulse_core::SinkError;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryState {
        last_sent_hash: Option<String>,
        records: Vec<SummaryRecord>,
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        state: Arc<Mutex<MemoryState>>,
    }

    struct MemoryLease {
        store: Arc<Mutex<MemoryState>>,
        hash_at_open: Option<String>,
    }

    #[async_trait]
    impl GateStore for MemoryStore {
        type State = MemoryLease;

        async fn begin(&self) -> Result<MemoryLease, StoreError> {
            let hash_at_open = self.state.lock().unwrap().last_sent_hash.clone();
            Ok(MemoryLease {
                store: Arc::clone(&self.state),
                hash_at_open,
            })
        }
    }

    #[async_trait]
    impl GateState for MemoryLease {
        fn last_sent_hash(&self) -> Option<&str> {
            self.hash_at_open.as_deref()
        }

        async fn finish(
            self,
            record: &SummaryRecord,
            advance_hash: bool,
        ) -> Result<(), StoreError> {
            let mut state = self.store.lock().unwrap();
            state.records.push(record.clone());
            if advance_hash {
                state.last_sent_hash = Some(record.content_hash.clone());
            }
            Ok(())
        }
    }

    struct OkSink;
    struct FailingSink;

    #[async_trait]
    impl NotificationSink for OkSink {
        async fn send(&self, _text: &str) -> Result<(), SinkError> {
            Ok(())
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn send(&self, _text: &str) -> Result<(), SinkError> {
            Err(SinkError::Delivery("telegram 502".to_string()))
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    fn digest(symbol: &str) -> String {
        format!(
            "\u{1F4CA} Crypto Factor Pulse\nAs of 2025-06-01 12:00 UTC\n\n\
             Market State: Neutral\nBullish: 50.0% | Bearish: 50.0%\n\n\
             \u{1F680} Top Outliers\n1. {symbol}  score +0.42  24h +5.0%\n"
        )
    }

    fn gate(store: MemoryStore) -> DedupGate<MemoryStore> {
        DedupGate::new(store, DedupConfig::default())
    }

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_first_cycle_sends_and_advances_hash() {
        let store = MemoryStore::default();
        let outcome = gate(store.clone())
            .evaluate(&digest("AAAUSDT"), ts(), &OkSink)
            .await
            .unwrap();
        assert_eq!(outcome, GateOutcome::Sent);
        let state = store.state.lock().unwrap();
        assert_eq!(state.records.len(), 1);
        assert!(state.records[0].sent);
        assert_eq!(
            state.last_sent_hash,
            Some(state.records[0].content_hash.clone())
        );
    }

    #[tokio::test]
    async fn test_identical_second_cycle_is_suppressed() {
        let store = MemoryStore::default();
        let gate = gate(store.clone());
        let text = digest("AAAUSDT");
        assert_eq!(
            gate.evaluate(&text, ts(), &OkSink).await.unwrap(),
            GateOutcome::Sent
        );
        assert_eq!(
            gate.evaluate(&text, ts(), &OkSink).await.unwrap(),
            GateOutcome::Suppressed
        );
        let state = store.state.lock().unwrap();
        // Exactly one summary row per cycle, the suppressed one not sent.
        assert_eq!(state.records.len(), 2);
        assert!(!state.records[1].sent);
    }

    #[tokio::test]
    async fn test_changed_digest_sends_again() {
        let store = MemoryStore::default();
        let gate = gate(store.clone());
        gate.evaluate(&digest("AAAUSDT"), ts(), &OkSink)
            .await
            .unwrap();
        let outcome = gate
            .evaluate(&digest("BBBUSDT"), ts(), &OkSink)
            .await
            .unwrap();
        assert_eq!(outcome, GateOutcome::Sent);
    }

    #[tokio::test]
    async fn test_send_failure_does_not_advance_hash() {
        let store = MemoryStore::default();
        let gate = gate(store.clone());
        let text = digest("AAAUSDT");
        assert_eq!(
            gate.evaluate(&text, ts(), &FailingSink).await.unwrap(),
            GateOutcome::SendFailed
        );
        assert!(store.state.lock().unwrap().last_sent_hash.is_none());
        // The failed digest still counts as unseen next cycle.
        assert_eq!(
            gate.evaluate(&text, ts(), &OkSink).await.unwrap(),
            GateOutcome::Sent
        );
    }
}
