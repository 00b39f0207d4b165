use api_types::{
    history::{HistoryListQuery, HistoryPush, SyncRequest},
    stats::CalculatorStats,
    user::ForcedNumberUpdate,
};
use engine::{ForcingRule, HISTORY_CAP, HistoryEntry, HistoryLog, OperationType};

use crate::{
    client::{Client, ClientError},
    error::Result,
    local_store::LocalStore,
};

#[derive(Debug, Clone)]
pub struct Remote {
    pub client: Client,
    pub token: String,
}

/// Keeps the on-disk history log and the backend in agreement.
///
/// The device is the source of truth for unsynced entries; the backend is
/// the source of truth for everything already pushed. Network failures are
/// logged and swallowed so the calculator keeps working offline.
pub struct Synchronizer {
    store: LocalStore,
    log: HistoryLog,
    device_id: String,
    remote: Option<Remote>,
}

impl Synchronizer {
    pub fn open(store: LocalStore, remote: Option<Remote>) -> Result<Self> {
        let log = store.load_history()?;
        let device_id = store.device_id()?;
        Ok(Self {
            store,
            log,
            device_id,
            remote,
        })
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        self.log.entries()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Records a finished calculation locally. The network is not touched;
    /// the entry stays marked unsynced until the next sync pass.
    pub fn append(&mut self, entry: HistoryEntry) -> Result<()> {
        self.log.append(entry);
        self.store.save_history(&self.log)
    }

    /// One full sync pass: push unsynced entries, then pull and merge the
    /// remote view. A pass holds the synchronizer exclusively, so two
    /// passes can never overlap and double-submit.
    pub async fn sync(&mut self) -> Result<()> {
        if self.remote.is_none() {
            return Ok(());
        }

        if let Err(err) = self.push_unsynced().await {
            tracing::warn!("history push failed: {err}");
            return Ok(());
        }
        if let Err(err) = self.pull_and_merge().await {
            tracing::warn!("history pull failed: {err}");
        }
        self.store.save_history(&self.log)
    }

    async fn push_unsynced(&mut self) -> std::result::Result<(), ClientError> {
        let Some(remote) = &self.remote else {
            return Ok(());
        };

        let unsynced = self.log.unsynced();
        if unsynced.is_empty() {
            return Ok(());
        }

        let calculations = unsynced
            .into_iter()
            .map(|entry| push_from_entry(entry, &self.device_id))
            .collect();
        let response = remote
            .client
            .sync_batch(&remote.token, &SyncRequest { calculations })
            .await?;
        tracing::info!(
            "pushed {} history entries, server stored {}",
            response.received,
            response.stored
        );

        self.log.mark_all_synced();
        Ok(())
    }

    async fn pull_and_merge(&mut self) -> std::result::Result<(), ClientError> {
        let Some(remote) = &self.remote else {
            return Ok(());
        };

        let query = HistoryListQuery {
            limit: Some(HISTORY_CAP as u64),
            ..Default::default()
        };
        let response = remote.client.history_list(&remote.token, &query).await?;

        let mut entries = Vec::with_capacity(response.history.len());
        for view in response.history {
            let Ok(operation_type) = OperationType::try_from(view.operation_type.as_str()) else {
                tracing::warn!("skipping remote entry with unknown operation type");
                continue;
            };
            entries.push(HistoryEntry {
                id: i64::from(view.id),
                expression: view.expression,
                actual_result: view.actual_result,
                forced_result: view.forced_result,
                result: view.result,
                forced: view.was_forced,
                operation_type,
                timestamp: view.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                synced: true,
            });
        }

        self.log.merge_remote(entries);
        Ok(())
    }

    /// Server-side aggregate counts, `None` offline or on failure.
    pub async fn remote_stats(&self) -> Option<CalculatorStats> {
        let remote = self.remote.as_ref()?;
        match remote.client.stats(&remote.token).await {
            Ok(stats) => Some(stats),
            Err(err) => {
                tracing::warn!("stats fetch failed: {err}");
                None
            }
        }
    }

    /// Mirrors a new forcing rule to the backend profile, overwriting all
    /// three fields. Failures are logged; the local rule already took effect.
    pub async fn push_rule(&self, rule: &ForcingRule) {
        let Some(remote) = &self.remote else {
            return;
        };
        let payload = ForcedNumberUpdate {
            forced_number: Some(rule.forced_number),
            second_force_number: Some(rule.second_force_number),
            second_force_trigger_number: Some(rule.second_force_trigger_number),
        };
        if let Err(err) = remote
            .client
            .update_forced_number(&remote.token, &payload)
            .await
        {
            tracing::warn!("forcing rule push failed: {err}");
        }
    }

    /// Clears local history and, when a remote is configured, this device's
    /// share of the server-side history. An already-empty log skips the
    /// remote call entirely.
    pub async fn clear(&mut self) -> Result<()> {
        if self.log.is_empty() {
            return Ok(());
        }

        self.log.clear();
        self.store.save_history(&self.log)?;

        if let Some(remote) = &self.remote
            && let Err(err) = remote
                .client
                .history_delete(&remote.token, Some(&self.device_id))
                .await
        {
            tracing::warn!("remote history delete failed: {err}");
        }
        Ok(())
    }
}

fn push_from_entry(entry: &HistoryEntry, device_id: &str) -> HistoryPush {
    HistoryPush {
        expression: entry.expression.clone(),
        actual_result: entry.actual_result,
        forced_result: entry.forced_result,
        was_forced: entry.forced,
        operation_type: entry.operation_type.as_str().to_string(),
        device_id: Some(device_id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::ForcingOutcome;
    use uuid::Uuid;

    fn temp_store() -> LocalStore {
        let dir = std::env::temp_dir().join(format!("prestidigit-sync-test-{}", Uuid::new_v4()));
        LocalStore::new(dir)
    }

    fn entry(expression: &str) -> HistoryEntry {
        HistoryEntry::from_calculation(
            expression.to_string(),
            8.0,
            ForcingOutcome::unforced(8.0),
            OperationType::Addition,
        )
    }

    #[tokio::test]
    async fn offline_synchronizer_persists_appends() {
        let store = temp_store();
        let mut sync = Synchronizer::open(store.clone(), None).unwrap();

        sync.append(entry("5 + 3")).unwrap();
        sync.sync().await.unwrap();

        let reopened = Synchronizer::open(store, None).unwrap();
        assert_eq!(reopened.entries().len(), 1);
        assert!(!reopened.entries()[0].synced);
    }

    #[tokio::test]
    async fn clearing_an_empty_log_is_a_no_op() {
        let store = temp_store();
        let mut sync = Synchronizer::open(store, None).unwrap();
        sync.clear().await.unwrap();
        assert!(sync.entries().is_empty());
    }

    #[test]
    fn push_payload_carries_the_device_id() {
        let push = push_from_entry(&entry("5 + 3"), "device-1");
        assert_eq!(push.expression, "5 + 3");
        assert!(!push.was_forced);
        assert_eq!(push.device_id.as_deref(), Some("device-1"));
    }
}
