//! Reconciliation engine: compute the create/keep/delete partition between
//! the alarms the configuration requires and the alarms the backend holds,
//! then apply it with bounded batches and a configurable inter-call delay.
//!
//! The engine talks to the alerting backend only through [`AlarmBackend`];
//! the live CloudWatch implementation lives in `alarmsync-aws`, tests use
//! in-memory mocks. Both creation and deletion are idempotent upserts, so an
//! aborted run is remedied by re-running the whole reconciliation.

pub mod apply;
pub mod error;
pub mod reconcile;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use error::EngineError;

/// One page of the backend's alarm inventory.
#[derive(Debug, Clone, Default)]
pub struct AlarmInventoryPage {
    pub alarm_names: Vec<String>,
    /// Continuation token; `None` or empty means the listing is exhausted.
    pub next_token: Option<String>,
}

/// The alerting-backend operations the engine depends on.
///
/// `put_metric_alarm` is an idempotent upsert keyed by alarm name;
/// `delete_alarms` accepts at most [`apply::DELETE_BATCH_SIZE`] names per
/// call and ignores absent ones. Transport-level retries, if any, are the
/// implementation's concern.
#[async_trait]
pub trait AlarmBackend: Send + Sync {
    async fn list_alarms(
        &self,
        name_prefix: &str,
        next_token: Option<&str>,
    ) -> anyhow::Result<AlarmInventoryPage>;

    async fn put_metric_alarm(&self, params: &Map<String, Value>) -> anyhow::Result<()>;

    async fn delete_alarms(&self, alarm_names: &[String]) -> anyhow::Result<()>;
}
