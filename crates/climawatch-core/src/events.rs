//! Push-notification payloads.
//!
//! Three event families arrive on the push channel. Metric updates carry an
//! authoritative value for one region/kind, weather updates carry a full
//! reading for every metric of a region, and record changes announce CRUD
//! activity on stored records and only matter to the UI.

use serde::{Deserialize, Serialize};

use crate::feed::Reading;
use crate::kind::MetricKind;

/// Authoritative value pushed for one region and kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricUpdate {
    pub region: String,
    pub kind: MetricKind,
    /// `None` when the payload omitted the value; rejected by validation.
    #[serde(default)]
    pub value: Option<f64>,
    /// Observation time at the source. Without it the arrival time at the
    /// metric task is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordAction {
    Create,
    Update,
    Delete,
}

/// Anything delivered by the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PushEvent {
    MetricUpdate(MetricUpdate),
    /// Full reading for one region, fanned out to every metric it has a
    /// value for.
    WeatherUpdate {
        region: String,
        reading: Reading,
    },
    #[serde(alias = "database_update")]
    RecordChange {
        record_type: String,
        action: RecordAction,
        #[serde(default)]
        data: serde_json::Value,
    },
}
