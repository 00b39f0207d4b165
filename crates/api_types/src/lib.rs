use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub mod history {
    use super::*;

    /// A single calculation pushed by a device.
    ///
    /// Wire field names are camelCase, matching what the web client stores
    /// locally and sends.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryPush {
        pub expression: String,
        pub actual_result: f64,
        pub forced_result: Option<f64>,
        pub was_forced: bool,
        pub operation_type: String,
        pub device_id: Option<String>,
    }

    /// A stored calculation as returned by the server.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryView {
        /// Server-assigned identifier.
        pub id: i32,
        pub expression: String,
        pub actual_result: f64,
        pub forced_result: Option<f64>,
        pub result: f64,
        pub was_forced: bool,
        pub operation_type: String,
        pub device_id: Option<String>,
        /// RFC3339 timestamp, including timezone offset.
        pub created_at: DateTime<FixedOffset>,
    }

    /// Query parameters for listing history.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryListQuery {
        pub forced_only: Option<bool>,
        /// 1-based page index.
        pub page: Option<u64>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Pagination {
        pub page: u64,
        pub limit: u64,
        pub total: u64,
        pub pages: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryListResponse {
        pub history: Vec<HistoryView>,
        pub pagination: Pagination,
    }

    /// Query parameters for bulk deletion; scoping to a device is optional.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryDeleteQuery {
        pub device_id: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryCreated {
        pub id: i32,
    }

    /// Batch upsert of locally accumulated calculations.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SyncRequest {
        pub calculations: Vec<HistoryPush>,
    }

    /// Best-effort per item: `stored` may be lower than `received` when
    /// individual records were rejected, and the call still succeeds.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SyncResponse {
        pub received: usize,
        pub stored: usize,
    }
}

pub mod stats {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct OperationCount {
        pub operation_type: String,
        pub count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CalculatorStats {
        pub total: u64,
        pub forced: u64,
        pub by_operation: Vec<OperationCount>,
    }
}

pub mod user {
    use super::*;

    /// Partial update of the forcing preferences.
    ///
    /// Absent field: leave untouched. Explicit `null`: clear the field.
    /// The double `Option` keeps the two distinguishable through serde.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ForcedNumberUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub forced_number: Option<Option<f64>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub second_force_number: Option<Option<f64>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub second_force_trigger_number: Option<Option<f64>>,
    }

    /// The authenticated user's profile, forcing fields included.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Profile {
        pub username: String,
        pub forced_number: Option<f64>,
        pub second_force_number: Option<f64>,
        pub second_force_trigger_number: Option<f64>,
    }
}

#[cfg(test)]
mod tests {
    use super::user::ForcedNumberUpdate;

    #[test]
    fn absent_and_null_fields_stay_distinguishable() {
        let update: ForcedNumberUpdate =
            serde_json::from_str(r#"{"forcedNumber": 42, "secondForceNumber": null}"#).unwrap();

        assert_eq!(update.forced_number, Some(Some(42.0)));
        assert_eq!(update.second_force_number, Some(None));
        assert_eq!(update.second_force_trigger_number, None);
    }

    #[test]
    fn untouched_fields_are_not_serialized() {
        let update = ForcedNumberUpdate {
            forced_number: Some(Some(7.0)),
            ..Default::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"forcedNumber":7.0}"#);
    }
}
