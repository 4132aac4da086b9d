use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

pub const SILT_ACTIONS_TOTAL: &str = "silt_actions_total";
pub const SILT_BULK_ITEM_FAILURES_TOTAL: &str = "silt_bulk_item_failures_total";
pub const SILT_BULK_SEND_DURATION_MILLISECONDS: &str = "silt_bulk_send_duration_milliseconds";
pub const SILT_BULK_BATCH_SIZE: &str = "silt_bulk_batch_size";
pub const SILT_ROWS_DUMPED_TOTAL: &str = "silt_rows_dumped_total";
pub const SILT_POSITION_SAVES_TOTAL: &str = "silt_position_saves_total";

/// Label key for the action kind ("index", "update" or "delete").
pub const ACTION_KIND_LABEL: &str = "action";
/// Label key for the target index.
pub const INDEX_LABEL: &str = "index";

/// Register metrics emitted by silt. This should be called before starting a
/// pipeline. It is safe to call this method multiple times; the metrics are
/// guaranteed to be registered only once.
pub(crate) fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            SILT_ACTIONS_TOTAL,
            Unit::Count,
            "Total number of actions accepted by the bulker, by action kind"
        );

        describe_counter!(
            SILT_BULK_ITEM_FAILURES_TOTAL,
            Unit::Count,
            "Total number of per-item failures reported in bulk responses"
        );

        describe_histogram!(
            SILT_BULK_SEND_DURATION_MILLISECONDS,
            Unit::Milliseconds,
            "Time taken in milliseconds to submit one bulk request"
        );

        describe_gauge!(
            SILT_BULK_BATCH_SIZE,
            Unit::Count,
            "Number of actions in the last submitted bulk request"
        );

        describe_counter!(
            SILT_ROWS_DUMPED_TOTAL,
            Unit::Count,
            "Total number of rows parsed out of the initial dump"
        );

        describe_counter!(
            SILT_POSITION_SAVES_TOTAL,
            Unit::Count,
            "Total number of binlog position saves"
        );
    });
}
