use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

const SERVICE: &str = "job-board";
const SLOW_QUERY_MS: u128 = 500;

#[derive(Debug)]
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_database_query(&self, query: &str, duration_ms: u128, result_count: Option<usize>) {
        let log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "database_query",
            "query_hash": format!("{:x}", md5::compute(query)),
            "query_preview": preview(query),
            "duration_ms": duration_ms,
            "result_count": result_count,
            "service": SERVICE
        });

        if duration_ms > SLOW_QUERY_MS {
            warn!("Slow query detected: {}", log_entry);
        } else {
            tracing::debug!("{}", log_entry);
        }
    }

    pub fn log_error(&self, error: &str, context: HashMap<String, serde_json::Value>) {
        let mut log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "error",
            "error_message": error,
            "service": SERVICE
        });

        for (key, value) in context {
            log_entry[key] = value;
        }

        error!("{}", log_entry);
    }

    pub fn log_business_event(
        &self,
        event_name: &str,
        user_id: Option<Uuid>,
        metadata: HashMap<String, serde_json::Value>,
    ) {
        let mut log_entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event_type": "business_event",
            "event_name": event_name,
            "user_id": user_id,
            "service": SERVICE
        });

        for (key, value) in metadata {
            log_entry[key] = value;
        }

        info!("{}", log_entry);
    }
}

fn preview(query: &str) -> String {
    let compact = query.split_whitespace().collect::<Vec<_>>().join(" ");
    match compact.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &compact[..idx]),
        None => compact,
    }
}

/// Builds the metadata map for [`StructuredLogger::log_business_event`].
pub fn event_meta<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> HashMap<String, serde_json::Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

pub static LOGGER: StructuredLogger = StructuredLogger;
