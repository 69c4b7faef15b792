use serde::Serialize;

/// Emit a platform event as one structured log line for downstream
/// collection.
pub fn emit<E: Serialize>(kind: &str, event: &E) {
    match serde_json::to_string(event) {
        Ok(payload) => tracing::info!(target: "kahva::telemetry", kind, %payload),
        Err(e) => tracing::warn!(target: "kahva::telemetry", kind, error = %e, "failed to serialize event"),
    }
}
