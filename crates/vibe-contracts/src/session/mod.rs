mod summary;

pub use summary::{now_utc_iso, write_summary, SessionSummary};

/// `session-<unix millis>-<7 random chars>`.
pub fn generate_session_id() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "session-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &random[..7]
    )
}
