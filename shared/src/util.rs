use chrono::{DateTime, Utc};

/// 当前 UTC 时间
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Generate an opaque record id (UUID v4, hyphenated).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
