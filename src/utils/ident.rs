use chrono::Utc;

/// Entity id unique within the process lifetime: millisecond timestamp plus
/// a random suffix. Single-user scope; not cryptographically unique.
pub fn new_entity_id() -> String {
    format!(
        "{}-{:04x}",
        Utc::now().timestamp_millis(),
        rand::random::<u16>()
    )
}
