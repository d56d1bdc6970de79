pub mod adaptation;
pub mod metrics;
pub mod questions;
pub mod responses;
pub mod sessions;
pub mod students;

use chrono::{SecondsFormat, Utc};

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
