pub mod application;
pub mod job;
pub mod user;

use serde::Serialize;
use uuid::Uuid;

/// A reference to another record: the bare id, or the record's fields when
/// the handler populated it.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Id(Uuid),
    Populated(T),
}
