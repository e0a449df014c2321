use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::db::repositories::slot_repository::SlotRepository;
use crate::db::DbPool;

pub const TASKS_SLOT: &str = "pro_gro_tasks";
pub const CONCEPTS_SLOT: &str = "pro_gro_concepts";
pub const HABITS_SLOT: &str = "pro_gro_habits";

/// Durable key-value binding between in-memory collections and named slots.
/// Single-writer, single-process, synchronous.
#[derive(Clone)]
pub struct StateStore {
    db: DbPool,
}

impl StateStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Read the value stored under `key`. An absent slot, a read failure, or
    /// a value that no longer deserializes all fall back to `fallback`; this
    /// never raises to the caller.
    pub fn read<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let stored = match self
            .db
            .with_connection(|conn| SlotRepository::get(conn, key))
        {
            Ok(row) => row,
            Err(err) => {
                warn!(target: "app::store", key, error = %err, "slot read failed, using fallback");
                return fallback;
            }
        };

        match stored {
            Some(row) => match serde_json::from_str(&row.value) {
                Ok(value) => value,
                Err(err) => {
                    warn!(target: "app::store", key, error = %err, "stored value corrupt, using fallback");
                    fallback
                }
            },
            None => {
                debug!(target: "app::store", key, "slot empty, using fallback");
                fallback
            }
        }
    }

    /// Persist `value` under `key`. Best-effort: a failed write is logged and
    /// swallowed so the caller's in-memory state stays authoritative for the
    /// rest of the session.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) {
        let serialized = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(err) => {
                error!(target: "app::store", key, error = %err, "slot serialization failed");
                return;
            }
        };

        if let Err(err) = self
            .db
            .with_connection(|conn| SlotRepository::upsert(conn, key, &serialized))
        {
            error!(target: "app::store", key, error = %err, "slot write failed, in-memory state kept");
        }
    }
}
