use serde::{de::DeserializeOwned, Serialize};
use spin_sdk::key_value::Store;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Key-value persistence used by every handler.
///
/// Documents are stored as JSON. Counters and sorted sets are layered on the
/// same byte interface; backends that can do better (the in-memory store)
/// override them to make each update atomic.
pub trait Kv {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set_raw(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.get_raw(key)?.is_some())
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.set_raw(key, &serde_json::to_vec(value)?)
    }

    /// Increments the counter at `key` and returns the new value.
    ///
    /// The default is a read then a write, so concurrent callers can lose an
    /// increment. Implementations with a lock or an atomic primitive override it.
    fn incr(&self, key: &str) -> anyhow::Result<i64> {
        let value = self.get_json::<i64>(key)?.unwrap_or(0) + 1;
        self.set_json(key, &value)?;
        Ok(value)
    }

    /// Adds `by` to the score of `member` in the sorted set at `key`.
    fn zincrby(&self, key: &str, member: &str, by: f64) -> anyhow::Result<f64> {
        let mut set: SortedSet = self.get_json(key)?.unwrap_or_default();
        let score = bump(&mut set, member, by);
        self.set_json(key, &set)?;
        Ok(score)
    }

    /// Members of the sorted set at `key`, highest score first.
    fn zrevrange(&self, key: &str, limit: usize) -> anyhow::Result<Vec<String>> {
        let set: SortedSet = self.get_json(key)?.unwrap_or_default();
        Ok(ranked(&set, limit))
    }
}

type SortedSet = BTreeMap<String, f64>;

fn bump(set: &mut SortedSet, member: &str, by: f64) -> f64 {
    let score = set.entry(member.to_string()).or_insert(0.0);
    *score += by;
    *score
}

/// Score descending, ties broken by reverse member order.
fn ranked(set: &SortedSet, limit: usize) -> Vec<String> {
    let mut members: Vec<(&String, &f64)> = set.iter().collect();
    members.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| b.0.cmp(a.0)));
    members
        .into_iter()
        .take(limit)
        .map(|(member, _)| member.clone())
        .collect()
}

impl Kv for Store {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.get(key)?)
    }

    fn set_raw(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Ok(self.set(key, value)?)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(Store::delete(self, key)?)
    }

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(Store::exists(self, key)?)
    }
}

/// Process-local store for the native host and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl Kv for MemoryStore {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn incr(&self, key: &str) -> anyhow::Result<i64> {
        let mut entries = self.lock()?;
        let current = match entries.get(key) {
            Some(bytes) => serde_json::from_slice::<i64>(bytes)?,
            None => 0,
        };
        let value = current + 1;
        entries.insert(key.to_string(), serde_json::to_vec(&value)?);
        Ok(value)
    }

    fn zincrby(&self, key: &str, member: &str, by: f64) -> anyhow::Result<f64> {
        let mut entries = self.lock()?;
        let mut set: SortedSet = match entries.get(key) {
            Some(bytes) => serde_json::from_slice(bytes)?,
            None => SortedSet::new(),
        };
        let score = bump(&mut set, member, by);
        entries.insert(key.to_string(), serde_json::to_vec(&set)?);
        Ok(score)
    }
}
