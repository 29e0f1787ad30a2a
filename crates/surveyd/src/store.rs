//! Durable storage for accepted survey answers.

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use uuid::Uuid;

use survey_common::constants::redis_keys::SURVEY_PREFIX;
use survey_common::{SurveyError, SurveyRecord};

/// Capability to persist a validated survey answer.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Mint a fresh key and write the record under it.
    ///
    /// A single unconditional put; the 128-bit random key space makes
    /// collision checks unnecessary. Returns the minted key.
    async fn put(&self, record: &SurveyRecord) -> Result<Uuid, SurveyError>;

    /// Is the underlying store reachable?
    async fn ping(&self) -> bool;
}

/// Redis-backed answer store
pub struct RedisStore {
    redis: ConnectionManager,
}

impl RedisStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

/// Storage key for one answer: survey:{uuid}
fn survey_key(key: &Uuid) -> String {
    format!("{SURVEY_PREFIX}{key}")
}

#[async_trait]
impl SurveyStore for RedisStore {
    async fn put(&self, record: &SurveyRecord) -> Result<Uuid, SurveyError> {
        let key = Uuid::new_v4();
        let payload = serde_json::to_string(record)
            .map_err(|e| SurveyError::Storage(format!("answer not serializable: {e}")))?;

        let mut conn = self.redis.clone();
        conn.set::<_, _, ()>(survey_key(&key), payload)
            .await
            .map_err(|e| SurveyError::Storage(e.to_string()))?;

        Ok(key)
    }

    async fn ping(&self) -> bool {
        let mut conn = self.redis.clone();
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }
}

/// In-memory store double for router tests. Mirrors the Redis key
/// layout so tests can resolve a response key to its stored payload.
#[cfg(test)]
pub(crate) struct MemoryStore {
    entries: std::sync::Mutex<std::collections::HashMap<String, String>>,
    puts: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(std::collections::HashMap::new()),
            puts: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub(crate) fn get(&self, key: &Uuid) -> Option<String> {
        self.entries.lock().unwrap().get(&survey_key(key)).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub(crate) fn put_count(&self) -> usize {
        self.puts.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SurveyStore for MemoryStore {
    async fn put(&self, record: &SurveyRecord) -> Result<Uuid, SurveyError> {
        self.puts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let key = Uuid::new_v4();
        let payload = serde_json::to_string(record)
            .map_err(|e| SurveyError::Storage(format!("answer not serializable: {e}")))?;
        self.entries.lock().unwrap().insert(survey_key(&key), payload);
        Ok(key)
    }

    async fn ping(&self) -> bool {
        true
    }
}

/// Store double whose writes always fail.
#[cfg(test)]
pub(crate) struct FailStore;

#[cfg(test)]
#[async_trait]
impl SurveyStore for FailStore {
    async fn put(&self, _record: &SurveyRecord) -> Result<Uuid, SurveyError> {
        Err(SurveyError::Storage("write rejected".into()))
    }

    async fn ping(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_common::SurveyForm;

    fn record(host: &str) -> SurveyRecord {
        SurveyForm {
            host: Some(host.into()),
            rate: Some("4".into()),
            ..Default::default()
        }
        .into_record()
        .unwrap()
    }

    #[test]
    fn test_survey_key_format() {
        let key = Uuid::new_v4();
        let formatted = survey_key(&key);
        assert_eq!(formatted, format!("survey:{key}"));
        // Hyphenated canonical rendering
        assert_eq!(formatted.len(), "survey:".len() + 36);
    }

    #[test]
    fn test_memory_store_mints_distinct_keys() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let a = store.put(&record("a.example")).await.unwrap();
            let b = store.put(&record("b.example")).await.unwrap();

            assert_ne!(a, b);
            assert_eq!(store.len(), 2);
            assert_eq!(store.put_count(), 2);
        });
    }

    #[test]
    fn test_memory_store_resolves_key_to_payload() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let original = record("example.com");
            let key = store.put(&original).await.unwrap();

            let stored: SurveyRecord =
                serde_json::from_str(&store.get(&key).unwrap()).unwrap();
            assert_eq!(stored, original);
        });
    }
}
