use kvdoc::codec::StorageMode;
use kvdoc::collection::{Collection, DocId, Document, DocumentCursor};
use kvdoc::common::Value;
use kvdoc::doc;
use kvdoc::errors::{ErrorKind, KvDocError, KvDocResult};
use kvdoc::filter::all;
use kvdoc::repository::Repository;
use kvdoc::repository_builder::RepositoryBuilder;
use kvdoc::store::memory::InMemoryStore;
use kvdoc::store::{Expiry, KvStore, KvStoreProvider, StoreValue};
use parking_lot::RwLock;
use std::backtrace::Backtrace;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const INDEXED_FIELDS: [&str; 3] = ["role", "age", "active"];

/// Runs a test with retry logic and error handling.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> KvDocResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> KvDocResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> KvDocResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => match after(ctx) {
                        Ok(_) => Ok(()),
                        Err(e) => Err((format!("After run failed: {:?}", e), backtrace.to_string())),
                    },
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_error = Some(e.clone());
                last_backtrace = Some(bt);
                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("Error: {}", e);
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_error = Some(format!("Panic: {}", err_msg));
                last_backtrace = Some(Backtrace::capture().to_string());

                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Panicked (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("{}", err_msg);
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
        }
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    repository: Repository,
    store: FaultyStore,
}

impl TestContext {
    pub fn new(repository: Repository, store: FaultyStore) -> Self {
        Self { repository, store }
    }

    pub fn repository(&self) -> Repository {
        self.repository.clone()
    }

    pub fn store(&self) -> &FaultyStore {
        &self.store
    }

    pub fn users(&self) -> KvDocResult<Collection> {
        self.repository.collection("users", "userId")
    }
}

/// Context over a blob-mode repository indexing [INDEXED_FIELDS].
pub fn create_test_context() -> KvDocResult<TestContext> {
    create_context_with(|builder| builder)
}

/// Context over a structured-mode repository indexing [INDEXED_FIELDS].
pub fn create_structured_test_context() -> KvDocResult<TestContext> {
    create_context_with(|builder| builder.storage_mode(StorageMode::Structured))
}

pub fn create_context_with<F>(configure: F) -> KvDocResult<TestContext>
where
    F: Fn(RepositoryBuilder) -> RepositoryBuilder,
{
    let store = FaultyStore::new(InMemoryStore::new());
    let builder = Repository::builder()
        .store(KvStore::new(store.clone()))
        .indexed_fields(&INDEXED_FIELDS);
    let repository = configure(builder).build()?;
    Ok(TestContext::new(repository, store))
}

pub fn cleanup(ctx: TestContext) -> KvDocResult<()> {
    ctx.store().heal();
    ctx.store().memory().close();
    Ok(())
}

pub fn insert_test_documents(collection: &Collection) -> KvDocResult<()> {
    collection.set(&doc! { userId: 1, role: "CTO", age: 30, name: "Alice" })?;
    collection.set(&doc! { userId: 2, role: "CEO", age: 40, name: "Bob" })?;
    collection.set(&doc! { userId: 3, role: "CTO", age: 25, name: "Carol" })?;
    Ok(())
}

pub fn user_ids(cursor: DocumentCursor) -> Vec<i64> {
    cursor
        .filter_map(|doc| doc.get("userId").and_then(Value::as_i64))
        .collect()
}

pub fn sorted(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids
}

pub fn int_id(id: i64) -> DocId {
    DocId::from_value(&Value::from(id)).expect("integer ids are valid")
}

fn escape(component: &str) -> String {
    component.replace('\\', "\\\\").replace(':', "\\:")
}

/// Store key of a document of `collection` in a repository without key prefix.
pub fn doc_key(collection: &str, id: &DocId) -> String {
    format!("{}:doc:{}", escape(collection), escape(id.as_str()))
}

/// Store key of the index entry of `field` with canonical value `canonical`, in a
/// repository without key prefix.
pub fn index_key(collection: &str, field: &str, canonical: &str) -> String {
    format!("{}:idx:{}:{}", escape(collection), escape(field), escape(canonical))
}

/// Asserts that every index entry of `fields` holds exactly the ids of the stored
/// documents having that value.
pub fn assert_index_consistent(collection: &Collection, fields: &[&str]) -> KvDocResult<()> {
    let documents = collection.find(all())?.collect::<Vec<_>>();
    for &field in fields {
        let mut expected: BTreeMap<String, BTreeSet<DocId>> = BTreeMap::new();
        for document in &documents {
            if let (Some(value), Some(id)) = (document.get(field), document.get(collection.id_field())) {
                expected
                    .entry(value.canonical())
                    .or_default()
                    .insert(DocId::from_value(id)?);
            }
        }

        let actual = collection
            .index_entries(field)?
            .into_iter()
            .collect::<BTreeMap<_, _>>();
        assert_eq!(actual, expected, "index entries of {} drifted", field);
    }
    Ok(())
}

/// Documents of `documents` matching `predicate`, by id.
pub fn brute_force<P: Fn(&Document) -> bool>(documents: &HashMap<i64, Document>, predicate: P) -> Vec<i64> {
    let mut ids = documents
        .iter()
        .filter(|(_, document)| predicate(document))
        .map(|(id, _)| *id)
        .collect::<Vec<_>>();
    ids.sort_unstable();
    ids
}

/// Callback run once when a store call reaches a given key.
pub type StoreHook = Arc<dyn Fn() + Send + Sync>;

/// [KvStoreProvider] over an [InMemoryStore] that counts calls and fails on demand.
#[derive(Clone)]
pub struct FaultyStore {
    memory: InMemoryStore,
    state: Arc<FaultState>,
}

#[derive(Default)]
struct FaultState {
    calls: AtomicUsize,
    unavailable: AtomicBool,
    failing_removals: AtomicBool,
    timed_out_gets: RwLock<HashSet<String>>,
    slow_gets: RwLock<HashMap<String, Duration>>,
    after_gets: RwLock<HashMap<String, StoreHook>>,
    before_sets: RwLock<HashMap<String, StoreHook>>,
    before_removals: RwLock<HashMap<String, StoreHook>>,
}

impl FaultyStore {
    pub fn new(memory: InMemoryStore) -> Self {
        FaultyStore {
            memory,
            state: Arc::new(FaultState::default()),
        }
    }

    pub fn memory(&self) -> &InMemoryStore {
        &self.memory
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_removals(&self, fail: bool) {
        self.state.failing_removals.store(fail, Ordering::SeqCst);
    }

    /// Makes every GET of `key` fail with `StoreTimeout`.
    pub fn time_out_get(&self, key: &str) {
        self.state.timed_out_gets.write().insert(key.to_string());
    }

    /// Delays every GET of `key`.
    pub fn slow_get(&self, key: &str, delay: Duration) {
        self.state.slow_gets.write().insert(key.to_string(), delay);
    }

    /// Runs `hook` once, right after the next GET of `key` returned.
    pub fn after_get<F: Fn() + Send + Sync + 'static>(&self, key: &str, hook: F) {
        self.state.after_gets.write().insert(key.to_string(), Arc::new(hook));
    }

    /// Runs `hook` once, right before the next SET of `key`.
    pub fn before_set<F: Fn() + Send + Sync + 'static>(&self, key: &str, hook: F) {
        self.state.before_sets.write().insert(key.to_string(), Arc::new(hook));
    }

    /// Runs `hook` once, right before the next set member removal from `set_key`.
    pub fn before_removal<F: Fn() + Send + Sync + 'static>(&self, set_key: &str, hook: F) {
        self.state.before_removals.write().insert(set_key.to_string(), Arc::new(hook));
    }

    pub fn heal(&self) {
        self.set_unavailable(false);
        self.fail_removals(false);
        self.state.timed_out_gets.write().clear();
        self.state.slow_gets.write().clear();
        self.state.after_gets.write().clear();
        self.state.before_sets.write().clear();
        self.state.before_removals.write().clear();
    }

    /// Writes raw bytes under `key`, bypassing the document layer.
    pub fn corrupt(&self, key: &str) -> KvDocResult<()> {
        self.memory
            .set_value(key, StoreValue::Blob(vec![0xde, 0xad]), Expiry::Never)
    }

    fn fire(&self, hooks: &RwLock<HashMap<String, StoreHook>>, operation: &str, key: &str) {
        let hook = hooks.write().remove(key);
        if let Some(hook) = hook {
            log::debug!("Running hook on {} {}", operation, key);
            hook();
        }
    }

    fn enter(&self, operation: &str) -> KvDocResult<()> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if self.state.unavailable.load(Ordering::SeqCst) {
            return Err(KvDocError::new(
                &format!("{} refused, store unavailable", operation),
                ErrorKind::StoreUnavailable,
            ));
        }
        Ok(())
    }
}

impl KvStoreProvider for FaultyStore {
    fn get_value(&self, key: &str) -> KvDocResult<Option<StoreValue>> {
        self.enter("GET")?;
        if self.state.timed_out_gets.read().contains(key) {
            return Err(KvDocError::new(&format!("GET {} timed out", key), ErrorKind::StoreTimeout));
        }
        let delay = self.state.slow_gets.read().get(key).copied();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        let value = self.memory.get_value(key)?;
        self.fire(&self.state.after_gets, "GET", key);
        Ok(value)
    }

    fn set_value(&self, key: &str, value: StoreValue, expiry: Expiry) -> KvDocResult<()> {
        self.enter("SET")?;
        self.fire(&self.state.before_sets, "SET", key);
        self.memory.set_value(key, value, expiry)
    }

    fn delete_value(&self, key: &str) -> KvDocResult<bool> {
        self.enter("DEL")?;
        self.memory.delete_value(key)
    }

    fn expire(&self, key: &str, ttl: Duration) -> KvDocResult<bool> {
        self.enter("EXPIRE")?;
        self.memory.expire(key, ttl)
    }

    fn add_set_member(&self, set_key: &str, member: &str) -> KvDocResult<bool> {
        self.enter("SADD")?;
        self.memory.add_set_member(set_key, member)
    }

    fn remove_set_member(&self, set_key: &str, member: &str) -> KvDocResult<bool> {
        self.enter("SREM")?;
        if self.state.failing_removals.load(Ordering::SeqCst) {
            return Err(KvDocError::new("SREM refused", ErrorKind::StoreUnavailable));
        }
        self.fire(&self.state.before_removals, "SREM", set_key);
        self.memory.remove_set_member(set_key, member)
    }

    fn set_members(&self, set_key: &str) -> KvDocResult<BTreeSet<String>> {
        self.enter("SMEMBERS")?;
        self.memory.set_members(set_key)
    }

    fn intersect_sets(&self, set_keys: &[String]) -> KvDocResult<BTreeSet<String>> {
        self.enter("SINTER")?;
        self.memory.intersect_sets(set_keys)
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> KvDocResult<Vec<String>> {
        self.enter("SCAN")?;
        self.memory.list_keys_with_prefix(prefix)
    }
}
