use std::sync::Arc;

use chrono::Utc;
use dew_api::v1::{FilterCriteria, NewTodo, Todo, TodoPatch};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{codec, query, writer::Writer, Storage};

/// Storage key the collection is written under unless configured otherwise.
pub const DEFAULT_KEY: &str = "todos.ron";

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key: String::from(DEFAULT_KEY),
        }
    }
}

/// The single owner of the todo list.
///
/// Every change is applied in memory first and then handed, as a full
/// snapshot, to a background writer. None of the operations fail: storage
/// errors are logged and otherwise ignored, unknown ids are no-ops.
///
/// New todos are inserted at the front, so the collection reads most recent
/// first.
pub struct TodoStore {
    todos: Vec<Todo>,
    storage: Arc<dyn Storage>,
    key: String,
    writer: Writer,
    generation: watch::Sender<u64>,
}

impl std::fmt::Debug for TodoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoStore")
            .field("todos", &self.todos)
            .field("key", &self.key)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl TodoStore {
    /// Creates an empty store. Must be called from within a Tokio runtime,
    /// which hosts the persistence worker.
    pub fn new(storage: Arc<dyn Storage>, config: StoreConfig) -> Self {
        let writer = Writer::spawn(storage.clone(), config.key.clone());
        let (generation, _) = watch::channel(0);

        Self {
            todos: Vec::new(),
            storage,
            key: config.key,
            writer,
            generation,
        }
    }

    /// Creates a store and hydrates it from `storage`.
    pub async fn load(storage: Arc<dyn Storage>, config: StoreConfig) -> Self {
        let mut store = Self::new(storage, config);
        store.initialize().await;
        store
    }

    /// Replaces the in-memory list with whatever is persisted.
    ///
    /// Missing, unreadable or malformed data all result in an empty list.
    pub async fn initialize(&mut self) {
        self.writer.flush().await;

        self.todos = match self.storage.get(&self.key).await {
            Ok(Some(bytes)) => match codec::decode(&bytes) {
                Ok(todos) => todos,
                Err(err) => {
                    warn!(key = %self.key, "Ignoring malformed todos: {:?}", err);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                error!(key = %self.key, "Failed to load todos: {:?}", err);
                Vec::new()
            }
        };

        info!(count = self.todos.len(), "loaded todos");
        self.bump_generation();
    }

    pub fn all(&self) -> &[Todo] {
        &self.todos
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    pub fn query(&self, criteria: &FilterCriteria) -> Vec<Todo> {
        query(&self.todos, criteria).cloned().collect()
    }

    /// Returns `None` without touching anything if the title is blank.
    pub fn add(&mut self, new: NewTodo) -> Option<Todo> {
        let Some(todo) = Todo::create(new, Utc::now()) else {
            debug!("ignoring todo with empty title");
            return None;
        };

        self.todos.insert(0, todo.clone());

        info!(
            id = %todo.id,
            title = %todo.title,
            priority = %todo.priority,
            "created todo"
        );

        self.changed();
        Some(todo)
    }

    pub fn toggle_complete(&mut self, id: Uuid) -> Option<Todo> {
        let todo = self.get_mut(id)?;
        todo.toggle(Utc::now());
        let todo = todo.clone();

        info!(
            id = %todo.id,
            completed = todo.completed,
            "toggled todo"
        );

        self.changed();
        Some(todo)
    }

    pub fn update(&mut self, id: Uuid, patch: TodoPatch) -> Option<Todo> {
        let todo = self.get_mut(id)?;
        todo.apply(patch, Utc::now());
        let todo = todo.clone();

        info!(
            id = %todo.id,
            title = ?todo.title,
            "updated todo"
        );

        self.changed();
        Some(todo)
    }

    /// Returns whether a todo was removed.
    pub fn delete(&mut self, id: Uuid) -> bool {
        let Some(index) = self.todos.iter().position(|todo| todo.id == id) else {
            return false;
        };

        let todo = self.todos.remove(index);
        info!(id = %todo.id, "deleted todo");

        self.changed();
        true
    }

    /// Removes every completed todo and returns how many there were.
    pub fn delete_completed(&mut self) -> usize {
        let before = self.todos.len();
        self.todos.retain(|todo| !todo.completed);
        let removed = before - self.todos.len();

        if removed > 0 {
            info!(removed, "deleted completed todos");
            self.changed();
        }

        removed
    }

    pub fn clear(&mut self) {
        let removed = self.todos.len();
        self.todos.clear();

        info!(removed, "cleared todos");
        self.changed();
    }

    /// Waits until every write issued so far has reached storage or failed.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// Counter bumped on every change; views compare it to spot staleness.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|todo| todo.id == id)
    }

    fn changed(&mut self) {
        self.persist();
        self.bump_generation();
    }

    // snapshot now, write later
    fn persist(&self) {
        match codec::encode(&self.todos) {
            Ok(bytes) => self.writer.write(bytes),
            Err(err) => error!(key = %self.key, "Failed to encode todos: {:?}", err),
        }
    }

    fn bump_generation(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use dew_api::v1::{Priority, StatusFilter};
    use tokio::sync::Mutex;

    use super::*;
    use crate::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, TodoStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = TodoStore::new(storage.clone(), StoreConfig::default());
        (storage, store)
    }

    fn titles(todos: &[Todo]) -> Vec<&str> {
        todos.iter().map(|todo| todo.title.as_str()).collect()
    }

    #[tokio::test]
    async fn add_prepends_a_fresh_record() {
        let (_, mut store) = store();

        store.add(NewTodo::new("first", Priority::Low)).unwrap();
        let todo = store.add(NewTodo::new("second", Priority::High)).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(titles(store.all()), ["second", "first"]);
        assert!(!todo.completed);
        assert_eq!(todo.created_at, todo.updated_at);
        assert_eq!(store.get(todo.id), Some(&todo));
    }

    #[tokio::test]
    async fn blank_titles_are_ignored() {
        let (storage, mut store) = store();

        assert!(store.add(NewTodo::new("", Priority::Medium)).is_none());
        assert!(store.add(NewTodo::new("   ", Priority::Medium)).is_none());
        store.flush().await;

        assert!(store.is_empty());
        assert_eq!(store.generation(), 0);
        assert_eq!(storage.writes(), 0);
    }

    #[tokio::test]
    async fn double_toggle_restores_state_and_advances_updated_at() {
        let (_, mut store) = store();
        let todo = store.add(NewTodo::new("a", Priority::Medium)).unwrap();

        let once = store.toggle_complete(todo.id).unwrap();
        let twice = store.toggle_complete(todo.id).unwrap();

        assert!(once.completed);
        assert!(!twice.completed);
        assert!(once.updated_at > todo.updated_at);
        assert!(twice.updated_at > once.updated_at);
    }

    #[tokio::test]
    async fn update_changes_only_targeted_fields() {
        let (_, mut store) = store();
        let todo = store
            .add(NewTodo::new("a", Priority::Low).description("keep me"))
            .unwrap();

        let updated = store.update(todo.id, TodoPatch::default().title("x")).unwrap();

        assert_eq!(updated.id, todo.id);
        assert_eq!(updated.created_at, todo.created_at);
        assert_eq!(updated.title, "x");
        assert_eq!(updated.priority, Priority::Low);
        assert_eq!(updated.description.as_deref(), Some("keep me"));
        assert!(updated.updated_at > todo.updated_at);
    }

    #[tokio::test]
    async fn unknown_ids_are_noops() {
        let (storage, mut store) = store();
        store.add(NewTodo::new("a", Priority::Low)).unwrap();
        let generation = store.generation();
        let id = Uuid::new_v4();

        assert!(store.toggle_complete(id).is_none());
        assert!(store.update(id, TodoPatch::default().title("x")).is_none());
        assert!(!store.delete(id));
        store.flush().await;

        assert_eq!(store.generation(), generation);
        assert_eq!(storage.writes(), 1);
    }

    #[tokio::test]
    async fn delete_twice_is_safe() {
        let (_, mut store) = store();
        let todo = store.add(NewTodo::new("a", Priority::Low)).unwrap();

        assert!(store.delete(todo.id));
        assert!(!store.delete(todo.id));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_completed_and_clear() {
        let (_, mut store) = store();
        let a = store.add(NewTodo::new("a", Priority::Low)).unwrap();
        store.add(NewTodo::new("b", Priority::Low)).unwrap();
        store.toggle_complete(a.id);

        assert_eq!(store.delete_completed(), 1);
        assert_eq!(store.delete_completed(), 0);
        assert_eq!(titles(store.all()), ["b"]);

        store.clear();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn changes_round_trip_through_storage() {
        let (storage, mut store) = store();
        let a = store.add(NewTodo::new("a", Priority::Low)).unwrap();
        store.add(NewTodo::new("b", Priority::High).description("bee"));
        store.add(NewTodo::new("c", Priority::Medium));
        store.toggle_complete(a.id);
        store.flush().await;

        let reloaded = TodoStore::load(storage, StoreConfig::default()).await;

        assert_eq!(reloaded.all(), store.all());
    }

    #[tokio::test]
    async fn initialize_overwrites_memory() {
        let (storage, mut store) = store();
        store.add(NewTodo::new("persisted", Priority::Low));
        store.flush().await;

        let mut other = TodoStore::new(storage.clone(), StoreConfig::default());
        other.add(NewTodo::new("written", Priority::Low));
        other.flush().await;
        storage.fail_writes(true);
        other.add(NewTodo::new("lost", Priority::Low));
        other.flush().await;
        storage.fail_writes(false);

        store.initialize().await;
        assert_eq!(titles(store.all()), ["written"]);
    }

    #[tokio::test]
    async fn read_failure_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert(DEFAULT_KEY, codec::encode(&[]).unwrap()).await;
        storage.fail_reads(true);

        let store = TodoStore::load(storage, StoreConfig::default()).await;

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert(DEFAULT_KEY, b"{\"todos\": oops".to_vec()).await;

        let store = TodoStore::load(storage, StoreConfig::default()).await;

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn write_failure_keeps_memory_state() {
        let (storage, mut store) = store();
        storage.fail_writes(true);

        let todo = store.add(NewTodo::new("a", Priority::Low)).unwrap();
        store.flush().await;

        assert_eq!(store.get(todo.id), Some(&todo));
        assert_eq!(storage.get(DEFAULT_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn custom_key() {
        let storage = Arc::new(MemoryStorage::new());
        let config = StoreConfig {
            key: String::from("elsewhere"),
        };
        let mut store = TodoStore::new(storage.clone(), config);

        store.add(NewTodo::new("a", Priority::Low));
        store.flush().await;

        assert!(storage.get("elsewhere").await.unwrap().is_some());
        assert!(storage.get(DEFAULT_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn generation_is_observable() {
        let (_, mut store) = store();
        let mut rx = store.subscribe();

        store.add(NewTodo::new("a", Priority::Low));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(store.generation(), 1);
    }

    #[tokio::test]
    async fn filter_scenario_priority() {
        let (_, mut store) = store();
        let milk = store.add(NewTodo::new("Buy milk", Priority::Low)).unwrap();
        store.add(NewTodo::new("Pay rent", Priority::High));
        store.toggle_complete(milk.id);

        let high = store.query(&FilterCriteria::default().priority(Priority::High));

        assert_eq!(titles(&high), ["Pay rent"]);
    }

    #[tokio::test]
    async fn filter_scenario_updated_priority() {
        let (_, mut store) = store();
        let task = store.add(NewTodo::new("Task A", Priority::Medium)).unwrap();
        store.update(task.id, TodoPatch::default().priority(Priority::High));

        let high = store.query(&FilterCriteria::default().priority(Priority::High));
        let medium = store.query(&FilterCriteria::default().priority(Priority::Medium));

        assert_eq!(titles(&high), ["Task A"]);
        assert!(medium.is_empty());
    }

    #[tokio::test]
    async fn query_does_not_mutate() {
        let (_, mut store) = store();
        store.add(NewTodo::new("a", Priority::Low));
        store.add(NewTodo::new("b", Priority::High));
        let before = store.all().to_vec();

        let active = store.query(&FilterCriteria::default().status(StatusFilter::Completed));

        assert!(active.is_empty());
        assert_eq!(store.all(), before.as_slice());
        assert_eq!(store.query(&FilterCriteria::default()), before);
    }

    /// Records every write after a delay that shrinks with each call, so an
    /// unserialized writer would land them out of order.
    #[derive(Default)]
    struct SlowStorage {
        log: Mutex<Vec<Vec<u8>>>,
        calls: Mutex<u64>,
    }

    #[async_trait]
    impl Storage for SlowStorage {
        async fn get(&self, _key: &str) -> eyre::Result<Option<Vec<u8>>> {
            Ok(self.log.lock().await.last().cloned())
        }

        async fn set(&self, _key: &str, value: Vec<u8>) -> eyre::Result<()> {
            let delay = {
                let mut calls = self.calls.lock().await;
                *calls += 1;
                30u64.saturating_sub(*calls * 10)
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.log.lock().await.push(value);
            Ok(())
        }
    }

    #[tokio::test]
    async fn writes_land_in_issue_order() {
        let storage = Arc::new(SlowStorage::default());
        let mut store = TodoStore::new(storage.clone(), StoreConfig::default());

        store.add(NewTodo::new("one", Priority::Low));
        store.add(NewTodo::new("two", Priority::Low));
        store.add(NewTodo::new("three", Priority::Low));
        store.flush().await;

        let log = storage.log.lock().await;
        let sizes: Vec<_> = log
            .iter()
            .map(|bytes| codec::decode(bytes).unwrap().len())
            .collect();

        assert_eq!(sizes, [1, 2, 3]);
        assert_eq!(codec::decode(log.last().unwrap()).unwrap(), store.all());
    }
}
