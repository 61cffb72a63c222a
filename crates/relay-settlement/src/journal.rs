//! Undo logs backing the world state's checkpoints.
//!
//! Each store records the previous value of every entry it overwrites. A checkpoint is the log
//! length at the time it was taken; reverting pops and restores entries down to that length.
//! Logs are cleared by [`WorldState`](crate::WorldState) once the outermost checkpoint commits.

use core::hash::Hash;

use alloy_primitives::map::HashMap;

/// A hash map whose writes can be rolled back to a checkpoint.
#[derive(Debug, Clone)]
pub struct JournaledMap<K, V> {
    entries: HashMap<K, V>,
    log: Vec<(K, Option<V>)>,
}

impl<K, V> Default for JournaledMap<K, V> {
    fn default() -> Self {
        Self { entries: HashMap::default(), log: Vec::new() }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> JournaledMap<K, V> {
    /// Returns the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Returns whether a value is stored under `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Stores `value` under `key`, journaling the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let previous = self.entries.insert(key.clone(), value);
        self.log.push((key, previous.clone()));
        previous
    }

    /// Removes the value under `key`, journaling it.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let previous = self.entries.remove(key);
        if previous.is_some() {
            self.log.push((key.clone(), previous.clone()));
        }
        previous
    }

    /// Iterates over the current entries.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Number of current entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current position of the undo log.
    pub fn checkpoint(&self) -> usize {
        self.log.len()
    }

    /// Restores every entry written after `checkpoint`.
    pub fn revert_to(&mut self, checkpoint: usize) {
        while self.log.len() > checkpoint {
            let Some((key, previous)) = self.log.pop() else { break };
            match previous {
                Some(value) => {
                    self.entries.insert(key, value);
                }
                None => {
                    self.entries.remove(&key);
                }
            }
        }
    }

    /// Drops the undo log, making all writes permanent.
    pub fn clear_journal(&mut self) {
        self.log.clear();
    }
}

/// An append-only list whose pushes can be rolled back to a checkpoint.
#[derive(Debug, Clone, derive_more::Deref)]
pub struct JournaledVec<T> {
    #[deref]
    items: Vec<T>,
}

impl<T> Default for JournaledVec<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> JournaledVec<T> {
    /// Appends an item.
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Current length, used as checkpoint.
    pub fn checkpoint(&self) -> usize {
        self.items.len()
    }

    /// Drops every item pushed after `checkpoint`.
    pub fn revert_to(&mut self, checkpoint: usize) {
        self.items.truncate(checkpoint);
    }

    /// Removes and returns all items.
    pub fn drain_all(&mut self) -> Vec<T> {
        core::mem::take(&mut self.items)
    }
}
