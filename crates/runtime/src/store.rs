//! In-memory registry of threads with one active selection.

use anyhow::{Result, bail};

use crate::thread::Thread;

#[derive(Debug, Default)]
pub struct ThreadStore {
    threads: Vec<Thread>,
    active: Option<usize>,
    created: usize,
}

impl ThreadStore {
    /// Create `thread-N` and make it active.
    pub fn create(&mut self) -> &mut Thread {
        self.created += 1;
        self.threads.push(Thread::new(format!("thread-{}", self.created)));
        let index = self.threads.len() - 1;
        self.active = Some(index);
        &mut self.threads[index]
    }

    pub fn select(&mut self, id: &str) -> Result<&mut Thread> {
        let Some(index) = self.threads.iter().position(|t| t.id() == id) else {
            bail!("no thread named '{id}'");
        };
        self.active = Some(index);
        Ok(&mut self.threads[index])
    }

    pub fn active(&self) -> Option<&Thread> {
        self.active.map(|index| &self.threads[index])
    }

    pub fn active_mut(&mut self) -> Option<&mut Thread> {
        self.active.map(|index| &mut self.threads[index])
    }

    pub fn get(&self, id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id() == id)
    }

    /// Threads in creation order.
    pub fn list(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_no_active_thread() {
        let store = ThreadStore::default();
        assert!(store.is_empty());
        assert!(store.active().is_none());
    }

    #[test]
    fn create_assigns_sequential_ids_and_activates() {
        let mut store = ThreadStore::default();
        assert_eq!(store.create().id(), "thread-1");
        assert_eq!(store.create().id(), "thread-2");
        assert_eq!(store.len(), 2);
        assert_eq!(store.active().unwrap().id(), "thread-2");

        let ids: Vec<&str> = store.list().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["thread-1", "thread-2"]);
    }

    #[test]
    fn select_switches_active_thread() {
        let mut store = ThreadStore::default();
        store.create();
        store.create();
        store.select("thread-1").unwrap();
        assert_eq!(store.active().unwrap().id(), "thread-1");
        assert!(store.get("thread-2").is_some());
    }

    #[test]
    fn select_unknown_keeps_selection() {
        let mut store = ThreadStore::default();
        store.create();
        assert!(store.select("thread-9").is_err());
        assert_eq!(store.active().unwrap().id(), "thread-1");
    }

    #[test]
    fn threads_are_independent() {
        let mut store = ThreadStore::default();
        store.create().add_tokens(40);
        store.create();
        assert_eq!(store.active().unwrap().tokens_used(), 0);
        assert_eq!(store.get("thread-1").unwrap().tokens_used(), 40);
    }
}
