//! Fixed-capacity cursor pool.
//!
//! Read-side helpers (prefetch warm-ups) share a small fixed set of cursors.
//! Acquisition blocks until a cursor is returned; the pool never grows.

use std::sync::{Condvar, Mutex};

/// A fixed-capacity pool of cursors guarded by a mutex and condvar.
pub struct CursorPool<C> {
    cursors: Mutex<Vec<C>>,
    available: Condvar,
    capacity: usize,
}

impl<C> CursorPool<C> {
    /// Build a pool over a fixed set of cursors.
    pub fn new(cursors: Vec<C>) -> Self {
        let capacity = cursors.len();
        Self {
            cursors: Mutex::new(cursors),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Total number of cursor slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cursors currently idle in the pool.
    pub fn idle(&self) -> usize {
        self.cursors.lock().expect("cursor pool lock poisoned").len()
    }

    /// Take a cursor, blocking until one is available. The cursor returns to
    /// the pool when the guard drops.
    pub fn acquire(&self) -> PooledCursor<'_, C> {
        let mut cursors = self.cursors.lock().expect("cursor pool lock poisoned");
        loop {
            if let Some(cursor) = cursors.pop() {
                return PooledCursor {
                    pool: self,
                    cursor: Some(cursor),
                };
            }
            cursors = self
                .available
                .wait(cursors)
                .expect("cursor pool lock poisoned");
        }
    }

    fn release(&self, cursor: C) {
        let mut cursors = self.cursors.lock().expect("cursor pool lock poisoned");
        debug_assert!(cursors.len() < self.capacity);
        cursors.push(cursor);
        self.available.notify_one();
    }
}

/// A cursor checked out of a [`CursorPool`]; returned on drop.
pub struct PooledCursor<'a, C> {
    pool: &'a CursorPool<C>,
    cursor: Option<C>,
}

impl<C> std::ops::Deref for PooledCursor<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.cursor.as_ref().expect("cursor already released")
    }
}

impl<C> std::ops::DerefMut for PooledCursor<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.cursor.as_mut().expect("cursor already released")
    }
}

impl<C> Drop for PooledCursor<'_, C> {
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            self.pool.release(cursor);
        }
    }
}
