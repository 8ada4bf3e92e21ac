//! Writer-preferring read/write lock.
//!
//! Readers run concurrently with each other, never with the writer. Once a
//! writer is waiting, newly arriving readers queue behind it; only readers
//! already holding the lock finish first. The writer may re-enter the write
//! lock and takes read locks for free.
//!
//! Unlike `parking_lot::RwLock` the lock protects no data of its own and is
//! released explicitly (or through the guards), so one lock can span a batch
//! of calls on another structure. There is no timeout: a thread blocks until
//! the lock is granted.

use std::marker::PhantomData;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    /// Read locks currently held (the writer's are not counted).
    given_locks: usize,
    /// Writers blocked in [`SharedLock::write_lock`].
    waiting_writers: usize,
    writer: Option<ThreadId>,
    /// Re-entrant write acquisitions by `writer`.
    write_depth: usize,
}

#[derive(Debug, Default)]
pub struct SharedLock {
    state: Mutex<State>,
    changed: Condvar,
}

impl SharedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until no writer holds or waits for the lock, then takes a read
    /// lock. Returns at once, without counting, for the thread holding the
    /// write lock.
    ///
    /// A thread already holding a read lock must not call this again while a
    /// writer may be waiting: the writer waits for it and it waits for the
    /// writer.
    pub fn read_lock(&self) {
        self.acquire_read();
    }

    /// Takes a read lock; `false` when the caller holds the write lock and
    /// nothing was counted.
    fn acquire_read(&self) -> bool {
        let current = thread::current().id();
        let mut state = self.state.lock();
        if state.writer == Some(current) {
            return false;
        }
        if state.writer.is_some() || state.waiting_writers != 0 {
            tracing::trace!(
                waiting_writers = state.waiting_writers,
                "reader blocked behind writer"
            );
            while state.writer.is_some() || state.waiting_writers != 0 {
                self.changed.wait(&mut state);
            }
            tracing::trace!("reader resumed");
        }
        state.given_locks += 1;
        true
    }

    /// Releases a read lock taken by [`SharedLock::read_lock`]. A no-op for
    /// the thread holding the write lock.
    pub fn read_unlock(&self) {
        let state = self.state.lock();
        if state.writer == Some(thread::current().id()) {
            return;
        }
        self.release_read(state);
    }

    fn release_read(&self, mut state: MutexGuard<'_, State>) {
        assert!(state.given_locks > 0, "read_unlock without a read lock");
        state.given_locks -= 1;
        drop(state);
        self.changed.notify_all();
    }

    /// Blocks until every read lock is released and no other writer holds the
    /// lock, then takes the write lock. Re-entrant for its holder.
    pub fn write_lock(&self) {
        let current = thread::current().id();
        let mut state = self.state.lock();
        if state.writer == Some(current) {
            state.write_depth += 1;
            return;
        }
        state.waiting_writers += 1;
        if state.given_locks != 0 || state.writer.is_some() {
            tracing::trace!(given_locks = state.given_locks, "writer blocked");
            while state.given_locks != 0 || state.writer.is_some() {
                self.changed.wait(&mut state);
            }
            tracing::trace!("writer resumed");
        }
        state.waiting_writers -= 1;
        state.writer = Some(current);
        state.write_depth = 1;
    }

    /// Releases one write acquisition; the lock is free once every nested
    /// acquisition is released.
    pub fn write_unlock(&self) {
        let current = thread::current().id();
        let mut state = self.state.lock();
        assert_eq!(
            state.writer,
            Some(current),
            "write_unlock by a thread not holding the write lock"
        );
        state.write_depth -= 1;
        if state.write_depth == 0 {
            state.writer = None;
            drop(state);
            self.changed.notify_all();
        }
    }

    /// Read lock released on drop. A guard taken by the write-lock holder
    /// counts nothing, so it releases nothing even if the write lock is
    /// released first.
    pub fn read(&self) -> ReadGuard<'_> {
        let counted = self.acquire_read();
        ReadGuard {
            lock: self,
            counted,
            _not_send: PhantomData,
        }
    }

    pub fn write(&self) -> WriteGuard<'_> {
        self.write_lock();
        WriteGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Number of read locks currently held.
    pub fn given_locks(&self) -> usize {
        self.state.lock().given_locks
    }

    /// Number of writers waiting for the lock.
    pub fn waiting_writers(&self) -> usize {
        self.state.lock().waiting_writers
    }

    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer.is_some()
    }

    /// Whether the calling thread holds the write lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().writer == Some(thread::current().id())
    }
}

/// Read lock held until dropped. Bound to the acquiring thread.
#[must_use = "the read lock is released when the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a SharedLock,
    counted: bool,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        if self.counted {
            self.lock.release_read(self.lock.state.lock());
        }
    }
}

/// Write lock held until dropped. Bound to the acquiring thread.
#[must_use = "the write lock is released when the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a SharedLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.write_unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("condition not reached");
    }

    #[test]
    fn test_reader_blocks_behind_writer() {
        let lock = SharedLock::new();
        let acquired = AtomicBool::new(false);
        lock.write_lock();
        thread::scope(|s| {
            s.spawn(|| {
                lock.read_lock();
                acquired.store(true, Ordering::SeqCst);
            });
            thread::sleep(Duration::from_millis(50));
            assert!(!acquired.load(Ordering::SeqCst));
            assert_eq!(lock.given_locks(), 0);
            lock.write_unlock();
        });
        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(lock.given_locks(), 1);
        assert!(!lock.is_write_locked());
    }

    #[test]
    fn test_writer_preference() {
        let lock = SharedLock::new();
        let events = Mutex::new(Vec::new());
        lock.read_lock();
        thread::scope(|s| {
            s.spawn(|| {
                let _write = lock.write();
                events.lock().push("writer");
            });
            wait_until(|| lock.waiting_writers() == 1);

            // Arrives after the writer: must not overtake it.
            s.spawn(|| {
                let _read = lock.read();
                events.lock().push("late reader");
            });
            thread::sleep(Duration::from_millis(50));
            assert!(events.lock().is_empty());
            assert_eq!(lock.given_locks(), 1);
            lock.read_unlock();
        });
        assert_eq!(*events.lock(), ["writer", "late reader"]);
        assert_eq!(lock.given_locks(), 0);
        assert_eq!(lock.waiting_writers(), 0);
    }

    #[test]
    fn test_writer_reentrancy() {
        let lock = SharedLock::new();
        let outer = lock.write();
        {
            let _inner = lock.write();
            let _read = lock.read();
            assert_eq!(lock.given_locks(), 0);
            assert!(lock.is_held_by_current_thread());
        }
        assert!(lock.is_write_locked());
        drop(outer);
        assert!(!lock.is_write_locked());
        assert!(!lock.is_held_by_current_thread());
    }

    #[test]
    fn test_read_guard_outliving_write_lock() {
        let lock = SharedLock::new();
        let write = lock.write();
        let uncounted = lock.read();
        drop(write);
        let counted = lock.read();
        assert_eq!(lock.given_locks(), 1);
        drop(uncounted);
        assert_eq!(lock.given_locks(), 1);
        drop(counted);
        assert_eq!(lock.given_locks(), 0);
    }

    #[test]
    fn test_second_writer_waits_for_first() {
        let lock = SharedLock::new();
        let acquired = AtomicBool::new(false);
        lock.write_lock();
        thread::scope(|s| {
            s.spawn(|| {
                let _write = lock.write();
                acquired.store(true, Ordering::SeqCst);
            });
            wait_until(|| lock.waiting_writers() == 1);
            thread::sleep(Duration::from_millis(20));
            assert!(!acquired.load(Ordering::SeqCst));
            lock.write_unlock();
        });
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    #[should_panic(expected = "not holding the write lock")]
    fn test_foreign_write_unlock_panics() {
        SharedLock::new().write_unlock();
    }

    #[test]
    fn test_mutual_exclusion() {
        let lock = Arc::new(SharedLock::new());
        let readers = Arc::new(AtomicUsize::new(0));
        let writers = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let (lock, readers, writers) = (lock.clone(), readers.clone(), writers.clone());
                thread::spawn(move || {
                    for i in 0..200 {
                        if (t + i) % 4 == 0 {
                            let _write = lock.write();
                            assert_eq!(writers.fetch_add(1, Ordering::SeqCst), 0);
                            assert_eq!(readers.load(Ordering::SeqCst), 0);
                            writers.fetch_sub(1, Ordering::SeqCst);
                        } else {
                            let _read = lock.read();
                            readers.fetch_add(1, Ordering::SeqCst);
                            assert_eq!(writers.load(Ordering::SeqCst), 0);
                            readers.fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker panicked");
        }
        assert_eq!(lock.given_locks(), 0);
        assert!(!lock.is_write_locked());
    }
}
