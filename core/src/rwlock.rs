//! A monitor-style reader/writer lock.
//!
//! Many readers may hold the lock at once as long as no writer does; a writer
//! holds it exclusively and is tied to the thread that acquired it. Readers
//! only wait for an *active* writer, never for a waiting one, so a steady
//! stream of readers can keep a writer waiting.

use parking_lot::{Condvar, Mutex};
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};
use thiserror::Error;

/// Which half of a [`ReadWriteLock`] an operation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Read,
    Write,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Read => f.write_str("read"),
            LockKind::Write => f.write_str("write"),
        }
    }
}

/// Lock protocol violations. These are programming errors, never transient.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("{kind} lock released while not held")]
    NotHeld { kind: LockKind },
    #[error("write lock released by a thread that does not own it")]
    NotOwner,
}

/// Explicit acquire/release interface shared by both halves of the lock.
pub trait SimpleLock {
    /// Blocks until the lock is acquired.
    fn lock(&self);

    fn unlock(&self) -> Result<(), LockError>;
}

#[derive(Debug, Default)]
struct State {
    readers: usize,
    writers: usize,
    owner: Option<ThreadId>,
}

#[derive(Debug, Default)]
pub struct ReadWriteLock {
    state: Mutex<State>,
    changed: Condvar,
}

impl ReadWriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_lock(&self) -> ReadLock<'_> {
        ReadLock { lock: self }
    }

    pub fn write_lock(&self) -> WriteLock<'_> {
        WriteLock { lock: self }
    }

    /// Number of active readers.
    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }

    /// Number of active writers (0 or 1).
    pub fn writers(&self) -> usize {
        self.state.lock().writers
    }
}

/// Shared half of a [`ReadWriteLock`].
#[derive(Clone, Copy)]
pub struct ReadLock<'a> {
    lock: &'a ReadWriteLock,
}

impl SimpleLock for ReadLock<'_> {
    fn lock(&self) {
        let mut state = self.lock.state.lock();
        while state.writers > 0 {
            self.lock.changed.wait(&mut state);
        }
        state.readers += 1;
    }

    fn unlock(&self) -> Result<(), LockError> {
        let mut state = self.lock.state.lock();
        if state.readers == 0 {
            return Err(LockError::NotHeld { kind: LockKind::Read });
        }
        state.readers -= 1;
        if state.readers == 0 {
            self.lock.changed.notify_all();
        }
        Ok(())
    }
}

/// Exclusive half of a [`ReadWriteLock`].
#[derive(Clone, Copy)]
pub struct WriteLock<'a> {
    lock: &'a ReadWriteLock,
}

impl SimpleLock for WriteLock<'_> {
    fn lock(&self) {
        let mut state = self.lock.state.lock();
        while state.readers > 0 || state.writers > 0 {
            self.lock.changed.wait(&mut state);
        }
        state.writers = 1;
        state.owner = Some(thread::current().id());
    }

    fn unlock(&self) -> Result<(), LockError> {
        let mut state = self.lock.state.lock();
        if state.writers == 0 {
            return Err(LockError::NotHeld { kind: LockKind::Write });
        }
        if state.owner != Some(thread::current().id()) {
            return Err(LockError::NotOwner);
        }
        state.writers = 0;
        state.owner = None;
        self.lock.changed.notify_all();
        Ok(())
    }
}

/// Releases a held lock half when dropped. Not `Send`: a write lock must be
/// released by the thread that took it.
struct Held<L: SimpleLock> {
    half: L,
    _not_send: PhantomData<*const ()>,
}

impl<L: SimpleLock> Held<L> {
    fn acquire(half: L) -> Self {
        half.lock();
        Self { half, _not_send: PhantomData }
    }
}

impl<L: SimpleLock> Drop for Held<L> {
    fn drop(&mut self) {
        if let Err(err) = self.half.unlock() {
            tracing::error!(%err, "lock guard release failed");
        }
    }
}

/// A value guarded by a [`ReadWriteLock`]. Every access runs as a read- or
/// write-scoped critical section around a closure.
///
/// The lock itself stays private, so its halves cannot be released while a
/// closure still holds a reference to the value:
///
/// ```compile_fail
/// let shared = search_core::Shared::new(0);
/// shared.write(|_| shared.lock.write_lock());
/// ```
///
/// ```compile_fail
/// let shared = search_core::Shared::new(0);
/// let _ = shared.lock();
/// ```
pub struct Shared<T> {
    lock: ReadWriteLock,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` only happens inside `read` (shared, no active
// writer) or `write` (exclusive, no readers or other writers).
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send + Sync> Sync for Shared<T> {}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self { lock: ReadWriteLock::new(), value: UnsafeCell::new(value) }
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let _held = Held::acquire(self.lock.read_lock());
        // SAFETY: the read lock excludes writers for the lifetime of `_held`.
        f(unsafe { &*self.value.get() })
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _held = Held::acquire(self.lock.write_lock());
        // SAFETY: the write lock excludes every other access for the lifetime of `_held`.
        f(unsafe { &mut *self.value.get() })
    }

    /// Number of closures currently reading the value.
    pub fn readers(&self) -> usize {
        self.lock.readers()
    }

    /// 1 while a closure is writing the value, else 0.
    pub fn writers(&self) -> usize {
        self.lock.writers()
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|value| f.debug_struct("Shared").field("value", value).finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    #[test]
    fn readers_share_the_lock() {
        let lock = ReadWriteLock::new();
        lock.read_lock().lock();
        lock.read_lock().lock();
        assert_eq!(lock.readers(), 2);
        assert_eq!(lock.writers(), 0);
        lock.read_lock().unlock().unwrap();
        lock.read_lock().unlock().unwrap();
        assert_eq!(lock.readers(), 0);
    }

    #[test]
    fn unlocking_unheld_halves_fails() {
        let lock = ReadWriteLock::new();
        assert_eq!(lock.read_lock().unlock(), Err(LockError::NotHeld { kind: LockKind::Read }));
        assert_eq!(lock.write_lock().unlock(), Err(LockError::NotHeld { kind: LockKind::Write }));
    }

    #[test]
    fn write_unlock_from_other_thread_fails() {
        let lock = ReadWriteLock::new();
        lock.write_lock().lock();
        thread::scope(|s| {
            let result = s.spawn(|| lock.write_lock().unlock()).join().unwrap();
            assert_eq!(result, Err(LockError::NotOwner));
        });
        assert_eq!(lock.writers(), 1);
        lock.write_lock().unlock().unwrap();
        assert_eq!(lock.writers(), 0);
    }

    #[test]
    fn writer_waits_for_readers() {
        let lock = ReadWriteLock::new();
        let wrote = AtomicBool::new(false);
        lock.read_lock().lock();

        thread::scope(|s| {
            s.spawn(|| {
                lock.write_lock().lock();
                wrote.store(true, Ordering::SeqCst);
                lock.write_lock().unlock().unwrap();
            });
            thread::sleep(Duration::from_millis(50));
            assert!(!wrote.load(Ordering::SeqCst));
            lock.read_lock().unlock().unwrap();
        });
        assert!(wrote.load(Ordering::SeqCst));
    }

    #[test]
    fn writer_never_sees_readers() {
        let shared = Shared::new(0usize);
        let violations = AtomicUsize::new(0);
        let start = Barrier::new(9);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    start.wait();
                    for _ in 0..200 {
                        shared.read(|value| {
                            if shared.writers() != 0 {
                                violations.fetch_add(1, Ordering::SeqCst);
                            }
                            *value
                        });
                    }
                });
            }
            s.spawn(|| {
                start.wait();
                for _ in 0..200 {
                    shared.write(|value| {
                        if shared.readers() != 0 || shared.writers() != 1 {
                            violations.fetch_add(1, Ordering::SeqCst);
                        }
                        *value += 1;
                    });
                }
            });
        });

        assert_eq!(violations.load(Ordering::SeqCst), 0);
        assert_eq!(shared.into_inner(), 200);
    }

    #[test]
    fn counts_track_closures() {
        let shared = Shared::new(String::from("value"));
        assert_eq!((shared.readers(), shared.writers()), (0, 0));
        shared.read(|_| {
            assert_eq!((shared.readers(), shared.writers()), (1, 0));
            shared.read(|_| assert_eq!(shared.readers(), 2));
        });
        shared.write(|value| {
            value.push('!');
            assert_eq!((shared.readers(), shared.writers()), (0, 1));
        });
        assert_eq!((shared.readers(), shared.writers()), (0, 0));
        assert_eq!(shared.into_inner(), "value!");
    }

    #[test]
    fn guard_releases_on_panic() {
        let shared = Shared::new(1);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            shared.write(|_| panic!("boom"));
        }));
        assert!(outcome.is_err());
        assert_eq!(shared.writers(), 0);
        assert_eq!(shared.read(|v| *v), 1);
    }
}
