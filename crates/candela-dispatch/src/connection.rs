//! Connection handles for established subscriptions.
//!
//! Every `connect` call on a [`Signal`](crate::Signal) returns a
//! [`Connection`]: a non-owning handle that can later test whether the
//! subscription is still present and remove it. A connection never keeps the
//! signal alive - once the signal is dropped, every outstanding handle
//! observes it as disconnected and all operations become no-ops.
//!
//! [`ScopedConnection`] adds RAII semantics: the subscription is removed
//! when the guard is dropped, including when it is overwritten by
//! assignment.
//!
//! A signal/connection pair moves through three states - unconnected (a
//! default handle), connected, disconnected - and only in that direction;
//! a disconnected handle stays disconnected, and re-connecting produces a
//! new handle.

use std::fmt;
use std::sync::Weak;

use crate::signal::SignalBlock;
use crate::thunk::ThunkKey;

/// A non-owning handle to one subscription on one signal.
///
/// Holds a weak reference to the signal's shared state plus the
/// subscription's [`ThunkKey`] identity. Cloning the handle refers to the
/// same subscription; handles compare equal when they name the same
/// subscription on the same signal.
///
/// # Example
///
/// ```
/// use candela_dispatch::Signal;
///
/// let ticked = Signal::<u64>::new();
/// let conn = ticked.connect(|_| {});
///
/// assert!(conn.is_connected());
/// assert!(conn.disconnect());
/// assert!(!conn.is_connected());
///
/// // Disconnecting again is a no-op.
/// assert!(!conn.disconnect());
/// ```
pub struct Connection<Args, R = ()> {
    block: Weak<SignalBlock<Args, R>>,
    key: ThunkKey,
}

impl<Args: Send + 'static, R: 'static> Connection<Args, R> {
    pub(crate) fn new(block: Weak<SignalBlock<Args, R>>, key: ThunkKey) -> Self {
        Self { block, key }
    }

    /// The identity of the subscription this handle names.
    pub fn key(&self) -> ThunkKey {
        self.key
    }

    /// Whether the subscription is still present in its signal.
    ///
    /// Returns `false` for default handles, after a disconnect, and once
    /// the signal itself has been dropped.
    pub fn is_connected(&self) -> bool {
        match self.block.upgrade() {
            Some(block) => block.contains(self.key),
            None => false,
        }
    }

    /// Remove the subscription. Returns `true` if a slot was removed.
    ///
    /// A no-op on default handles and once the signal has been dropped.
    pub fn disconnect(&self) -> bool {
        match self.block.upgrade() {
            Some(block) => block.remove(self.key) > 0,
            None => false,
        }
    }
}

impl<Args, R> Default for Connection<Args, R> {
    /// An unconnected handle naming no subscription.
    fn default() -> Self {
        Self {
            block: Weak::new(),
            key: ThunkKey::default(),
        }
    }
}

impl<Args, R> Clone for Connection<Args, R> {
    fn clone(&self) -> Self {
        Self {
            block: self.block.clone(),
            key: self.key,
        }
    }
}

impl<Args, R> PartialEq for Connection<Args, R> {
    /// Handles are equal when they name the same subscription on the same
    /// signal: block identity is compared by pointer, not by contents.
    fn eq(&self, other: &Self) -> bool {
        self.block.ptr_eq(&other.block) && self.key == other.key
    }
}

impl<Args, R> Eq for Connection<Args, R> {}

impl<Args, R> fmt::Debug for Connection<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("key", &self.key)
            .field("alive", &(self.block.strong_count() > 0))
            .finish()
    }
}

/// A connection that disconnects automatically when dropped.
///
/// Wraps a [`Connection`] with RAII semantics, guaranteeing at most one live
/// binding per handle: dropping the guard, or overwriting it by assignment,
/// removes the subscription. Dropping a guard whose subscription is already
/// gone (or a default guard) does nothing.
///
/// # Example
///
/// ```
/// use candela_dispatch::Signal;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
///
/// let signal = Signal::<i32>::new();
/// let counter = Arc::new(AtomicI32::new(0));
/// {
///     let counter_clone = counter.clone();
///     let _guard = signal.connect_scoped(move |&n| {
///         counter_clone.fetch_add(n, Ordering::SeqCst);
///     });
///     signal.emit(42).unwrap(); // counter = 42
/// }
/// signal.emit(43).unwrap(); // Nothing happens - connection was dropped
/// assert_eq!(counter.load(Ordering::SeqCst), 42);
/// ```
pub struct ScopedConnection<Args: Send + 'static, R: 'static = ()> {
    conn: Connection<Args, R>,
}

impl<Args: Send + 'static, R: 'static> ScopedConnection<Args, R> {
    /// Whether the wrapped subscription is still present.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Disconnect now instead of at drop. Idempotent.
    pub fn disconnect(&self) -> bool {
        self.conn.disconnect()
    }

    /// Give up the scoped behavior, returning the plain handle.
    ///
    /// The subscription stays connected; the caller becomes responsible for
    /// disconnecting it.
    pub fn release(mut self) -> Connection<Args, R> {
        // Leaves a default handle behind, so the drop is a no-op.
        std::mem::take(&mut self.conn)
    }
}

impl<Args: Send + 'static, R: 'static> Default for ScopedConnection<Args, R> {
    fn default() -> Self {
        Self {
            conn: Connection::default(),
        }
    }
}

impl<Args: Send + 'static, R: 'static> From<Connection<Args, R>> for ScopedConnection<Args, R> {
    fn from(conn: Connection<Args, R>) -> Self {
        Self { conn }
    }
}

impl<Args: Send + 'static, R: 'static> Drop for ScopedConnection<Args, R> {
    fn drop(&mut self) {
        self.conn.disconnect();
    }
}

impl<Args: Send + 'static, R: 'static> fmt::Debug for ScopedConnection<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedConnection")
            .field("conn", &self.conn)
            .finish()
    }
}
