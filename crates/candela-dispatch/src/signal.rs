//! Signal/slot event dispatch for Candela.
//!
//! This module provides the public pub/sub endpoint: a [`Signal`] fans
//! notifications out to connected [`Slot`]s without either side knowing the
//! other's concrete type. Subscribers whose owning object has been destroyed
//! are never invoked; the dispatch call reports
//! [`SignalError::ExpiredSlot`](crate::SignalError::ExpiredSlot) instead.
//!
//! # Key Types
//!
//! - [`Signal<Args, R>`] - the owning façade producers and subscribers use
//! - [`Connection`](crate::Connection) - handle returned by every `connect`
//! - [`Slot`](crate::Slot) - a stored subscription with lifetime trackers
//!
//! # Delivery Modes
//!
//! - **Immediate**: [`Signal::emit`] invokes every live slot synchronously in
//!   the calling thread.
//! - **Deferred**: [`Signal::post`] enqueues a payload without blocking;
//!   a later [`Signal::flush`] drains the queue through the current slot
//!   table (e.g. once per frame).
//!
//! # Thread Safety
//!
//! `Signal<Args, R>` is `Send + Sync`. The slot table sits behind a
//! readers-writer lock: any number of concurrent `emit`/`flush` calls scan in
//! parallel, while `connect`/`disconnect` take the exclusive side and never
//! overlap a scan. The pending queue is a lock-free channel, so `post` never
//! touches the lock and may run concurrently with an in-progress flush.
//!
//! # Example
//!
//! ```
//! use candela_dispatch::Signal;
//!
//! let frame_resized = Signal::<(u32, u32)>::new();
//!
//! let conn = frame_resized.connect(|&(w, h)| {
//!     println!("resized to {w}x{h}");
//! });
//!
//! frame_resized.emit((1280, 720)).unwrap();
//! conn.disconnect();
//! ```

use std::any::Any;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::RwLock;

use crate::connection::{Connection, ScopedConnection};
use crate::error::Result;
use crate::slot::Slot;
use crate::thunk::{Thunk, ThunkKey};

/// The shared state behind one signal: the sorted slot table and the pending
/// event queue.
///
/// The signal is the sole strong owner; connections observe it weakly. The
/// table is kept sorted by thunk key at all times, which makes membership
/// tests and equal-range erasure binary searches, and makes every slot bound
/// to one owner a contiguous run.
pub(crate) struct SignalBlock<Args, R = ()> {
    slots: RwLock<Vec<Slot<Args, R>>>,
    pending_tx: Sender<Args>,
    pending_rx: Receiver<Args>,
    blocked: AtomicBool,
}

impl<Args: Send + 'static, R: 'static> SignalBlock<Args, R> {
    fn new() -> Self {
        let (pending_tx, pending_rx) = unbounded();
        Self {
            slots: RwLock::new(Vec::new()),
            pending_tx,
            pending_rx,
            blocked: AtomicBool::new(false),
        }
    }

    /// Insert preserving sort order (upper-bound insertion).
    pub(crate) fn insert(&self, slot: Slot<Args, R>) {
        let mut slots = self.slots.write();
        let at = slots.partition_point(|s| s.key() <= slot.key());
        slots.insert(at, slot);
    }

    /// Erase the contiguous range of slots matching `key` exactly.
    pub(crate) fn remove(&self, key: ThunkKey) -> usize {
        let mut slots = self.slots.write();
        let start = slots.partition_point(|s| s.key() < key);
        let end = slots.partition_point(|s| s.key() <= key);
        slots.drain(start..end).count()
    }

    /// Erase every slot whose owner half matches `owner`, regardless of
    /// which method it was bound to.
    pub(crate) fn remove_owner(&self, owner: u64) -> usize {
        let mut slots = self.slots.write();
        let start = slots.partition_point(|s| s.key().cmp_owner(owner).is_lt());
        let end = slots.partition_point(|s| s.key().cmp_owner(owner).is_le());
        slots.drain(start..end).count()
    }

    pub(crate) fn clear(&self) {
        self.slots.write().clear();
    }

    pub(crate) fn contains(&self, key: ThunkKey) -> bool {
        self.slots
            .read()
            .binary_search_by(|s| s.key().cmp(&key))
            .is_ok()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.read().len()
    }

    fn emit(&self, args: &Args) -> Result<()> {
        let slots = self.slots.read();
        tracing::trace!(
            target: "candela_dispatch::signal",
            connection_count = slots.len(),
            "emitting signal"
        );
        for slot in slots.iter() {
            slot.invoke(args)?;
        }
        Ok(())
    }

    fn emit_accumulate<F>(&self, collect: &mut F, args: &Args) -> Result<()>
    where
        F: FnMut(R),
    {
        let slots = self.slots.read();
        for slot in slots.iter() {
            collect(slot.invoke(args)?);
        }
        Ok(())
    }

    fn post(&self, args: Args) {
        // Unbounded channel: never blocks, never takes the table lock.
        let _ = self.pending_tx.send(args);
    }

    fn flush<F>(&self, mut deliver: F) -> Result<usize>
    where
        F: FnMut(&[Slot<Args, R>], &Args) -> Result<()>,
    {
        let slots = self.slots.read();
        let mut drained = 0;
        while let Ok(args) = self.pending_rx.try_recv() {
            drained += 1;
            deliver(&slots, &args)?;
        }
        Ok(drained)
    }

    fn pending(&self) -> usize {
        self.pending_rx.len()
    }
}

/// A thread-safe, type-erased signal: the public pub/sub endpoint.
///
/// `Args` is the payload type passed (by reference) to every connected slot;
/// use a tuple for multiple arguments. `R` is the slots' return type,
/// collected by [`accumulate`](Signal::accumulate) and discarded by
/// [`emit`](Signal::emit); it defaults to `()`.
///
/// A signal is the only strong owner of its slot table. It is not clonable -
/// each signal has exactly one identity - but it is movable, and dropping it
/// disconnects every outstanding [`Connection`].
///
/// # Invocation order
///
/// Within one `emit` or `flush`, slots run in the table's sort order, which
/// is derived from addresses. Treat it as unspecified: do not depend on the
/// relative order of two subscribers.
///
/// # Related Types
///
/// - [`Connection`] / [`ScopedConnection`] - returned by the connect family
/// - [`Slot`] - pre-built subscriptions with extra lifetime trackers
pub struct Signal<Args, R = ()> {
    block: Arc<SignalBlock<Args, R>>,
}

impl<Args: Send + 'static, R: 'static> Signal<Args, R> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            block: Arc::new(SignalBlock::new()),
        }
    }

    /// Connect a closure owned by the signal.
    ///
    /// This is the common case for subscribers whose lifetime matches the
    /// signal's. Returns a [`Connection`] usable to disconnect later.
    ///
    /// # Example
    ///
    /// ```
    /// use candela_dispatch::Signal;
    ///
    /// let key_pressed = Signal::<u32>::new();
    /// let conn = key_pressed.connect(|code| println!("key {code}"));
    /// key_pressed.emit(42).unwrap();
    /// conn.disconnect();
    /// ```
    pub fn connect<F>(&self, slot: F) -> Connection<Args, R>
    where
        F: Fn(&Args) -> R + Send + Sync + 'static,
    {
        self.connect_slot(Slot::closure(slot))
    }

    /// Connect a free function pointer.
    pub fn connect_fn(&self, f: fn(&Args) -> R) -> Connection<Args, R> {
        self.connect_slot(Slot::function(f))
    }

    /// Connect a method bound to a shared receiver.
    ///
    /// The receiver's lifetime is tracked: once it is dropped, the next
    /// dispatch reaching this slot fails with
    /// [`SignalError::ExpiredSlot`](crate::SignalError::ExpiredSlot) instead
    /// of invoking a dead subscriber.
    pub fn connect_method<T>(
        &self,
        receiver: &Arc<T>,
        method: fn(&T, &Args) -> R,
    ) -> Connection<Args, R>
    where
        T: Send + Sync + 'static,
    {
        self.connect_slot(Slot::method(receiver, method))
    }

    /// Connect a shared callable object, tracking its lifetime.
    pub fn connect_callable<C>(&self, callable: &Arc<C>) -> Connection<Args, R>
    where
        C: Fn(&Args) -> R + Send + Sync + 'static,
    {
        self.connect_slot(Slot::callable(callable))
    }

    /// Connect a pre-built [`Slot`], with whatever trackers it carries.
    pub fn connect_slot(&self, slot: Slot<Args, R>) -> Connection<Args, R> {
        let key = slot.key();
        tracing::trace!(target: "candela_dispatch::signal", ?key, "connecting slot");
        self.block.insert(slot);
        Connection::new(Arc::downgrade(&self.block), key)
    }

    /// Connect a closure with automatic disconnection when the returned
    /// guard is dropped.
    pub fn connect_scoped<F>(&self, slot: F) -> ScopedConnection<Args, R>
    where
        F: Fn(&Args) -> R + Send + Sync + 'static,
    {
        self.connect(slot).into()
    }

    /// Disconnect a free function. Returns `true` if a slot was removed.
    pub fn disconnect_fn(&self, f: fn(&Args) -> R) -> bool {
        self.remove_key(Thunk::function(f).key()) > 0
    }

    /// Disconnect one bound method of `receiver`.
    pub fn disconnect_method<T>(&self, receiver: &Arc<T>, method: fn(&T, &Args) -> R) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.remove_key(Thunk::method(receiver, method).key()) > 0
    }

    /// Disconnect a shared callable object.
    pub fn disconnect_callable<C>(&self, callable: &Arc<C>) -> bool
    where
        C: Fn(&Args) -> R + Send + Sync + 'static,
    {
        self.remove_key(Thunk::callable(callable).key()) > 0
    }

    /// Disconnect every subscription bound to `object`, regardless of which
    /// method or callable it was. Returns the number of slots removed.
    pub fn disconnect_object<T>(&self, object: &Arc<T>) -> usize
    where
        T: Send + Sync + 'static,
    {
        let owner = Arc::as_ptr(object) as usize as u64;
        let removed = self.block.remove_owner(owner);
        tracing::trace!(target: "candela_dispatch::signal", owner, removed, "disconnected object");
        removed
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.block.clear();
    }

    fn remove_key(&self, key: ThunkKey) -> usize {
        let removed = self.block.remove(key);
        tracing::trace!(target: "candela_dispatch::signal", ?key, removed, "disconnecting slot");
        removed
    }

    /// Emit the signal, invoking every connected slot with `args`.
    ///
    /// Slots run synchronously in the calling thread, in table order. A slot
    /// whose tracked owner has died aborts the remaining fan-out with
    /// [`SignalError::ExpiredSlot`](crate::SignalError::ExpiredSlot) - a
    /// dangling subscription is a lifecycle bug upstream and is surfaced
    /// rather than skipped.
    ///
    /// If the signal is [blocked](Signal::set_blocked), this does nothing.
    ///
    /// # Deadlock
    ///
    /// The slot table is read-locked for the duration of the fan-out, so a
    /// slot must not connect to or disconnect from the signal that is
    /// invoking it.
    #[tracing::instrument(skip_all, target = "candela_dispatch::signal", level = "trace")]
    pub fn emit(&self, args: Args) -> Result<()> {
        if self.is_blocked() {
            tracing::trace!(target: "candela_dispatch::signal", "signal blocked, skipping emit");
            return Ok(());
        }
        self.block.emit(&args)
    }

    /// Emit, passing each slot's return value to `collect` instead of
    /// discarding it.
    ///
    /// `collect` is called once per live slot, in table order, with that
    /// slot's result. Expired slots abort the fan-out exactly as in
    /// [`emit`](Signal::emit).
    ///
    /// # Example
    ///
    /// ```
    /// use candela_dispatch::Signal;
    ///
    /// let poll = Signal::<(), bool>::new();
    /// poll.connect(|_| true);
    /// poll.connect(|_| false);
    ///
    /// let mut any = false;
    /// poll.accumulate(|ready| any |= ready, ()).unwrap();
    /// assert!(any);
    /// ```
    pub fn accumulate<F>(&self, mut collect: F, args: Args) -> Result<()>
    where
        F: FnMut(R),
    {
        if self.is_blocked() {
            return Ok(());
        }
        self.block.emit_accumulate(&mut collect, &args)
    }

    /// Enqueue `args` for a later [`flush`](Signal::flush).
    ///
    /// Never blocks and never contends with an in-progress emit or flush;
    /// safe to call from any thread, including concurrently with a flush.
    /// The queue preserves per-producer FIFO order.
    pub fn post(&self, args: Args) {
        if self.is_blocked() {
            return;
        }
        self.block.post(args);
    }

    /// Drain the pending queue, fanning each payload out to the current slot
    /// table exactly like [`emit`](Signal::emit). Returns the number of
    /// payloads delivered.
    ///
    /// Payloads posted while the flush is running may or may not be picked
    /// up by the same call; there is no atomicity across `post` + `flush`.
    pub fn flush(&self) -> Result<usize> {
        let drained = self.block.flush(|slots, args| {
            for slot in slots {
                slot.invoke(args)?;
            }
            Ok(())
        })?;
        tracing::trace!(target: "candela_dispatch::signal", drained, "flushed signal queue");
        Ok(drained)
    }

    /// Flush, threading every slot's return value through `collect`.
    pub fn flush_accumulate<F>(&self, mut collect: F) -> Result<usize>
    where
        F: FnMut(R),
    {
        self.block.flush(|slots, args| {
            for slot in slots {
                collect(slot.invoke(args)?);
            }
            Ok(())
        })
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.block.len()
    }

    /// Whether no slots are connected.
    pub fn is_empty(&self) -> bool {
        self.connection_count() == 0
    }

    /// Get the number of payloads posted but not yet flushed.
    pub fn pending_count(&self) -> usize {
        self.block.pending()
    }

    /// Block or unblock dispatch temporarily.
    ///
    /// While blocked, `emit`, `accumulate` and `post` do nothing. Useful
    /// during initialization or batch updates to prevent cascading
    /// notifications.
    pub fn set_blocked(&self, blocked: bool) {
        self.block.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check whether dispatch is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.block.blocked.load(Ordering::SeqCst)
    }

    /// A weak lifetime handle on this signal's shared state, for
    /// [`Slot::track_signal`].
    pub(crate) fn block_tracker(&self) -> Weak<dyn Any + Send + Sync> {
        let block: Arc<dyn Any + Send + Sync> = self.block.clone();
        let weak: Weak<dyn Any + Send + Sync> = Arc::downgrade(&block);
        weak
    }
}

impl<Args: Send + 'static, R: 'static> Default for Signal<Args, R> {
    fn default() -> Self {
        Self::new()
    }
}
