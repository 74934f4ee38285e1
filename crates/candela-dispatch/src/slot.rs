//! Stored subscriptions: a thunk plus the lifetimes it depends on.
//!
//! A [`Slot`] is what a signal actually stores: the type-erased callable
//! ([`crate::Thunk`]) together with a set of *trackers* - weak references to
//! the objects the subscription depends on. Before every invocation each
//! tracker is upgraded to a temporary strong hold; if any upgrade fails the
//! call fails with [`SignalError::ExpiredSlot`] and the callable is never
//! run. The holds last exactly for the duration of the call, so a tracked
//! owner cannot be destroyed mid-invocation.
//!
//! Slots compare and order exactly like their embedded thunk, which is what
//! lets a signal keep them in a sorted table and search it like raw keys.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{Result, SignalError};
use crate::signal::Signal;
use crate::thunk::{Thunk, ThunkKey};

/// A stored, invocable subscription.
///
/// Created through the binding constructors ([`Slot::function`],
/// [`Slot::method`], [`Slot::callable`], [`Slot::closure`]) or from a bound
/// [`Thunk`]; there is no way to build an empty slot. Method and callable
/// slots track their receiver automatically; further lifetime dependencies
/// are added with the chaining [`track`](Slot::track) family.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use candela_dispatch::{Signal, Slot};
///
/// struct View;
///
/// impl View {
///     fn on_resize(&self, size: &(u32, u32)) {
///         let _ = size;
///     }
/// }
///
/// let resized = Signal::<(u32, u32)>::new();
/// let view = Arc::new(View);
///
/// // The receiver is tracked: dropping `view` expires the subscription.
/// resized.connect_slot(Slot::method(&view, View::on_resize));
/// ```
pub struct Slot<Args, R = ()> {
    thunk: Thunk<Args, R>,
    trackers: Vec<Weak<dyn Any + Send + Sync>>,
}

impl<Args: 'static, R: 'static> Slot<Args, R> {
    /// Bind a free function pointer.
    pub fn function(f: fn(&Args) -> R) -> Self {
        Thunk::function(f).into()
    }

    /// Bind a method to a shared receiver, tracking the receiver's lifetime.
    pub fn method<T>(receiver: &Arc<T>, method: fn(&T, &Args) -> R) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            thunk: Thunk::method(receiver, method),
            trackers: vec![downgrade_any(receiver)],
        }
    }

    /// Bind a shared callable object, tracking its lifetime.
    pub fn callable<C>(callable: &Arc<C>) -> Self
    where
        C: Fn(&Args) -> R + Send + Sync + 'static,
    {
        Self {
            thunk: Thunk::callable(callable),
            trackers: vec![downgrade_any(callable)],
        }
    }

    /// Bind a closure owned by the slot itself. Nothing is tracked.
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&Args) -> R + Send + Sync + 'static,
    {
        Thunk::closure(f).into()
    }

    /// Add a lifetime observation on `target`.
    ///
    /// Returns `self` for chaining. The slot holds no ownership of `target`;
    /// once the last strong reference elsewhere is dropped, the slot reports
    /// [`is_expired`](Slot::is_expired) and invocation fails.
    pub fn track<T>(mut self, target: &Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.trackers.push(downgrade_any(target));
        self
    }

    /// Add a lifetime observation from an existing weak handle.
    pub fn track_weak(mut self, target: Weak<dyn Any + Send + Sync>) -> Self {
        self.trackers.push(target);
        self
    }

    /// Copy every lifetime dependency of another slot.
    ///
    /// Afterwards this slot is alive only if everything `other` depended on
    /// is also alive.
    pub fn track_slot<A, O>(mut self, other: &Slot<A, O>) -> Self {
        self.trackers.extend(other.trackers.iter().cloned());
        self
    }

    /// Depend on another signal's lifetime.
    ///
    /// The observation expires when `signal` is dropped.
    pub fn track_signal<A: Send + 'static, O: 'static>(mut self, signal: &Signal<A, O>) -> Self {
        self.trackers.push(signal.block_tracker());
        self
    }

    /// Whether any tracked owner has been destroyed.
    pub fn is_expired(&self) -> bool {
        self.trackers.iter().any(|w| w.strong_count() == 0)
    }

    /// The identity of the embedded thunk.
    pub fn key(&self) -> ThunkKey {
        self.thunk.key()
    }

    /// The embedded thunk.
    pub fn thunk(&self) -> &Thunk<Args, R> {
        &self.thunk
    }

    /// Invoke the subscription.
    ///
    /// Every tracker is upgraded to a strong hold first; the holds are kept
    /// until the callable returns, then released.
    ///
    /// # Errors
    ///
    /// - [`SignalError::ExpiredSlot`] if any tracked owner is gone
    /// - [`SignalError::BadThunk`] if the thunk was built from an empty one
    pub fn invoke(&self, args: &Args) -> Result<R> {
        let mut holds = Vec::with_capacity(self.trackers.len());
        for tracker in &self.trackers {
            match tracker.upgrade() {
                Some(strong) => holds.push(strong),
                None => return Err(SignalError::ExpiredSlot),
            }
        }
        let result = self.thunk.invoke(args);
        drop(holds);
        result
    }
}

fn downgrade_any<T: Send + Sync + 'static>(strong: &Arc<T>) -> Weak<dyn Any + Send + Sync> {
    let strong: Arc<dyn Any + Send + Sync> = strong.clone();
    let weak: Weak<dyn Any + Send + Sync> = Arc::downgrade(&strong);
    weak
}

impl<Args: 'static, R: 'static> From<Thunk<Args, R>> for Slot<Args, R> {
    fn from(thunk: Thunk<Args, R>) -> Self {
        debug_assert!(!thunk.is_empty(), "slot requires a bound thunk");
        Self {
            thunk,
            trackers: Vec::new(),
        }
    }
}

impl<Args, R> Clone for Slot<Args, R> {
    fn clone(&self) -> Self {
        Self {
            thunk: self.thunk.clone(),
            trackers: self.trackers.clone(),
        }
    }
}

impl<Args, R> PartialEq for Slot<Args, R> {
    fn eq(&self, other: &Self) -> bool {
        self.thunk == other.thunk
    }
}

impl<Args, R> Eq for Slot<Args, R> {}

impl<Args, R> PartialOrd for Slot<Args, R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Args, R> Ord for Slot<Args, R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.thunk.cmp(&other.thunk)
    }
}

impl<Args, R> fmt::Debug for Slot<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("thunk", &self.thunk)
            .field("trackers", &self.trackers.len())
            .finish()
    }
}
