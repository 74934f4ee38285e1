//! Type-erased callable references.
//!
//! A [`Thunk`] refers to a callable - a free function, a method bound to a
//! shared receiver, a shared callable object, or a closure - behind one
//! uniform call convention, without owning the thing it points at. Every
//! thunk carries a 128-bit [`ThunkKey`] identity used for equality and for
//! deterministic sorted storage in a signal's slot table.
//!
//! # Key Types
//!
//! - [`Thunk<Args, R>`] - the erased callable, invoked with `&Args`, returns `R`
//! - [`ThunkKey`] - packed `(owner, callee)` address pair identifying a thunk
//!
//! # Related Modules
//!
//! - [`crate::slot`] - pairs a thunk with lifetime trackers
//! - [`crate::signal`] - stores slots sorted by thunk key

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use static_assertions::const_assert_eq;

use crate::error::{Result, SignalError};

/// Packed identity of a bound callable: an `(owner, callee)` address pair.
///
/// The `owner` half is the address of the instance a callable is bound to
/// (or the function address itself for free functions); the `callee` half
/// distinguishes different methods bound to the same instance, and is zero
/// otherwise. Together they form a 128-bit value with a total order, so slot
/// tables can be kept sorted and searched with binary search, and all entries
/// belonging to one owner form a contiguous range.
///
/// Ordering is over raw address values, not semantic identity of the bound
/// callable; it is deterministic within a process but carries no meaning
/// across runs.
///
/// A default-constructed key is the zero value and identifies an empty thunk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ThunkKey {
    owner: u64,
    callee: u64,
}

const_assert_eq!(std::mem::size_of::<ThunkKey>(), 16);

impl ThunkKey {
    pub(crate) fn new(owner: usize, callee: usize) -> Self {
        Self {
            owner: owner as u64,
            callee: callee as u64,
        }
    }

    /// Whether this is the zero key of an empty thunk.
    pub fn is_empty(&self) -> bool {
        self.owner == 0 && self.callee == 0
    }

    /// The owner-address half of the key.
    pub fn owner(&self) -> u64 {
        self.owner
    }

    /// Compare against a bare owner address, ignoring the callee half.
    ///
    /// Because keys order by `(owner, callee)`, this comparison locates the
    /// contiguous range of every key bound to `owner`.
    pub fn cmp_owner(&self, owner: u64) -> Ordering {
        self.owner.cmp(&owner)
    }
}

impl Ord for ThunkKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.owner
            .cmp(&other.owner)
            .then(self.callee.cmp(&other.callee))
    }
}

impl PartialOrd for ThunkKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for ThunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThunkKey({:#x}, {:#x})", self.owner, self.callee)
    }
}

/// The erased call itself. Bound variants report a dead receiver as `None`.
enum ThunkCall<Args, R> {
    Empty,
    Function(fn(&Args) -> R),
    Bound(Arc<dyn Fn(&Args) -> Option<R> + Send + Sync>),
    Owned(Arc<dyn Fn(&Args) -> R + Send + Sync>),
}

impl<Args, R> Clone for ThunkCall<Args, R> {
    fn clone(&self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Function(f) => Self::Function(*f),
            Self::Bound(f) => Self::Bound(f.clone()),
            Self::Owned(f) => Self::Owned(f.clone()),
        }
    }
}

/// A type-erased callable reference with value semantics.
///
/// A `Thunk<Args, R>` behaves, when invoked with `&Args`, as calling the
/// underlying free function, bound method, or callable object, returning `R`.
/// It never owns a bound instance: methods and shared callables hold their
/// receiver weakly, and invocation fails with [`SignalError::ExpiredSlot`]
/// once the receiver is gone. Closures passed by value are the one exception;
/// the thunk itself owns them.
///
/// Thunks are cheap to clone and compare, equal, and order by their
/// [`ThunkKey`] alone.
///
/// # Example
///
/// ```
/// use candela_dispatch::Thunk;
///
/// fn shout(msg: &String) {
///     println!("{}!", msg);
/// }
///
/// let thunk = Thunk::function(shout);
/// thunk.invoke(&"hello".to_string()).unwrap();
/// ```
pub struct Thunk<Args, R = ()> {
    key: ThunkKey,
    call: ThunkCall<Args, R>,
}

impl<Args: 'static, R: 'static> Thunk<Args, R> {
    /// Bind a free function pointer.
    pub fn function(f: fn(&Args) -> R) -> Self {
        Self {
            key: ThunkKey::new(f as usize, 0),
            call: ThunkCall::Function(f),
        }
    }

    /// Bind a method to a shared receiver.
    ///
    /// The receiver is held weakly; invoking the thunk after the last strong
    /// reference to it is dropped fails with [`SignalError::ExpiredSlot`].
    pub fn method<T>(receiver: &Arc<T>, method: fn(&T, &Args) -> R) -> Self
    where
        T: Send + Sync + 'static,
    {
        let key = ThunkKey::new(Arc::as_ptr(receiver) as usize, method as usize);
        let weak = Arc::downgrade(receiver);
        Self {
            key,
            call: ThunkCall::Bound(Arc::new(move |args: &Args| {
                weak.upgrade().map(|receiver| method(&receiver, args))
            })),
        }
    }

    /// Bind a shared callable object.
    ///
    /// Like [`Thunk::method`], the callable is held weakly and expires with
    /// its last strong reference.
    pub fn callable<C>(callable: &Arc<C>) -> Self
    where
        C: Fn(&Args) -> R + Send + Sync + 'static,
    {
        let key = ThunkKey::new(Arc::as_ptr(callable) as usize, 0);
        let weak = Arc::downgrade(callable);
        Self {
            key,
            call: ThunkCall::Bound(Arc::new(move |args: &Args| {
                weak.upgrade().map(|callable| callable(args))
            })),
        }
    }

    /// Bind a closure owned by the thunk itself.
    ///
    /// The closure lives as long as the thunk (and any slot holding it);
    /// there is no receiver to expire.
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&Args) -> R + Send + Sync + 'static,
    {
        let owned: Arc<dyn Fn(&Args) -> R + Send + Sync> = Arc::new(f);
        let key = ThunkKey::new(Arc::as_ptr(&owned) as *const () as usize, 0);
        Self {
            key,
            call: ThunkCall::Owned(owned),
        }
    }

    /// The packed identity of this thunk.
    pub fn key(&self) -> ThunkKey {
        self.key
    }

    /// Whether this thunk is default-constructed and unbound.
    pub fn is_empty(&self) -> bool {
        matches!(self.call, ThunkCall::Empty)
    }

    /// Invoke the underlying callable.
    ///
    /// # Errors
    ///
    /// - [`SignalError::BadThunk`] if the thunk is empty
    /// - [`SignalError::ExpiredSlot`] if a weakly-held receiver is gone
    pub fn invoke(&self, args: &Args) -> Result<R> {
        match &self.call {
            ThunkCall::Empty => Err(SignalError::BadThunk),
            ThunkCall::Function(f) => Ok(f(args)),
            ThunkCall::Owned(f) => Ok(f(args)),
            ThunkCall::Bound(f) => f(args).ok_or(SignalError::ExpiredSlot),
        }
    }
}

impl<Args, R> Clone for Thunk<Args, R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            call: self.call.clone(),
        }
    }
}

impl<Args, R> Default for Thunk<Args, R> {
    fn default() -> Self {
        Self {
            key: ThunkKey::default(),
            call: ThunkCall::Empty,
        }
    }
}

impl<Args, R> PartialEq for Thunk<Args, R> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<Args, R> Eq for Thunk<Args, R> {}

impl<Args, R> PartialOrd for Thunk<Args, R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Args, R> Ord for Thunk<Args, R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl<Args, R> fmt::Debug for Thunk<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.call {
            ThunkCall::Empty => "empty",
            ThunkCall::Function(_) => "function",
            ThunkCall::Bound(_) => "bound",
            ThunkCall::Owned(_) => "owned",
        };
        f.debug_struct("Thunk")
            .field("key", &self.key)
            .field("kind", &kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering as AtomicOrdering};

    fn bump(n: &i32) {
        let _ = n;
    }

    fn other(n: &i32) {
        let _ = n;
    }

    #[test]
    fn test_empty_thunk_is_bad() {
        let thunk = Thunk::<i32>::default();
        assert!(thunk.is_empty());
        assert!(thunk.key().is_empty());
        assert_eq!(thunk.invoke(&1), Err(SignalError::BadThunk));
    }

    #[test]
    fn test_function_identity() {
        let a = Thunk::function(bump);
        let b = Thunk::function(bump);
        let c = Thunk::function(other);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.key().is_empty());
    }

    #[test]
    fn test_method_invocation() {
        struct Counter {
            hits: AtomicI32,
        }

        impl Counter {
            fn record(&self, n: &i32) {
                self.hits.fetch_add(*n, AtomicOrdering::SeqCst);
            }
        }

        let counter = Arc::new(Counter {
            hits: AtomicI32::new(0),
        });
        let thunk = Thunk::method(&counter, Counter::record);

        thunk.invoke(&5).unwrap();
        assert_eq!(counter.hits.load(AtomicOrdering::SeqCst), 5);
    }

    #[test]
    fn test_method_expires_with_receiver() {
        struct Receiver;

        impl Receiver {
            fn on_event(&self, _n: &i32) {}
        }

        let receiver = Arc::new(Receiver);
        let thunk = Thunk::method(&receiver, Receiver::on_event);

        assert!(thunk.invoke(&1).is_ok());
        drop(receiver);
        assert_eq!(thunk.invoke(&1), Err(SignalError::ExpiredSlot));
    }

    #[test]
    fn test_methods_share_owner_half() {
        struct Widget;

        impl Widget {
            fn shown(&self, _n: &i32) {}
            fn hidden(&self, _n: &i32) {}
        }

        let widget = Arc::new(Widget);
        let a = Thunk::method(&widget, Widget::shown);
        let b = Thunk::method(&widget, Widget::hidden);

        assert_ne!(a, b);
        assert_eq!(a.key().owner(), b.key().owner());
        assert_eq!(
            a.key().cmp_owner(b.key().owner()),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn test_closure_returns_value() {
        let thunk = Thunk::closure(|n: &i32| n * 2);
        assert_eq!(thunk.invoke(&21), Ok(42));
    }

    #[test]
    fn test_key_order_groups_owner() {
        let low = ThunkKey::new(1, 9);
        let mid = ThunkKey::new(2, 0);
        let high = ThunkKey::new(2, 1);

        assert!(low < mid);
        assert!(mid < high);
        assert_eq!(mid.cmp_owner(2), std::cmp::Ordering::Equal);
        assert_eq!(low.cmp_owner(2), std::cmp::Ordering::Less);
    }
}
