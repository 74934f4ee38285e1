//! Event dispatch core for Candela.
//!
//! This crate provides a generic, thread-safe, type-erased signal/slot
//! primitive: producers notify subscribers - free functions, bound methods,
//! callable objects, closures - without either side knowing the other's
//! concrete type, and a subscriber whose owning object has been destroyed is
//! never invoked.
//!
//! - **Signal**: the owning pub/sub endpoint, one per distinct event kind
//! - **Slot**: a stored subscription plus the lifetimes it depends on
//! - **Thunk**: the type-erased callable reference with a sortable identity
//! - **Connection / ScopedConnection**: handles to query or undo a
//!   subscription, with optional RAII disconnection
//!
//! # Dispatch Example
//!
//! ```
//! use candela_dispatch::Signal;
//!
//! // One signal per event kind; the payload is any Send type.
//! let key_pressed = Signal::<u32>::new();
//!
//! // Connect a slot (closure)
//! let conn = key_pressed.connect(|code| {
//!     println!("key pressed: {code}");
//! });
//!
//! // Immediate fan-out
//! key_pressed.emit(17).unwrap();
//!
//! // Deferred: enqueue now, deliver at the next flush (e.g. once per frame)
//! key_pressed.post(18);
//! key_pressed.post(19);
//! key_pressed.flush().unwrap();
//!
//! // Disconnect when done
//! conn.disconnect();
//! ```
//!
//! # Lifetime Tracking Example
//!
//! ```
//! use std::sync::Arc;
//! use candela_dispatch::{Signal, SignalError};
//!
//! struct Camera;
//!
//! impl Camera {
//!     fn on_scroll(&self, delta: &f32) {
//!         let _ = delta;
//!     }
//! }
//!
//! let scrolled = Signal::<f32>::new();
//! let camera = Arc::new(Camera);
//!
//! // Bound methods track their receiver automatically.
//! scrolled.connect_method(&camera, Camera::on_scroll);
//! scrolled.emit(1.5).unwrap();
//!
//! // Dropping the receiver without disconnecting is a lifecycle bug;
//! // the next emit surfaces it instead of invoking a dead subscriber.
//! drop(camera);
//! assert_eq!(scrolled.emit(1.5), Err(SignalError::ExpiredSlot));
//! ```
//!
//! # Collecting Results
//!
//! ```
//! use candela_dispatch::Signal;
//!
//! // Slots may return a value; `accumulate` threads each result through a
//! // collector instead of discarding it.
//! let veto = Signal::<String, bool>::new();
//! veto.connect(|_| true);
//! veto.connect(|name| !name.is_empty());
//!
//! let mut all_agree = true;
//! veto.accumulate(|ok| all_agree &= ok, "save".to_string()).unwrap();
//! assert!(all_agree);
//! ```

pub mod connection;
mod error;
pub mod logging;
pub mod signal;
pub mod slot;
pub mod thunk;

pub use connection::{Connection, ScopedConnection};
pub use error::{Result, SignalError};
pub use signal::Signal;
pub use slot::Slot;
pub use thunk::{Thunk, ThunkKey};
