//! End-to-end tests of the public dispatch surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use parking_lot::Mutex;

use candela_dispatch::{Connection, ScopedConnection, Signal, SignalError, Slot};

static INC_HITS: AtomicI32 = AtomicI32::new(0);
static DOUBLE_SUM: AtomicI32 = AtomicI32::new(0);

fn inc(_: &i32) {
    INC_HITS.fetch_add(1, Ordering::SeqCst);
}

fn double_it(n: &i32) {
    DOUBLE_SUM.fetch_add(*n, Ordering::SeqCst);
}

#[test]
fn test_free_function_fanout_then_disconnect_all() {
    let signal = Signal::<i32>::new();
    signal.connect_fn(inc);
    signal.connect_fn(double_it);

    signal.emit(5).unwrap();
    assert_eq!(INC_HITS.load(Ordering::SeqCst), 1);
    assert_eq!(DOUBLE_SUM.load(Ordering::SeqCst), 5);

    signal.disconnect_all();
    signal.emit(5).unwrap();

    // Both counters unchanged after disconnect_all.
    assert_eq!(INC_HITS.load(Ordering::SeqCst), 1);
    assert_eq!(DOUBLE_SUM.load(Ordering::SeqCst), 5);
}

#[test]
fn test_each_subscriber_sees_posted_events_in_order() {
    let signal = Signal::<i32>::new();

    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));

    for log in [&first, &second] {
        let log = log.clone();
        signal.connect(move |&n| log.lock().push(n));
    }

    signal.post(1);
    signal.post(2);
    signal.post(3);
    assert_eq!(signal.flush().unwrap(), 3);

    assert_eq!(*first.lock(), vec![1, 2, 3]);
    assert_eq!(*second.lock(), vec![1, 2, 3]);
}

#[test]
fn test_tracked_owner_destruction_surfaces_as_expired() {
    struct Hud {
        redraws: AtomicUsize,
    }

    impl Hud {
        fn on_frame(&self, _dt: &f32) {
            self.redraws.fetch_add(1, Ordering::SeqCst);
        }
    }

    let frame = Signal::<f32>::new();
    let hud = Arc::new(Hud {
        redraws: AtomicUsize::new(0),
    });

    frame.connect_method(&hud, Hud::on_frame);
    frame.emit(0.016).unwrap();
    assert_eq!(hud.redraws.load(Ordering::SeqCst), 1);

    // Keep a weak probe so we can confirm the drop below actually freed it.
    let probe = Arc::downgrade(&hud);
    drop(hud);
    assert!(probe.upgrade().is_none());

    assert_eq!(frame.emit(0.016), Err(SignalError::ExpiredSlot));
}

#[test]
fn test_explicit_tracker_on_closure_slot() {
    struct Document;

    let saved = Signal::<u32>::new();
    let document = Arc::new(Document);
    let notified = Arc::new(AtomicUsize::new(0));

    let notified_clone = notified.clone();
    saved.connect_slot(
        Slot::closure(move |_: &u32| {
            notified_clone.fetch_add(1, Ordering::SeqCst);
        })
        .track(&document),
    );

    saved.emit(1).unwrap();
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    drop(document);
    assert_eq!(saved.emit(2), Err(SignalError::ExpiredSlot));
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[test]
fn test_accumulate_counts_live_slots() {
    let sizes = Signal::<(), usize>::new();
    sizes.connect(|_| 10);
    sizes.connect(|_| 20);
    sizes.connect(|_| 30);

    let mut calls = 0;
    let mut total = 0;
    sizes
        .accumulate(
            |n| {
                calls += 1;
                total += n;
            },
            (),
        )
        .unwrap();

    assert_eq!(calls, sizes.connection_count());
    assert_eq!(total, 60);
}

#[test]
fn test_scoped_connection_lifecycle() {
    let signal = Signal::<i32>::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let hits_clone = hits.clone();
    let guard: ScopedConnection<i32> = signal
        .connect(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        })
        .into();

    signal.emit(1).unwrap();
    drop(guard);
    signal.emit(2).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Default guards drop without effect.
    let empty = ScopedConnection::<i32>::default();
    drop(empty);
}

#[test]
fn test_connection_states_flow_one_way() {
    // unconnected -> connected -> disconnected, disconnected is terminal.
    let unconnected = Connection::<i32>::default();
    assert!(!unconnected.is_connected());

    let signal = Signal::<i32>::new();
    let conn = signal.connect(|_| {});
    assert!(conn.is_connected());

    assert!(conn.disconnect());
    assert!(!conn.is_connected());
    assert!(!conn.disconnect());
}

#[test]
fn test_per_frame_coalescing_loop() {
    // The intended post/flush usage: producers enqueue during a frame, the
    // frame loop drains once.
    let input = Signal::<(i32, i32)>::new();
    let positions = Arc::new(Mutex::new(Vec::new()));

    let positions_clone = positions.clone();
    input.connect(move |&(x, y)| positions_clone.lock().push(x + y));

    for frame in 0..3 {
        input.post((frame, 10));
        input.post((frame, 20));
        assert_eq!(input.flush().unwrap(), 2);
    }

    assert_eq!(*positions.lock(), vec![10, 20, 11, 21, 12, 22]);
    assert_eq!(input.pending_count(), 0);
}

#[test]
fn test_cross_thread_producers_single_flusher() {
    let events = Arc::new(Signal::<usize>::new());
    let seen = Arc::new(AtomicUsize::new(0));

    let seen_clone = seen.clone();
    events.connect(move |_| {
        seen_clone.fetch_add(1, Ordering::SeqCst);
    });

    let mut producers = vec![];
    for _ in 0..4 {
        let events = events.clone();
        producers.push(std::thread::spawn(move || {
            for i in 0..100 {
                events.post(i);
            }
        }));
    }
    for p in producers {
        p.join().unwrap();
    }

    assert_eq!(events.flush().unwrap(), 400);
    assert_eq!(seen.load(Ordering::SeqCst), 400);
}
