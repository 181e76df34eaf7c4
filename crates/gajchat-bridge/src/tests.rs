//! Tests for the background loop, dispatcher and stream cursor.

use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn start() -> (BackgroundLoop, Dispatcher) {
    let bg = BackgroundLoop::start("gajchat-test-loop").unwrap();
    let dispatcher = Dispatcher::new(bg.handle());
    (bg, dispatcher)
}

#[test]
fn test_run_returns_value() {
    let (_bg, dispatcher) = start();
    let v = dispatcher.run(async { 40 + 2 }).unwrap();
    assert_eq!(v, 42);
}

#[test]
fn test_run_passes_work_errors_through() {
    let (_bg, dispatcher) = start();
    let ok: Result<u8, String> = dispatcher.run(async { Ok(1) }).unwrap();
    let err: Result<u8, String> = dispatcher.run(async { Err("provider down".to_string()) }).unwrap();
    assert_eq!(ok, Ok(1));
    assert_eq!(err, Err("provider down".to_string()));
}

#[test]
fn test_sequential_dispatches_return_in_issuance_order() {
    let (_bg, dispatcher) = start();
    let mut seen = Vec::new();
    for i in 0..20u64 {
        // Later items finish faster; order must still follow issuance.
        let v = dispatcher
            .run(async move {
                tokio::time::sleep(Duration::from_millis(20 - i)).await;
                i
            })
            .unwrap();
        seen.push(v);
    }
    assert_eq!(seen, (0..20).collect::<Vec<_>>());
}

#[test]
fn test_concurrent_callers_get_their_own_results() {
    let (_bg, dispatcher) = start();
    let threads: Vec<_> = (0..8u64)
        .map(|t| {
            let d = dispatcher.clone();
            std::thread::spawn(move || {
                (0..10u64)
                    .map(|i| {
                        d.run(async move {
                            tokio::task::yield_now().await;
                            t * 100 + i
                        })
                        .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for (t, handle) in threads.into_iter().enumerate() {
        let got = handle.join().unwrap();
        let want: Vec<u64> = (0..10).map(|i| t as u64 * 100 + i).collect();
        assert_eq!(got, want);
    }
}

#[test]
fn test_dispatch_after_stop_fails_fast() {
    let (bg, dispatcher) = start();
    bg.stop();
    assert!(!bg.is_running());
    let started = Instant::now();
    let err = dispatcher.run(async { 1 }).unwrap_err();
    assert!(matches!(err, BridgeError::LoopUnavailable));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_stop_twice_is_noop() {
    let (bg, _dispatcher) = start();
    bg.stop();
    bg.stop();
    assert!(!bg.is_running());
}

#[test]
fn test_timeout_releases_caller_and_cancels_work() {
    let (_bg, dispatcher) = start();
    let completed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&completed);

    let err = dispatcher
        .run_timeout(
            async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                flag.store(true, Ordering::SeqCst);
            },
            Duration::from_millis(30),
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::Timeout(d) if d == Duration::from_millis(30)));

    std::thread::sleep(Duration::from_millis(500));
    assert!(!completed.load(Ordering::SeqCst), "timed-out work kept running");
    // Loop is still healthy.
    assert_eq!(dispatcher.run(async { 7 }).unwrap(), 7);
}

#[test]
fn test_default_timeout_applies_to_run() {
    let (_bg, dispatcher) = start();
    let dispatcher = dispatcher.with_default_timeout(Some(Duration::from_millis(20)));
    let err = dispatcher
        .run(async { tokio::time::sleep(Duration::from_secs(5)).await })
        .unwrap_err();
    assert!(matches!(err, BridgeError::Timeout(_)));
}

#[test]
fn test_dropping_pending_result_cancels_work() {
    let (_bg, dispatcher) = start();
    let completed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&completed);
    let pending = dispatcher
        .submit(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();
    drop(pending);
    std::thread::sleep(Duration::from_millis(400));
    assert!(!completed.load(Ordering::SeqCst));
}

#[test]
fn test_panic_in_work_is_reported_and_loop_survives() {
    let (bg, dispatcher) = start();
    let err = dispatcher
        .run(async {
            if true {
                panic!("tool exploded");
            }
        })
        .unwrap_err();
    match err {
        BridgeError::WorkPanicked(msg) => assert!(msg.contains("tool exploded")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(bg.is_running());
    assert_eq!(dispatcher.run(async { "still here" }).unwrap(), "still here");
}

#[test]
fn test_pending_in_flight_when_loop_stops_is_released() {
    let (bg, dispatcher) = start();
    let pending = dispatcher
        .submit(async { tokio::time::sleep(Duration::from_secs(30)).await })
        .unwrap();
    let waiter = std::thread::spawn(move || pending.wait());
    std::thread::sleep(Duration::from_millis(50));
    bg.stop();
    let result = waiter.join().unwrap();
    assert!(matches!(result, Err(BridgeError::LoopUnavailable)));
}

#[test]
fn test_stop_from_loop_thread_does_not_deadlock() {
    let bg = Arc::new(BackgroundLoop::start("gajchat-test-self-stop").unwrap());
    let dispatcher = Dispatcher::new(bg.handle());
    let inner = Arc::clone(&bg);
    let result = dispatcher.run_timeout(
        async move {
            inner.stop();
        },
        Duration::from_secs(2),
    );
    assert!(!matches!(result, Err(BridgeError::Timeout(_))));
    let deadline = Instant::now() + Duration::from_secs(2);
    while bg.is_running() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!bg.is_running());
}

#[test]
fn test_drain_yields_all_items_in_order_then_ends() {
    let (_bg, dispatcher) = start();
    let stream = async_stream::stream! {
        for i in 0..50u32 {
            if i % 7 == 0 {
                tokio::task::yield_now().await;
            }
            yield i;
        }
    };
    let mut cursor = dispatcher.drain(stream).unwrap();
    let items: Vec<u32> = cursor.by_ref().map(|r| r.unwrap()).collect();
    assert_eq!(items, (0..50).collect::<Vec<_>>());
    assert_eq!(cursor.yielded(), 50);
    assert!(cursor.is_exhausted());
    assert!(cursor.next().is_none());
}

#[test]
fn test_drain_empty_stream() {
    let (_bg, dispatcher) = start();
    let cursor = dispatcher.drain(futures_util::stream::empty::<u8>()).unwrap();
    assert_eq!(cursor.count(), 0);
}

#[test]
fn test_drain_with_larger_buffer_keeps_order() {
    let (_bg, dispatcher) = start();
    let dispatcher = dispatcher.with_stream_buffer(16);
    let cursor = dispatcher
        .drain(futures_util::stream::iter(vec!["a", "b", "c"]))
        .unwrap();
    let items: Vec<_> = cursor.map(|r| r.unwrap()).collect();
    assert_eq!(items, vec!["a", "b", "c"]);
}

#[test]
fn test_drain_fallible_stream_surfaces_error_at_failing_item() {
    let (_bg, dispatcher) = start();
    let stream = futures_util::stream::iter(vec![Ok(1), Ok(2), Err("boom"), Ok(4)]);
    let items: Vec<Result<i32, &str>> = dispatcher
        .drain(stream)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(items, vec![Ok(1), Ok(2), Err("boom"), Ok(4)]);
}

#[test]
fn test_drain_panic_mid_stream_fuses_cursor() {
    let (_bg, dispatcher) = start();
    let stream = async_stream::stream! {
        yield 1;
        yield 2;
        panic!("generator failed");
    };
    let mut cursor = dispatcher.drain(stream).unwrap();
    assert_eq!(cursor.next().unwrap().unwrap(), 1);
    assert_eq!(cursor.next().unwrap().unwrap(), 2);
    match cursor.next() {
        Some(Err(BridgeError::WorkPanicked(msg))) => assert!(msg.contains("generator failed")),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(cursor.next().is_none());
}

#[test]
fn test_dropping_cursor_early_stops_producer() {
    let (_bg, dispatcher) = start();
    let produced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&produced);
    let stream = async_stream::stream! {
        loop {
            counter.fetch_add(1, Ordering::SeqCst);
            yield ();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    };

    let cursor = dispatcher.drain(stream).unwrap();
    let taken = cursor.take(3).filter(|r| r.is_ok()).count();
    assert_eq!(taken, 3);

    std::thread::sleep(Duration::from_millis(50));
    let after_drop = produced.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(produced.load(Ordering::SeqCst), after_drop);
    // Bounded channel: producer never ran far ahead of the consumer.
    assert!(after_drop <= 6, "producer ran ahead: {after_drop}");
    assert_eq!(dispatcher.run(async { 1 }).unwrap(), 1);
}

#[test]
fn test_cursor_reports_loop_unavailable_when_loop_stops_mid_stream() {
    let (bg, dispatcher) = start();
    let stream = async_stream::stream! {
        yield 1u8;
        futures_util::future::pending::<()>().await;
        yield 2u8;
    };
    let cursor = dispatcher.drain(stream).unwrap();
    let consumer = std::thread::spawn(move || cursor.collect::<Vec<_>>());
    std::thread::sleep(Duration::from_millis(100));
    bg.stop();

    let results = consumer.join().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(*results[0].as_ref().unwrap(), 1);
    assert!(matches!(results[1], Err(BridgeError::LoopUnavailable)));
}

#[test]
fn test_drain_after_stop_fails_fast() {
    let (bg, dispatcher) = start();
    bg.stop();
    let err = dispatcher
        .drain(futures_util::stream::iter(vec![1]))
        .unwrap_err();
    assert!(matches!(err, BridgeError::LoopUnavailable));
}
