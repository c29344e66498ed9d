use chunkwise::{Interrupt, PoolError, PoolState, TaskError, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_map_preserves_order() {
    for threads in 1..=6 {
        let pool = WorkerPool::new(threads).unwrap();
        for len in [1usize, 2, 5, 17, 64] {
            let inputs: Vec<usize> = (0..len).collect();
            let results = pool.map(|x| x, inputs.clone()).unwrap();
            assert_eq!(results, inputs, "threads={} len={}", threads, len);
        }
    }
}

#[test]
fn test_map_order_survives_uneven_task_times() {
    let pool = WorkerPool::new(4).unwrap();
    let inputs: Vec<u64> = (0..16).collect();

    // Early inputs take longest, so they finish last
    let results = pool
        .map(
            |x: u64| {
                thread::sleep(Duration::from_millis(16 - x));
                x * 10
            },
            inputs,
        )
        .unwrap();

    assert_eq!(results, (0..16).map(|x| x * 10).collect::<Vec<_>>());
}

#[test]
fn test_empty_input_returns_immediately() {
    let pool = WorkerPool::new(2).unwrap();
    let results: Vec<i32> = pool.map(|x: i32| x, Vec::new()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_zero_threads_is_invalid_configuration() {
    assert!(matches!(
        WorkerPool::new(0),
        Err(PoolError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_single_failure_is_primary() {
    let pool = WorkerPool::new(3).unwrap();
    let err = pool
        .map(
            |x: i32| {
                if x == 3 {
                    panic!("bad input {}", x);
                }
                x
            },
            (0..10).collect(),
        )
        .unwrap_err();

    let failure = err.task_failure().expect("task failure");
    assert_eq!(failure.index(), 3);
    assert!(failure.suppressed().is_empty());
    match failure.error() {
        TaskError::Panicked(message) => assert_eq!(message, "bad input 3"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_every_failure_is_kept() {
    let pool = WorkerPool::new(4).unwrap();
    let err = pool
        .try_map(
            |x: i32| {
                if x % 2 == 1 {
                    anyhow::bail!("odd value {}", x);
                }
                Ok(x)
            },
            (0..10).collect(),
        )
        .unwrap_err();

    let failure = err.task_failure().expect("task failure");
    assert_eq!(failure.suppressed().len(), 4);

    let mut indices: Vec<usize> = failure
        .suppressed()
        .iter()
        .map(|f| f.index())
        .chain(std::iter::once(failure.index()))
        .collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![1, 3, 5, 7, 9]);
}

#[test]
fn test_failure_waits_for_every_task() {
    let pool = WorkerPool::new(2).unwrap();
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&finished);

    let result = pool.try_map(
        move |x: u64| {
            if x == 0 {
                anyhow::bail!("first task fails");
            }
            thread::sleep(Duration::from_millis(5));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(x)
        },
        (0..8).collect(),
    );

    assert!(result.is_err());
    assert_eq!(finished.load(Ordering::SeqCst), 7);
}

#[test]
fn test_pool_shared_between_submitters() {
    let pool = Arc::new(WorkerPool::new(3).unwrap());

    let submitters: Vec<_> = (0..4u64)
        .map(|s| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let inputs: Vec<u64> = (0..50).map(|i| i + s * 1000).collect();
                let results = pool.map(|x| x + 1, inputs.clone()).unwrap();
                results == inputs.iter().map(|x| x + 1).collect::<Vec<_>>()
            })
        })
        .collect();

    for submitter in submitters {
        assert!(submitter.join().unwrap());
    }
}

#[test]
fn test_close_twice_and_reject_after_close() {
    let pool = WorkerPool::new(2).unwrap();
    pool.close();
    pool.close();
    assert_eq!(pool.state(), PoolState::Terminated);

    let start = Instant::now();
    let err = pool.map(|x: i32| x, vec![1, 2, 3]).unwrap_err();
    assert!(matches!(err, PoolError::ShutDown));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_close_releases_waiting_submitter() {
    let pool = Arc::new(WorkerPool::new(1).unwrap());

    let submitter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            pool.map(
                |x: u64| {
                    thread::sleep(Duration::from_millis(50));
                    x
                },
                (0..20).collect(),
            )
        })
    };

    thread::sleep(Duration::from_millis(20));
    pool.close();

    let result = submitter.join().unwrap();
    assert!(matches!(result, Err(PoolError::ShutDown)));
}

#[test]
fn test_interrupt_returns_promptly() {
    let pool = WorkerPool::new(2).unwrap();
    let interrupt = Interrupt::new();
    let ran = Arc::new(AtomicUsize::new(0));

    let trigger = interrupt.clone();
    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        trigger.trigger();
    });

    let counter = Arc::clone(&ran);
    let start = Instant::now();
    let result = pool.try_map_interruptible(
        move |x: u64| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(100));
            Ok::<_, anyhow::Error>(x)
        },
        (0..40).collect(),
        &interrupt,
    );
    interrupter.join().unwrap();

    // 40 tasks on 2 threads would take two seconds
    assert!(matches!(result, Err(PoolError::Interrupted)));
    assert!(start.elapsed() < Duration::from_millis(1000));

    // Abandoned tasks are skipped and the workers stay usable
    let results = pool.map(|x: u64| x * 2, vec![1, 2, 3]).unwrap();
    assert_eq!(results, vec![2, 4, 6]);
    assert!(ran.load(Ordering::SeqCst) < 40);

    pool.close();
    assert_eq!(pool.state(), PoolState::Terminated);
}

#[test]
fn test_already_triggered_interrupt_submits_nothing() {
    let pool = WorkerPool::new(2).unwrap();
    let interrupt = Interrupt::new();
    interrupt.trigger();

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    let result = pool.try_map_interruptible(
        move |x: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(x)
        },
        vec![1, 2, 3],
        &interrupt,
    );

    assert!(result.unwrap_err().is_interrupted());
    pool.close();
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}
