use kairos::time::delay_millis;
use kairos::{Error, TaskError};

use std::sync::Arc;
use std::time::{Duration, Instant};

fn explode() -> u32 {
    panic!("boom");
}

#[test]
fn failing_task_stops_the_whole_loop() {
    let start = Instant::now();

    let err = kairos::run_blocking(|scope| async move {
        scope.launch(async {
            delay_millis(10_000).await;
        });
        scope.launch(async {
            delay_millis(50).await;
            explode()
        });
    })
    .unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(2));
    match err {
        Error::Task(TaskError::Failed { message, .. }) => assert_eq!(message, "boom"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failing_root_is_returned() {
    let err = kairos::run_blocking(|_| async { explode() }).unwrap_err();

    assert!(err.to_string().ends_with("failed: boom"), "{err}");
}

#[test]
fn awaiters_observe_the_failure() {
    let observed = Arc::new(parking_lot::Mutex::new(None));
    let slot = observed.clone();

    let err = kairos::run_blocking(move |scope| async move {
        let compute = scope.dispatchers().compute().clone();
        let task = scope.launch_on(&compute, async { explode() }).unwrap();

        let result = task.clone().await;
        *slot.lock() = Some(result);
    })
    .unwrap_err();

    let observed = observed.lock().take();
    assert_eq!(observed.map(|result| result.is_err()), Some(true));
    assert!(matches!(err, Error::Task(TaskError::Failed { .. })));
}

#[test]
fn returning_an_error_is_not_a_failure() {
    let value = kairos::run_blocking(|scope| async move {
        let task = scope.launch(async { Err::<u8, &str>("nope") });
        task.await
    })
    .unwrap();

    assert_eq!(value, Ok(Err("nope")));
}

#[test]
fn with_context_failure_stops_the_loop() {
    let err = kairos::run_blocking(|scope| async move {
        let compute = scope.dispatchers().compute().clone();
        scope.with_context(&compute, async { explode() }).await
    })
    .unwrap_err();

    assert!(matches!(err, Error::Task(TaskError::Failed { .. })));
}
