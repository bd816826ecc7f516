use kairos::time::delay_millis;
use kairos::{Scope, Task, TaskError, yield_now};

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[test]
fn canceled_task_never_resumes_after_its_delay() {
    let reached = Arc::new(AtomicBool::new(false));
    let flag = reached.clone();
    let start = Instant::now();

    let outcome = kairos::run_blocking(move |scope| async move {
        let task = scope.launch(async move {
            delay_millis(2000).await;
            flag.store(true, Ordering::SeqCst);
        });

        delay_millis(1000).await;
        task.cancel();

        let awaited = task.clone().await;
        (task.id(), awaited, task.is_canceled())
    })
    .unwrap();

    let (id, awaited, canceled) = outcome;
    assert_eq!(awaited, Err(TaskError::Canceled(id)));
    assert!(canceled);
    assert!(start.elapsed() < Duration::from_millis(2000));
    assert!(!reached.load(Ordering::SeqCst));
}

#[kairos::test]
async fn cancel_is_idempotent(scope: Scope) {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();

    let task = scope.launch(async {
        delay_millis(500).await;
        1
    });
    task.invoke_on_completion(move |result| {
        assert!(result.is_err());
        counter.fetch_add(1, Ordering::SeqCst);
    });

    task.cancel();
    task.cancel();

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(task.is_canceled());
    assert!(task.is_completed());
    assert!(!task.is_active());
    assert_eq!(task.clone().await, Err(TaskError::Canceled(task.id())));
}

#[kairos::test]
async fn cancel_after_completion_is_a_noop(scope: Scope) {
    let task = scope.launch(async { "done" });
    assert_eq!(task.clone().await, Ok("done"));

    task.cancel();

    assert!(!task.is_canceled());
    assert_eq!(task.clone().await, Ok("done"));
}

#[kairos::test]
async fn callback_after_completion_fires_once_synchronously(scope: Scope) {
    let task = scope.launch(async { 7 });
    assert_eq!(task.clone().await, Ok(7));

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    task.invoke_on_completion(move |result| {
        assert_eq!(result, Ok(&7));
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[kairos::test]
async fn callbacks_fire_in_registration_order(scope: Scope) {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let task = scope.launch(async {
        delay_millis(20).await;
    });
    for i in 0..3 {
        let order = order.clone();
        task.invoke_on_completion(move |_| order.lock().push(i));
    }

    task.join().await.unwrap();
    assert_eq!(*order.lock(), vec![0, 1, 2]);
}

#[kairos::test]
async fn join_treats_cancellation_as_completion(scope: Scope) {
    let task = scope.launch(async {
        delay_millis(5_000).await;
    });
    task.cancel();

    assert_eq!(task.join().await, Ok(()));
}

#[test]
fn scope_cancel_stops_the_loop_quickly() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();
    let start = Instant::now();

    let sleeper = kairos::run_blocking(move |scope| async move {
        let sleeper = scope.launch(async move {
            delay_millis(2000).await;
            flag.store(true, Ordering::SeqCst);
        });

        let canceller = scope.clone();
        scope.launch(async move { canceller.cancel() });

        sleeper
    })
    .unwrap();

    assert!(start.elapsed() < Duration::from_millis(500));
    assert!(sleeper.is_canceled());
    assert!(!finished.load(Ordering::SeqCst));
}

#[kairos::test]
async fn scope_cancel_deactivates_the_scope(scope: Scope) {
    assert!(scope.is_active());

    let child = scope.clone();
    scope
        .launch(async move { child.cancel() })
        .join()
        .await
        .unwrap();

    assert!(!scope.is_active());
}

#[test]
fn yielding_after_scope_cancel_keeps_running() {
    let value = kairos::run_blocking(|scope| async move {
        scope.cancel();

        for _ in 0..200_000 {
            yield_now().await;
        }

        1
    })
    .unwrap();

    assert_eq!(value, 1);
}

#[kairos::test]
async fn scope_join_skips_members_launched_while_waiting(scope: Scope) {
    let late: Arc<Mutex<Option<Task<()>>>> = Arc::new(Mutex::new(None));
    let slot = late.clone();
    let launcher = scope.clone();

    scope.launch(async move {
        delay_millis(20).await;
        let sibling = launcher.launch(async {
            delay_millis(5_000).await;
        });
        *slot.lock() = Some(sibling);
    });

    let start = Instant::now();
    assert_eq!(scope.join().await, Ok(()));
    assert!(start.elapsed() < Duration::from_millis(1000));

    let sibling = late.lock().take().unwrap();
    assert!(sibling.is_active());
    sibling.cancel();
}

#[kairos::test]
async fn scope_join_treats_a_canceled_member_as_done(scope: Scope) {
    let sleeper = scope.launch(async {
        delay_millis(5_000).await;
    });

    let target = sleeper.clone();
    scope.launch(async move {
        delay_millis(20).await;
        target.cancel();
    });

    let start = Instant::now();
    assert_eq!(scope.join().await, Ok(()));
    assert!(start.elapsed() < Duration::from_millis(1000));
    assert!(sleeper.is_canceled());
}
