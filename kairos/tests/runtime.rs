use kairos::{Error, RuntimeBuilder};

use std::thread;
use std::time::Duration;

#[test]
fn run_blocking_returns_the_value() {
    let value = RuntimeBuilder::new()
        .build()
        .run_blocking(|scope| async move {
            let task = scope.launch(async { 21 * 2 });
            task.await.unwrap()
        })
        .unwrap();

    assert_eq!(value, 42);
}

#[test]
fn root_can_run_on_a_pool() {
    let runtime = RuntimeBuilder::new().compute_threads(2).build();
    let compute = runtime.dispatchers().compute().clone();

    let name = runtime
        .run_blocking_on(&compute, |_| async {
            thread::current().name().map(str::to_owned)
        })
        .unwrap();

    assert!(name.unwrap().starts_with("kairos-compute-"));
}

#[test]
fn shut_down_runtime_refuses_work() {
    let runtime = RuntimeBuilder::new().build();
    let compute = runtime.dispatchers().compute().clone();

    runtime.shutdown();
    runtime.shutdown();
    assert!(runtime.dispatchers().is_shutdown());

    let err = runtime.run_blocking_on(&compute, |_| async {}).unwrap_err();
    assert!(matches!(err, Error::DispatcherShutdown { .. }));
}

#[test]
fn pools_are_shut_down_after_run_blocking() {
    let runtime = RuntimeBuilder::new().io_threads(4).build();
    let dispatchers = runtime.dispatchers().clone();

    runtime
        .run_blocking(|scope| async move {
            let io = scope.dispatchers().io().clone();
            scope.with_context(&io, async {}).await.unwrap();
        })
        .unwrap();

    assert!(dispatchers.is_shutdown());
}

#[test]
#[should_panic(expected = "io_threads must be > 0")]
fn zero_io_threads_panics() {
    let _ = RuntimeBuilder::new().io_threads(0);
}

#[test]
fn root_resumed_on_a_foreign_thread_finishes_its_work() {
    let value = kairos::run_blocking(|scope| async move {
        let member = scope.launch(async {
            kairos::delay_millis(60_000).await;
        });

        let remote = member.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });

        // Resumes on the canceller thread.
        member.join().await.unwrap();
        scope.cancel();
        thread::sleep(Duration::from_millis(200));

        drop(canceller);
        7
    })
    .unwrap();

    assert_eq!(value, 7);
}
