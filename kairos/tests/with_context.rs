use kairos::{Error, RuntimeBuilder, Scope};

use std::thread;

#[kairos::test]
async fn with_context_runs_on_another_thread(scope: Scope) {
    let caller = thread::current().id();

    let (worker, name) = scope
        .with_context(scope.dispatchers().compute(), async {
            let current = thread::current();
            (current.id(), current.name().map(str::to_owned))
        })
        .await
        .unwrap();

    assert_ne!(caller, worker);
    assert!(name.unwrap().starts_with("kairos-compute-"));
}

#[kairos::test]
async fn with_context_returns_the_value(scope: Scope) {
    let io = scope.dispatchers().io().clone();
    let sum = scope
        .with_context(&io, async { (1..=10).sum::<u32>() })
        .await
        .unwrap();

    assert_eq!(sum, 55);
}

#[kairos::test]
async fn with_context_on_a_stopped_pool_is_refused(scope: Scope) {
    let io = scope.dispatchers().io().clone();
    io.shutdown();

    let err = scope.with_context(&io, async { 1 }).await.unwrap_err();
    assert_eq!(
        err,
        Error::DispatcherShutdown {
            name: "io".to_owned()
        }
    );
    assert!(scope.launch_on(&io, async {}).is_err());
}

#[test]
fn custom_thread_names_are_used() {
    let name = RuntimeBuilder::new()
        .thread_name("sampler")
        .compute_threads(1)
        .build()
        .run_blocking(|scope| async move {
            let compute = scope.dispatchers().compute().clone();
            scope
                .with_context(&compute, async {
                    thread::current().name().map(str::to_owned)
                })
                .await
        })
        .unwrap()
        .unwrap();

    assert_eq!(name.as_deref(), Some("sampler-compute-0"));
}
