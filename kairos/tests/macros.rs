use kairos::Scope;
use kairos::time::delay_millis;

use std::time::{Duration, Instant};

#[kairos::main]
async fn answer() -> u32 {
    delay_millis(10).await;
    42
}

#[kairos::main(compute_threads = 2, io_threads = 8)]
async fn compute_square(scope: Scope) -> u64 {
    let compute = scope.dispatchers().compute().clone();
    scope.with_context(&compute, async { 12 * 12 }).await.unwrap()
}

#[test]
fn main_returns_the_body_value() {
    assert_eq!(answer(), 42);
    assert_eq!(compute_square(), 144);
}

#[kairos::test]
async fn test_without_scope() {
    let start = Instant::now();
    delay_millis(20).await;
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[kairos::test(compute_threads = 1)]
async fn test_with_scope(scope: Scope) {
    let task = scope.launch(async { "launched" });
    assert_eq!(task.await, Ok("launched"));
}

#[kairos::test]
#[should_panic(expected = "kairos runtime error")]
async fn failing_test_body_panics() {
    panic!("boom");
}
