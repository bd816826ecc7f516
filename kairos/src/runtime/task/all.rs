use super::Task;
use crate::error::TaskError;

/// Awaits every task and returns their values in input order.
///
/// Results are ordered like `tasks`, whatever order the tasks complete in.
/// The first task that failed or was canceled, in input order, ends the
/// wait with its error.
///
/// # Examples
///
/// ```rust,ignore
/// let tasks = vec![
///     scope.launch(async { delay(Duration::from_millis(20)).await; "Hello" }),
///     scope.launch(async { "World" }),
/// ];
/// assert_eq!(await_all(tasks).await?, vec!["Hello", "World"]);
/// ```
pub async fn await_all<T, I>(tasks: I) -> Result<Vec<T>, TaskError>
where
    I: IntoIterator<Item = Task<T>>,
    T: Clone + Send + Sync + 'static,
{
    let tasks = tasks.into_iter();
    let mut results = Vec::with_capacity(tasks.size_hint().0);

    for task in tasks {
        results.push(task.await?);
    }

    Ok(results)
}
