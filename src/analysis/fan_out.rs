//! Best-effort fan-out over independent operations.

use futures::future::join_all;
use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// Run `op` once per key and pair every key with its outcome.
///
/// Failures are logged and reported as `None`; they never abort the batch.
/// The output always has one entry per input key, in input order, whether
/// the operations ran concurrently or one after another.
pub async fn best_effort<K, T, E, F, Fut>(
    keys: &[K],
    concurrent: bool,
    op: F,
) -> Vec<(K, Option<T>)>
where
    K: Copy + Display,
    E: Display,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let outcomes: Vec<Result<T, E>> = if concurrent {
        join_all(keys.iter().map(|&key| op(key))).await
    } else {
        let mut outcomes = Vec::with_capacity(keys.len());
        for &key in keys {
            outcomes.push(op(key).await);
        }
        outcomes
    };

    keys.iter()
        .zip(outcomes)
        .map(|(&key, outcome)| match outcome {
            Ok(value) => (key, Some(value)),
            Err(e) => {
                warn!("Failed to obtain {}: {}", key, e);
                (key, None)
            }
        })
        .collect()
}
