use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Awaits a side call whose failure must not affect the caller.
///
/// Errors are logged at `warn` with `label` and swallowed.
pub async fn best_effort<T, E, F>(label: &str, fut: F) -> Option<T>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation = label, error = %e, "best-effort call failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_value_through() {
        let v = best_effort("answer", async { Ok::<_, String>(42) }).await;
        assert_eq!(v, Some(42));
    }

    #[tokio::test]
    async fn swallows_error() {
        let v: Option<u8> = best_effort("broken", async { Err("boom".to_string()) }).await;
        assert!(v.is_none());
    }
}
