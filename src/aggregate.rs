//! Required-plus-optional upstream calls.
//!
//! A response is often a primary payload plus an enrichment (a feedback
//! list plus its reputation summary, for example). Both calls run
//! concurrently. A failed primary fails the whole call; a failed secondary
//! is logged and reported as absent.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Outcome of [`aggregate`]. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation<P, S> {
    primary: P,
    secondary: Option<S>,
    secondary_failed: bool,
}

impl<P, S> Aggregation<P, S> {
    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// The enrichment, absent if its call failed.
    pub fn secondary(&self) -> Option<&S> {
        self.secondary.as_ref()
    }

    pub fn secondary_failed(&self) -> bool {
        self.secondary_failed
    }

    pub fn into_parts(self) -> (P, Option<S>) {
        (self.primary, self.secondary)
    }
}

/// Run `primary` and `secondary` concurrently and wait for both to settle.
///
/// `label` names the secondary call in the warning logged when it fails.
/// No timeout is imposed here; the underlying calls own theirs.
pub async fn aggregate<P, S, E, SE, FP, FS>(
    label: &str,
    primary: FP,
    secondary: FS,
) -> Result<Aggregation<P, S>, E>
where
    FP: Future<Output = Result<P, E>>,
    FS: Future<Output = Result<S, SE>>,
    SE: Display,
{
    let (primary, secondary) = tokio::join!(primary, secondary);
    let primary = primary?;

    let (secondary, secondary_failed) = match secondary {
        Ok(value) => (Some(value), false),
        Err(error) => {
            warn!(call = label, %error, "Secondary call failed, continuing without it");
            (None, true)
        }
    };

    Ok(Aggregation {
        primary,
        secondary,
        secondary_failed,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::Barrier;

    use super::*;

    #[tokio::test]
    async fn both_succeed() {
        let result = aggregate(
            "summary",
            async { Ok::<_, String>(vec![1, 2, 3]) },
            async { Ok::<_, String>("summary") },
        )
        .await
        .unwrap();

        assert_eq!(result.primary(), &vec![1, 2, 3]);
        assert_eq!(result.secondary(), Some(&"summary"));
        assert!(!result.secondary_failed());
    }

    #[tokio::test]
    async fn secondary_failure_degrades() {
        let result = aggregate(
            "summary",
            async { Ok::<_, String>("feedback") },
            async { Err::<u32, _>("rpc timeout") },
        )
        .await
        .unwrap();

        assert_eq!(result.primary(), &"feedback");
        assert_eq!(result.secondary(), None);
        assert!(result.secondary_failed());
        assert_eq!(result.into_parts(), ("feedback", None));
    }

    #[tokio::test]
    async fn primary_failure_propagates() {
        let ok_secondary = aggregate(
            "summary",
            async { Err::<u32, _>("primary down".to_string()) },
            async { Ok::<_, String>(1) },
        )
        .await;
        assert_eq!(ok_secondary.unwrap_err(), "primary down");

        let failed_secondary = aggregate(
            "summary",
            async { Err::<u32, _>("primary down".to_string()) },
            async { Err::<u32, _>("also down") },
        )
        .await;
        assert_eq!(failed_secondary.unwrap_err(), "primary down");
    }

    #[tokio::test]
    async fn calls_run_concurrently() {
        // Each side waits for the other; sequential execution would hang.
        let barrier = Arc::new(Barrier::new(2));
        let (a, b) = (barrier.clone(), barrier.clone());

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            aggregate(
                "summary",
                async move {
                    a.wait().await;
                    Ok::<_, String>("primary")
                },
                async move {
                    b.wait().await;
                    Ok::<_, String>("secondary")
                },
            ),
        )
        .await
        .expect("aggregate did not run its calls concurrently")
        .unwrap();

        assert_eq!(result.secondary(), Some(&"secondary"));
    }
}
