//! Ordered fallback cascades.
//!
//! Every field lookup and every pagination strategy is one step of a cascade:
//! an ordered list of strategy values tried with the same async function.
//! The first step that finds something wins.

use std::future::Future;

use tracing::debug;

use crate::browser::BrowserError;

/// Outcome of one cascade step.
#[derive(Debug)]
pub enum Attempt<T> {
    Found(T),
    /// The step ran cleanly and matched nothing.
    Missing,
    /// The step could not be evaluated.
    Failed(BrowserError),
}

impl<T> Attempt<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Attempt::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map_found<U>(self, f: impl FnOnce(T) -> U) -> Attempt<U> {
        match self {
            Attempt::Found(value) => Attempt::Found(f(value)),
            Attempt::Missing => Attempt::Missing,
            Attempt::Failed(e) => Attempt::Failed(e),
        }
    }
}

impl<T> From<Option<T>> for Attempt<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Attempt::Missing, Attempt::Found)
    }
}

/// Try each strategy in order and return the first `Found`.
///
/// When nothing is found, the last failure is returned if any step failed,
/// otherwise `Missing`. Failures never stop the cascade.
pub async fn first_found<'s, S, T, F, Fut>(strategies: &'s [S], mut attempt: F) -> Attempt<T>
where
    S: std::fmt::Debug,
    F: FnMut(&'s S) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut last_failure = None;

    for strategy in strategies {
        match attempt(strategy).await {
            Attempt::Found(value) => return Attempt::Found(value),
            Attempt::Missing => {}
            Attempt::Failed(e) => {
                debug!("Cascade step {:?} failed: {}", strategy, e);
                last_failure = Some(e);
            }
        }
    }

    last_failure.map_or(Attempt::Missing, Attempt::Failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_first_found_stops_at_first_hit() {
        let tried = RefCell::new(Vec::new());
        let result = first_found(&[1, 2, 3], |n: &i32| {
            tried.borrow_mut().push(*n);
            let n = *n;
            async move {
                if n >= 2 {
                    Attempt::Found(n * 10)
                } else {
                    Attempt::Missing
                }
            }
        })
        .await;

        assert_eq!(result.found(), Some(20));
        assert_eq!(*tried.borrow(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_cascade() {
        let result = first_found(&["bad", "good"], |s: &&str| {
            let s = *s;
            async move {
                if s == "bad" {
                    Attempt::Failed(BrowserError::Protocol("detached".into()))
                } else {
                    Attempt::Found(s.to_string())
                }
            }
        })
        .await;

        assert_eq!(result.found().as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn test_all_missing_reports_missing() {
        let result: Attempt<()> = first_found(&[1, 2], |_| async { Attempt::Missing }).await;
        assert!(matches!(result, Attempt::Missing));
    }

    #[tokio::test]
    async fn test_failure_reported_when_nothing_found() {
        let result: Attempt<()> = first_found(&[1, 2], |n: &i32| {
            let n = *n;
            async move {
                if n == 1 {
                    Attempt::Failed(BrowserError::Script("boom".into()))
                } else {
                    Attempt::Missing
                }
            }
        })
        .await;
        assert!(matches!(result, Attempt::Failed(BrowserError::Script(_))));
    }

    #[tokio::test]
    async fn test_empty_cascade_is_missing() {
        let strategies: [u8; 0] = [];
        let result: Attempt<()> = first_found(&strategies, |_| async { Attempt::Found(()) }).await;
        assert!(matches!(result, Attempt::Missing));
    }
}
