//! Time-bounded value caching.
//!
//! Provides [`ExpiringCache`], a memoize-with-expiration cell used to hold
//! short-lived credentials. Regeneration is single-flight: while one
//! regeneration is running every other caller awaits the same attempt.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

type Regenerator<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type Attempt<T, E> = Shared<BoxFuture<'static, Result<Cached<T>, E>>>;

/// Cached value with its expiry instant.
#[derive(Clone)]
struct Cached<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Cached<T> {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

struct Slot<T, E> {
    current: Option<Cached<T>>,
    in_flight: Option<Attempt<T, E>>,
}

/// A value that is regenerated once its time-to-live has elapsed.
///
/// The first call to [`get`](Self::get), and the first call after expiry,
/// runs the regeneration function and stores the result for `ttl`. Calls that
/// arrive while a regeneration is running wait for that regeneration and
/// receive its result, success or failure. A failed regeneration leaves the
/// previous contents untouched so the next call tries again.
///
/// # Examples
///
/// ```
/// use prgate_github::cache::ExpiringCache;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = ExpiringCache::new(Duration::from_secs(60), || async {
///     Ok::<_, String>("fresh".to_string())
/// });
///
/// assert_eq!(cache.get().await.unwrap(), "fresh");
/// # }
/// ```
pub struct ExpiringCache<T, E> {
    ttl: Duration,
    regenerate: Regenerator<T, E>,
    slot: Mutex<Slot<T, E>>,
}

impl<T, E> ExpiringCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    ///
    /// # Arguments
    ///
    /// * `ttl` - How long a regenerated value stays valid
    /// * `regenerate` - Produces a fresh value; called at most once per expiry window
    pub fn new<F, Fut>(ttl: Duration, regenerate: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            ttl,
            regenerate: Box::new(move || regenerate().boxed()),
            slot: Mutex::new(Slot {
                current: None,
                in_flight: None,
            }),
        }
    }

    /// Get the cached value, regenerating it if it is missing or expired.
    ///
    /// # Errors
    ///
    /// Returns the regeneration error. Every caller that joined the same
    /// regeneration attempt receives a clone of it.
    pub async fn get(&self) -> Result<T, E> {
        let attempt = {
            let mut slot = self.lock();

            if let Some(cached) = slot.current.as_ref().filter(|c| c.is_valid()) {
                return Ok(cached.value.clone());
            }

            match &slot.in_flight {
                Some(attempt) => {
                    debug!("Joining in-flight regeneration");
                    attempt.clone()
                }
                None => {
                    debug!(ttl_secs = self.ttl.as_secs(), "Regenerating cached value");
                    let ttl = self.ttl;
                    let attempt = (self.regenerate)()
                        .map(move |result| {
                            result.map(|value| Cached {
                                value,
                                expires_at: Instant::now() + ttl,
                            })
                        })
                        .boxed()
                        .shared();
                    slot.in_flight = Some(attempt.clone());
                    attempt
                }
            }
        };

        let outcome = attempt.clone().await;

        {
            let mut slot = self.lock();
            let owns_slot = slot
                .in_flight
                .as_ref()
                .is_some_and(|current| current.ptr_eq(&attempt));

            if owns_slot {
                slot.in_flight = None;
                match &outcome {
                    Ok(cached) => slot.current = Some(cached.clone()),
                    Err(_) => warn!("Regeneration failed; keeping previous cache state"),
                }
            }
        }

        outcome.map(|cached| cached.value)
    }

    /// Discard the current value so the next `get` regenerates it.
    ///
    /// A regeneration that is already running is not affected.
    pub fn invalidate(&self) {
        self.lock().current = None;
    }

    /// Check whether a valid value is currently held.
    pub fn is_fresh(&self) -> bool {
        self.lock().current.as_ref().is_some_and(|c| c.is_valid())
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T, E>> {
        // The slot holds no invariants that a panic could break halfway.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T, E> std::fmt::Debug for ExpiringCache<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("ttl", &self.ttl)
            .field("value", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
