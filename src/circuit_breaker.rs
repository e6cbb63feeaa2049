use failsafe::{backoff, failure_policy, Config};
use std::time::Duration;

/// Consecutive extraction failures that open the breaker.
pub const EXTRACTION_FAILURE_THRESHOLD: u32 = 5;

/// Creates a circuit breaker for extraction provider calls.
///
/// After [`EXTRACTION_FAILURE_THRESHOLD`] consecutive failures the breaker
/// opens and rejects calls, with exponential backoff from 10s to 60s before
/// a trial call is let through.
///
/// The provider call itself is async, so callers check
/// `is_call_permitted()` first and then record the finished outcome:
///
/// ```rust
/// use failsafe::CircuitBreaker;
/// use lead_ai::circuit_breaker::create_extraction_circuit_breaker;
///
/// let breaker = create_extraction_circuit_breaker();
/// assert!(breaker.is_call_permitted());
///
/// let outcome: Result<u8, &str> = Ok(42);
/// let recorded = breaker.call(move || outcome);
/// assert_eq!(recorded.unwrap(), 42);
/// ```
pub fn create_extraction_circuit_breaker() -> impl failsafe::CircuitBreaker {
    let backoff_strategy = backoff::exponential(Duration::from_secs(10), Duration::from_secs(60));

    let failure_policy =
        failure_policy::consecutive_failures(EXTRACTION_FAILURE_THRESHOLD, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::{CircuitBreaker, Error};

    #[test]
    fn opens_after_consecutive_failures() {
        let cb = create_extraction_circuit_breaker();

        for _ in 0..EXTRACTION_FAILURE_THRESHOLD {
            let result: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("provider down"));
            assert!(matches!(result, Err(Error::Inner("provider down"))));
        }

        assert!(!cb.is_call_permitted());
        let result: Result<(), Error<&str>> = cb.call(|| Ok::<(), &str>(()));
        assert!(matches!(result, Err(Error::Rejected)));
    }

    #[test]
    fn success_resets_the_failure_streak() {
        let cb = create_extraction_circuit_breaker();

        for _ in 0..EXTRACTION_FAILURE_THRESHOLD - 1 {
            let _ = cb.call(|| Err::<(), &str>("provider down"));
        }
        let _ = cb.call(|| Ok::<(), &str>(()));
        let _ = cb.call(|| Err::<(), &str>("provider down"));

        assert!(cb.is_call_permitted());
    }
}
