//! Rate-limit retry helper for the blocking HTTP clients.

use std::time::Duration;

use crate::error::LlmError;

const BASE_BACKOFF_SECS: u64 = 1;

/// Parse the `Retry-After` header value as seconds, falling back to
/// exponential backoff.
pub(crate) fn retry_delay(response: &reqwest::blocking::Response, attempt: u32) -> Duration {
    if let Some(secs) = response
        .headers()
        .get("retry-after")
        .and_then(|val| val.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
    {
        return Duration::from_secs(secs);
    }
    Duration::from_secs(BASE_BACKOFF_SECS << attempt)
}

/// Send an HTTP request, retrying up to `max_retries` times on 429 responses.
///
/// `f` must return a `reqwest::blocking::Response`. On each rate-limited
/// attempt, logs a warning and sleeps before retrying. Returns the successful
/// `Response` for further processing by the caller, or an error.
///
/// # Errors
///
/// Returns `LlmError::RateLimited` if all attempts are exhausted, or the
/// underlying `reqwest::Error` wrapped as `LlmError::Http` for other
/// transport failures.
pub(crate) fn send_with_retry<F>(
    endpoint: &'static str,
    max_retries: u32,
    mut f: F,
) -> Result<reqwest::blocking::Response, LlmError>
where
    F: FnMut() -> Result<reqwest::blocking::Response, reqwest::Error>,
{
    for attempt in 0..=max_retries {
        let response = f().map_err(LlmError::Http)?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if attempt == max_retries {
                return Err(LlmError::RateLimited);
            }
            let delay = retry_delay(&response, attempt);
            tracing::warn!(
                "{endpoint} rate limited, retrying in {}s ({}/{})",
                delay.as_secs(),
                attempt + 1,
                max_retries
            );
            std::thread::sleep(delay);
            continue;
        }

        return Ok(response);
    }

    Err(LlmError::RateLimited)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_exponential_backoff() {
        // Without a response we can't exercise header parsing, but the
        // backoff math must double per attempt.
        assert_eq!(BASE_BACKOFF_SECS << 0, 1);
        assert_eq!(BASE_BACKOFF_SECS << 1, 2);
        assert_eq!(BASE_BACKOFF_SECS << 2, 4);
    }
}
