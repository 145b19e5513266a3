//! One logical fetch per identifier: bounded attempts, linear backoff

use std::time::Duration;

use scrapeline_core::{RawResult, RetryPolicy, Transport, proxy_for_slot};

use crate::config::Config;
use crate::query::{self, Answer};

/// Fetches announcement details through a [`Transport`].
///
/// Holds no mutable state; concurrent `fetch` calls only share the transport.
pub struct Fetcher<T> {
    transport: T,
    retry: RetryPolicy,
    timeout: Duration,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            transport,
            retry,
            timeout,
        }
    }

    pub fn from_config(transport: T, config: &Config) -> Self {
        Self::new(transport, RetryPolicy::new(config.max_retries), config.timeout)
    }

    /// Fetch one identifier. `slot` picks the proxy (`slot mod proxy count`).
    ///
    /// Never fails: transport errors, non-200 statuses and undecodable bodies
    /// are retried, then reported as an error result.
    pub async fn fetch(&self, id: &str, slot: usize) -> RawResult {
        let proxy = proxy_for_slot(slot, self.transport.proxy_count());
        let body = query::announcement_request(id);

        for attempt in self.retry.attempts() {
            let reason = match self
                .transport
                .post_json(body.clone(), proxy, self.timeout)
                .await
            {
                Err(e) => e.to_string(),
                Ok(resp) if !resp.is_ok() => format!("HTTP {}", resp.status),
                Ok(resp) => match query::decode_announcement(&resp.body) {
                    Ok(Answer::Found(doc)) => return RawResult::Document(doc),
                    Ok(Answer::NotFound) => return RawResult::Empty,
                    Ok(Answer::Errors(errors)) => {
                        log::debug!("{id}: remote reported errors");
                        return RawResult::Error {
                            id: id.to_string(),
                            error: errors,
                        };
                    }
                    Err(e) => format!("malformed body: {e}"),
                },
            };
            if attempt < self.retry.max_retries {
                self.retry.wait(id, attempt, &reason).await;
            } else {
                log::debug!("{id}: attempt {attempt} failed: {reason}");
            }
        }

        log::warn!("{id}: giving up after {} attempts", self.retry.max_retries);
        RawResult::exhausted(id, self.retry.max_retries)
    }
}
