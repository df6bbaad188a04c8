use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Client for idempotent reads: transport-level transient failures are
    /// retried once below the agent's own retry policy.
    pub fn create_client(timeout: Duration) -> ClientWithMiddleware {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(1);

        ClientBuilder::new(Self::base_client(timeout))
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }

    /// Client for order submission. No retry middleware: a repeated POST
    /// could place the same order twice.
    pub fn create_order_client(timeout: Duration) -> ClientWithMiddleware {
        ClientBuilder::new(Self::base_client(timeout)).build()
    }

    fn base_client(timeout: Duration) -> Client {
        Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

/// Append query parameters to `base_url`.
/// reqwest-middleware's request builder has no `.query()`, so the query
/// string is built by hand.
pub fn build_url_with_query<K, V>(base_url: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return base_url.to_string();
    }

    let query_string: String = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k.as_ref()), encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base_url, separator, query_string)
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
