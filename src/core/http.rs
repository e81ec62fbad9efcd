use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::redirect::Policy;
use reqwest::Client;

const APP_USER_AGENT: &str = "InterfaceOficial/0.1.0";

/// Redirect hops followed before a transfer is abandoned.
pub const DEFAULT_MAX_REDIRECTS: usize = 6;

/// Shared client that follows redirects across hosts and schemes, up to
/// `max_redirects` hops.
pub fn build_http_client_with_redirects(max_redirects: usize) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .redirect(Policy::limited(max_redirects))
        .build()
}
