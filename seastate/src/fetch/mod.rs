//! Upstream HTTP seam shared by both fetchers.

mod http;

pub use http::{HttpFetch, HttpResponse, SharedHttpClient};
