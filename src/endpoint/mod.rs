//! Runtime inspector endpoint discovery

pub mod loopback;
pub mod resolver;
pub mod retry;

pub use resolver::{parse_base_url, EndpointResolver};
pub use retry::{retry, RetryError, RetryPolicy};
