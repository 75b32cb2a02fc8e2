//! Robots.txt handling module
//!
//! Robots bodies are fetched once per domain by the robots stage and carried
//! to the admission stage inside stage artifacts; this module turns a body
//! into an admission decision.

mod parser;

pub use parser::RobotsPolicy;

use crate::FetchError;

/// Resolves a robots.txt fetch outcome into the body to store
///
/// A missing or forbidden robots.txt (any 4xx) or one behind redirects the
/// policy does not follow places no restrictions and yields an empty body.
/// Server errors and transport failures are returned so the shard fails and
/// is retried.
pub fn body_or_permissive(outcome: Result<String, FetchError>) -> Result<String, FetchError> {
    match outcome {
        Ok(body) => Ok(body),
        Err(e) if e.is_client_status() => Ok(String::new()),
        Err(FetchError::RedirectNotFollowed { .. } | FetchError::RedirectLimit { .. }) => {
            Ok(String::new())
        }
        Err(e) => Err(e),
    }
}
