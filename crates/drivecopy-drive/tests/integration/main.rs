//! Integration tests for drivecopy-drive
//!
//! Uses wiremock to simulate the Drive v2 API and the OAuth2 token endpoint,
//! and verifies folder chain resolution, entry lookups, uploads, downloads,
//! retries and token refresh end to end.

mod common;

mod test_auth;
mod test_backoff;
mod test_folder_chain;
mod test_transfers;
