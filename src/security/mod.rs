//! Security Filter and Webhook Authenticator (§4.A, §4.B).

pub mod auth;
pub mod filter;
pub mod flood;
pub mod hmac_verify;
pub mod metrics;
pub mod rate_limit;
pub mod replay;
