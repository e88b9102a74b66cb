//! # Dashgate (team-gated dashboard backend)
//!
//! `dashgate` sits in front of the service debug dashboard. It logs users in
//! with GitHub, lets them through only when they are active members of a
//! configured team, and hands out opaque session tokens that gate a small set
//! of read-only proxies to the debug backend.
//!
//! ## Sessions
//!
//! - **Issuance:** after the OAuth callback and an `active` membership verdict,
//!   a 128-bit random token is written to the session store with a 30-day TTL
//!   and delivered to the browser in a short-lived `token` cookie.
//! - **Validation:** a token is valid iff the store still holds a record for
//!   it. There is a single authorization tier.
//! - **No revocation:** logging in again does not invalidate older tokens.
//!
//! ## Proxies
//!
//! Registry listing, log reads and stats reads are forwarded to the debug
//! service as-is; failures surface as `500` with a JSON `{"error": ...}` body.

pub mod api;
pub mod cli;
pub mod debug;
pub mod github;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
