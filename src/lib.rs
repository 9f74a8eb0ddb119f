//! # Credgate (Username/Password Gateway)
//!
//! `credgate` maps a username/password signup and login flow onto an
//! email-based identity provider (GoTrue/Supabase compatible).
//!
//! ## Synthetic Emails
//!
//! The provider only knows email accounts, so every username is normalized
//! (trimmed, lowercased, stripped to `[a-z0-9._-]`) and suffixed with a fixed
//! domain. A username that normalizes to nothing is rejected before any
//! provider call.
//!
//! ## Provider Access
//!
//! Two immutable clients are built at startup:
//!
//! - **Admin:** service-role key, used to create, list and confirm accounts and
//!   to upsert the `profiles` mirror.
//! - **Public:** anonymous key, used for password sign-in.
//!
//! Sessions returned by the provider are forwarded verbatim and never inspected.
//!
//! ## Failure Model
//!
//! Signup is a best-effort three-step sequence (create, upsert profile, sign in)
//! with no rollback. Login failures are deliberately generic (`401`) so callers
//! cannot probe which usernames exist.

pub mod api;
pub mod cli;
pub mod gateway;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Reported in place of the commit hash when built outside a git checkout.
pub const UNKNOWN_COMMIT: &str = "unknown";

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => UNKNOWN_COMMIT,
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
