//! Regulator permit authority for DiveQuota.
//!
//! The quota engine talks to the regulator through [`AuthorityClient`].
//! Two adapters exist: a deterministic in-process mock for development
//! and testing, and a live HTTP adapter for the regulator API. The
//! adapter is chosen once from configuration via [`AuthorityDispatch`].

pub mod client;
pub mod dispatch;
pub mod live;
pub mod mock;

pub use client::{AuthorityClient, AuthorityMode, PermitDecision, PermitRequest};
pub use dispatch::AuthorityDispatch;
pub use live::LiveAuthorityClient;
pub use mock::{MockAuthorityClient, MockBehavior};
