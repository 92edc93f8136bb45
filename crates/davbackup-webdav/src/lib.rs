//! WebDAV transport for davbackup.
//!
//! [`HttpDavClient`] speaks the protocol over reqwest and reports raw failures.
//! [`WebDavTransport`] wraps any [`DavClient`], adds parent-directory handling
//! and classifies every failure into a [`davbackup_core::DavError`].

mod client;
mod http;
mod transport;

pub use client::{DavClient, DavClientError};
pub use http::{HttpDavClient, DEFAULT_TIMEOUT_SECS};
pub use transport::{WebDavStoreFactory, WebDavTransport};
