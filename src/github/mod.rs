//! GitHub REST API access.
//!
//! Provides the fetch client used by every command that talks to GitHub,
//! the transport it runs on, and the response types it decodes.

mod client;
mod error;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::GitHubClient;
pub use error::{GitHubError, GitHubResult};
pub use transport::{HttpResponse, HttpTransport, MediaType, Transport, TransportError};
pub use types::{Release, Repository, Tag, TagCommit};
