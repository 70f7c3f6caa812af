//! Client for a running taxon-solver server.

pub mod remote;

pub use remote::{RemoteError, RemoteMatcher};
