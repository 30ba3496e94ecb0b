//! Reference ("golden") artifact retrieval for simreg.
//!
//! A [`ReferenceProvider`] turns a declared `TestReference` into a file under
//! the case's run directory. Three backends exist, selected by the reference's
//! `<backend>:` prefix:
//!
//! - `local:` symlinks a file from disk or from the local reference store
//! - `cloud:` downloads from a remote object store, resolving the newest
//!   uploaded version through a version manifest fetched once per run
//! - `url:` performs a plain HTTP(S) GET

pub mod cloud;
pub mod dispatch;
pub mod error;
pub mod girder;
mod http;
pub mod local;
pub mod provider;
pub mod url;

pub use cloud::{CloudProvider, RemoteStore, StoreConnector, VersionEntry, VersionManifest};
pub use dispatch::ReferenceDispatcher;
pub use error::RemoteError;
pub use girder::GirderStore;
pub use local::LocalProvider;
pub use provider::ReferenceProvider;
pub use url::UrlProvider;
