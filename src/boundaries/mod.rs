//! External collaborator boundaries: loader, sandbox, data store.
//!
//! These live outside the engine; the traversal only depends on their
//! traits. In-memory reference implementations back the test suites and
//! small embedded deployments.

pub mod datastore;
pub mod loader;
pub mod sandbox;

pub use datastore::{DataPart, DataStore, DataStoreError, InMemoryDataStore, InlineData, StoredData};
pub use loader::{BoardReference, InMemoryLoader, Loader, LoaderError, NullLoader};
pub use sandbox::{
    Capabilities, CapabilityError, ERROR_KEY, FetchRequest, FetchResponse, ModuleMethod, Sandbox,
    SandboxError,
};
