//! qbridge provider abstraction layer
//!
//! Provider-neutral vocabulary shared by the qbridge adapters and the CLI:
//! - The abstract [`JobStatus`] callers filter on, and [`JobId`]
//! - The [`Backend`] handle trait and the [`BackendRegistry`] that resolves
//!   names, aliases and filtered queries
//! - [`ConnectionConfig`] and [`Instance`] for selecting where to connect
//! - Credential sources: [`EnvTokenProvider`] and the on-disk [`AccountStore`]
//!
//! # Example: resolving a backend
//!
//! ```ignore
//! use qbridge_hal::{BackendFilter, BackendRegistry};
//!
//! let registry: BackendRegistry = discover().await?;
//! let backend = registry
//!     .select_one(&BackendFilter::named("ibmq_qasm_simulator"))
//!     .await?;
//! println!("{} has {} qubits", backend.name(), backend.num_qubits());
//! ```

pub mod auth;
pub mod backend;
pub mod error;
pub mod job;
pub mod registry;

pub use auth::{AccountStore, EnvTokenProvider, SavedAccount, TokenProvider};
pub use backend::{Backend, BackendAvailability, ConnectionConfig, Instance};
pub use error::{HalError, HalResult};
pub use job::{JobId, JobStatus};
pub use registry::{BackendFilter, BackendRegistry};
