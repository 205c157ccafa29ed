//! Authority registry for fedchain.
//!
//! The registry owns every server identity the election core knows about:
//! its status over time (federated, audit, ...), its current and historic
//! message-signing keys and its anchor keys. Elections never touch the
//! registry directly; they read an immutable [`AuthoritySet`] snapshot taken
//! at a given directory-block height.

pub mod authority;
pub mod error;
pub mod order;
pub mod registry;
pub mod snapshot;

pub use authority::{AnchorKey, Authority, AuthorityStatus, HistoricKey, KeyType, Role};
pub use error::RegistryError;
pub use order::{rank, volunteer_priority};
pub use registry::{AuthorityIndex, AuthorityRegistry};
pub use snapshot::AuthoritySet;
