//! Control-plane configuration distribution.
//!
//! The fabric manager receives one `Init` followed by any number of `Delta`
//! messages; the streaming manager receives a full `StreamConfig` per
//! pipeline pass.

mod core;
mod error;

pub use self::core::{ControlPlaneDistributor, DistributorConfig, SharedDistributor};
pub use error::DistributorError;
