//! Built-in verification stages, listed in pipeline order.

pub mod attestation;
pub mod policy;
pub mod presence;
pub mod replay;
pub mod supporter;
pub mod work;

pub use attestation::{PowHashStage, SignatureStage};
pub use policy::{FreshnessStage, HoursBoundStage};
pub use presence::PresenceStage;
pub use replay::ReplayStage;
pub use supporter::SupporterStage;
pub use work::WorkStage;
