//! Dive site entities.

pub mod model;
pub mod zone;

pub use model::{NearbySite, SiteQuotaConfig};
pub use zone::ConservationZone;
