//! Provider-neutral record model, zone resolution and the API seam.

pub mod provider;
pub mod record;
pub mod zone;
