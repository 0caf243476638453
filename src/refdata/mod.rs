//! Reference data: cryptonyms, locations, and word dictionaries, each
//! loaded asynchronously at startup and gated behind its own
//! [`ReadinessGate`].

mod cryptonyms;
mod dictionary;
mod gematria;
mod locations;

pub use cryptonyms::CryptonymMap;
pub use dictionary::Dictionaries;
pub use gematria::score_word;
pub use locations::LocationMaps;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::concurrency::ReadinessGate;

/// All three reference-data stores plus their readiness gates, held by the
/// pipeline context and read-only once set.
pub struct ReferenceData {
    pub cryptonyms: CryptonymMap,
    pub cryptonyms_gate: ReadinessGate,
    pub locations: LocationMaps,
    pub locations_gate: ReadinessGate,
    pub dictionaries: Dictionaries,
    pub dictionaries_gate: ReadinessGate,
}

impl ReferenceData {
    pub fn empty() -> Self {
        Self {
            cryptonyms: CryptonymMap::default(),
            cryptonyms_gate: ReadinessGate::new("cryptonyms"),
            locations: LocationMaps::default(),
            locations_gate: ReadinessGate::new("locations"),
            dictionaries: Dictionaries::default(),
            dictionaries_gate: ReadinessGate::new("dictionaries"),
        }
    }
}

/// Paths to the three reference-data sources; any of them may be absent, in
/// which case the corresponding gate is simply never set and downstream
/// stages that need it wait until cancellation — by design (§4.5).
pub struct ReferenceDataPaths {
    pub cryptonyms: Option<PathBuf>,
    pub locations: Option<PathBuf>,
    pub dictionaries_dir: Option<PathBuf>,
}

/// Kick off the three independent loaders as background tasks. Each sets
/// its gate on success; a failure is logged and leaves the gate unset.
pub fn spawn_loaders(data: Arc<ReferenceData>, paths: ReferenceDataPaths) {
    if let Some(path) = paths.cryptonyms {
        let data = data.clone();
        tokio::spawn(async move {
            match cryptonyms::load(&path).await {
                Ok(map) => {
                    data.cryptonyms.replace_from(map);
                    data.cryptonyms_gate.set();
                    info!("cryptonym map loaded");
                }
                Err(e) => warn!(error = %e, "failed to load cryptonym map"),
            }
        });
    }

    if let Some(path) = paths.locations {
        let data = data.clone();
        tokio::spawn(async move {
            match locations::load(&path).await {
                Ok(maps) => {
                    data.locations.replace_from(maps);
                    data.locations_gate.set();
                    info!("location maps loaded");
                }
                Err(e) => warn!(error = %e, "failed to load location maps"),
            }
        });
    }

    if let Some(dir) = paths.dictionaries_dir {
        let data = data.clone();
        tokio::spawn(async move {
            match dictionary::load_dir(&dir).await {
                Ok(dicts) => {
                    data.dictionaries.replace_from(dicts);
                    data.dictionaries_gate.set();
                    info!("word dictionaries loaded");
                }
                Err(e) => warn!(error = %e, "failed to load word dictionaries"),
            }
        });
    }
}
