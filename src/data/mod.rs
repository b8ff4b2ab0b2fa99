mod metadata;
mod walker;

pub use metadata::{Metadata, KEY_MODULE, KEY_SOURCE, KEY_TYPE, KEY_YEAR};
pub use walker::{Harvester, RunSummary};
