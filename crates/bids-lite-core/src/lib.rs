//! BIDS Lite Core - organize loose neuroimaging files into a BIDS layout.
//!
//! The crate turns a minimal metadata table plus a folder of arbitrarily named
//! scans into a reviewable plan of source -> destination operations, and then
//! applies that plan. Nothing touches the filesystem until [`Writer::apply`]
//! runs, and a saved [`Plan`] can be applied later without re-matching.
//!
//! Phases, in order:
//! - [`validator`]: metadata completeness and consistency
//! - [`planner`]: participant matching, category inference, unique destinations
//! - [`writer`]: transfers, `dataset_description.json`, `participants.tsv`, log
//!
//! # Example
//!
//! ```rust,ignore
//! use bids_lite_core::{CancellationToken, Organizer, OrganizerOptions, Writer};
//! use bids_lite_core::planner::AuxiliaryFiles;
//! use std::path::Path;
//!
//! fn main() -> bids_lite_core::Result<()> {
//!     let organizer = Organizer::new(OrganizerOptions::default());
//!     let inputs = organizer.load_inputs(Path::new("incoming"), Path::new("participants.csv"))?;
//!
//!     organizer.validate(&inputs).ensure_valid()?;
//!     let plan = organizer.plan(&inputs, Path::new("bids"), AuxiliaryFiles::default())?;
//!     plan.save(Path::new("plan.json"))?;
//!
//!     let report = organizer.apply(&plan, &Writer::new(), &CancellationToken::new())?;
//!     println!("{}", report.render_text());
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod planner;
pub mod scanner;
pub mod validator;
pub mod writer;

mod api;

// Re-export commonly used types
pub use api::{Inputs, Organizer};
pub use cancel::CancellationToken;
pub use config::{BidsConfig, OrganizerOptions, PathsConfig, ScanConfig};
pub use error::{BidsError, Result};
pub use metadata::{read_metadata, MetadataRow, MetadataTable};
pub use naming::{IdNormalizer, IdPolicy, NamingSpec, NormalizedId};
pub use planner::{DatasetType, MatchPolicy, Plan, Planner, UnknownPolicy};
pub use scanner::list_input_files;
pub use validator::{validate, ValidationReport};
pub use writer::{ApplyReport, TransferMode, Writer};
