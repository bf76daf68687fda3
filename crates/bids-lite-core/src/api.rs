//! Organizer facade: one value that carries the run options and the naming
//! table through validate, plan and apply.

use crate::cancel::CancellationToken;
use crate::config::OrganizerOptions;
use crate::metadata::{read_metadata, MetadataTable};
use crate::naming::NamingSpec;
use crate::planner::{AuxiliaryFiles, Plan, PlanOptions, PlanRequest, Planner};
use crate::scanner::list_input_files;
use crate::validator::{validate, Checklist, ValidationContext, ValidationReport};
use crate::writer::{ApplyReport, Writer};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Metadata table and input listing read at the start of a run.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub metadata: MetadataTable,
    pub listing: Vec<PathBuf>,
}

/// Entry point for shells (CLI, GUI) driving a full organize run.
#[derive(Debug, Clone, Default)]
pub struct Organizer {
    options: OrganizerOptions,
    spec: NamingSpec,
}

impl Organizer {
    pub fn new(options: OrganizerOptions) -> Self {
        Self {
            options,
            spec: NamingSpec::standard(),
        }
    }

    /// Replace the standard keyword table.
    pub fn with_spec(mut self, spec: NamingSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn options(&self) -> &OrganizerOptions {
        &self.options
    }

    /// Read the metadata file and list the input directory.
    pub fn load_inputs(&self, input_dir: &Path, metadata_path: &Path) -> Result<Inputs> {
        let metadata = read_metadata(metadata_path)?;
        let listing = list_input_files(input_dir, &self.options.extensions)?;
        info!(
            "Loaded {} metadata rows and {} input files",
            metadata.len(),
            listing.len()
        );
        Ok(Inputs { metadata, listing })
    }

    pub fn validate(&self, inputs: &Inputs) -> ValidationReport {
        let context = ValidationContext {
            checklist: Checklist::minimal(),
            ids: self.options.id_policy(),
            spec: self.spec.clone(),
        };
        validate(&inputs.metadata, &inputs.listing, &context)
    }

    pub fn plan(
        &self,
        inputs: &Inputs,
        output_root: &Path,
        auxiliary: AuxiliaryFiles,
    ) -> Result<Plan> {
        let request = PlanRequest {
            metadata: &inputs.metadata,
            listing: &inputs.listing,
            output_root,
            options: self.plan_options(),
            auxiliary,
        };
        Planner::new(self.spec.clone()).plan(&request)
    }

    /// Apply a plan with the configured transfer mode.
    pub fn apply(&self, plan: &Plan, writer: &Writer, cancel: &CancellationToken) -> Result<ApplyReport> {
        writer.apply(plan, self.options.transfer_mode, cancel)
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            dataset_type: self.options.dataset_type,
            pipeline_name: self.options.pipeline_name.clone(),
            match_policy: self.options.match_policy,
            unknown_policy: self.options.unknown_policy,
            ids: self.options.id_policy(),
        }
    }
}
