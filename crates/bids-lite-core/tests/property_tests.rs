//! Property-based tests for planner invariants.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use bids_lite_core::metadata::MetadataRow;
use bids_lite_core::planner::{
    AuxiliaryFiles, DatasetType, ExclusionReason, FileDisposition, MatchPolicy, PlanOptions,
    PlanRequest, Planner, UnknownPolicy,
};
use bids_lite_core::validator::{IssueCode, ValidationContext};
use bids_lite_core::{validate, MetadataTable};

/// Participant ids in the shapes seen in real tables.
fn arb_participant_id() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..200).prop_map(|n| n.to_string()),
        (1u32..50).prop_map(|n| format!("{:03}", n)),
        "[A-Z][a-z]{2,6}[0-9]{4}-case[0-9]".prop_map(|s| s),
        "patient[ _-][0-9]{1,3}".prop_map(|s| s),
    ]
}

fn arb_keyword() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "T1w", "t1", "MPRAGE", "FLAIR", "T2w", "bold", "rest", "dwi", "lesion", "mask", "notes",
        "scan",
    ])
    .prop_map(String::from)
}

fn arb_extension() -> impl Strategy<Value = String> {
    prop::sample::select(vec![".nii", ".nii.gz", ".NII.GZ"]).prop_map(String::from)
}

/// File names built from one of the participant ids plus noise, so several
/// files routinely collide on the same destination.
fn arb_listing(ids: Vec<String>) -> impl Strategy<Value = Vec<PathBuf>> {
    let n_ids = ids.len();
    prop::collection::vec(
        (
            0..n_ids + 1,
            arb_keyword(),
            arb_extension(),
            prop::sample::select(vec!["", "_run", "-b", " copy"]),
            any::<bool>(),
        ),
        0..24,
    )
    .prop_map(move |entries| {
        entries
            .into_iter()
            .map(|(pick, keyword, ext, noise, in_folder)| {
                let id = ids.get(pick).cloned().unwrap_or_else(|| "stray".to_string());
                if in_folder {
                    PathBuf::from(format!("/in/{}/{}{}{}", id, keyword, noise, ext))
                } else {
                    PathBuf::from(format!("/in/{}_{}{}{}", id, keyword, noise, ext))
                }
            })
            .collect()
    })
}

fn arb_options() -> impl Strategy<Value = PlanOptions> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(derived, specified, exclude)| {
        PlanOptions {
            dataset_type: if derived {
                DatasetType::Derivatives
            } else {
                DatasetType::Raw
            },
            pipeline_name: derived.then(|| "pipeline".to_string()),
            match_policy: if specified {
                MatchPolicy::SpecifiedOnly
            } else {
                MatchPolicy::AllModalities
            },
            unknown_policy: if exclude {
                UnknownPolicy::Exclude
            } else {
                UnknownPolicy::Retain
            },
            ..Default::default()
        }
    })
}

fn arb_case() -> impl Strategy<Value = (Vec<String>, Vec<PathBuf>, PlanOptions)> {
    prop::collection::vec(arb_participant_id(), 1..6)
        .prop_flat_map(|ids| (Just(ids.clone()), arb_listing(ids), arb_options()))
}

/// One participant row, optionally with a session, and one file for that
/// participant whose name may carry its own session tag.
fn arb_session_case() -> impl Strategy<Value = (MetadataTable, PathBuf, PlanOptions)> {
    (
        arb_participant_id(),
        prop::option::of(1u32..4),
        prop::option::of(1u32..4),
        arb_keyword(),
        arb_extension(),
        arb_options(),
    )
        .prop_map(|(id, row_session, file_session, keyword, ext, options)| {
            let mut row = MetadataRow::new(id.clone());
            if let Some(session) = row_session {
                row = row.with_session(session.to_string());
            }
            let tag = file_session
                .map(|s| format!("_ses-{:02}", s))
                .unwrap_or_default();
            let file = PathBuf::from(format!("/in/sub-{}{}_{}{}", id, tag, keyword, ext));
            (MetadataTable::from_rows(vec![row]), file, options)
        })
}

proptest! {
    #[test]
    fn prop_validator_and_planner_agree_on_sessions(
        (metadata, file, options) in arb_session_case(),
    ) {
        let listing = vec![file];
        let found = validate(&metadata, &listing, &ValidationContext::default())
            .with_code(IssueCode::FileMissing)
            .count()
            == 0;
        let plan = Planner::default().plan(&PlanRequest {
            metadata: &metadata,
            listing: &listing,
            output_root: Path::new("/out"),
            options,
            auxiliary: AuxiliaryFiles::default(),
        }).unwrap();

        let disposition = &plan.accounting[0].disposition;
        let session_mismatch = matches!(
            disposition,
            FileDisposition::Excluded { reason: ExclusionReason::SessionMismatch { .. } }
        );
        if found {
            prop_assert!(!session_mismatch, "validator found the file, planner: {:?}", disposition);
            prop_assert!(!matches!(disposition, FileDisposition::Unmatched));
        } else {
            prop_assert!(
                !matches!(disposition, FileDisposition::Matched { .. }),
                "validator missed the file, planner: {:?}",
                disposition
            );
        }
    }

    #[test]
    fn prop_destinations_are_unique((ids, listing, options) in arb_case()) {
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let metadata = MetadataTable::with_participants(&refs);
        let request = PlanRequest {
            metadata: &metadata,
            listing: &listing,
            output_root: Path::new("/out"),
            options,
            auxiliary: AuxiliaryFiles::default(),
        };
        let plan = Planner::default().plan(&request).unwrap();

        let mut seen = HashSet::new();
        for destination in plan.destinations() {
            prop_assert!(
                seen.insert(destination.to_string_lossy().to_lowercase()),
                "duplicate destination {}",
                destination.display()
            );
        }
        prop_assert!(plan.check_invariants().is_ok());
    }

    #[test]
    fn prop_every_file_accounted_once((ids, listing, options) in arb_case()) {
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let metadata = MetadataTable::with_participants(&refs);
        let request = PlanRequest {
            metadata: &metadata,
            listing: &listing,
            output_root: Path::new("/out"),
            options,
            auxiliary: AuxiliaryFiles::default(),
        };
        let plan = Planner::default().plan(&request).unwrap();

        let unique: HashSet<&PathBuf> = listing.iter().collect();
        prop_assert_eq!(plan.accounting.len(), unique.len());
        let accounted: HashSet<&PathBuf> = plan.accounting.iter().map(|a| &a.source).collect();
        prop_assert_eq!(accounted, unique);

        let s = plan.summary;
        prop_assert_eq!(s.matched + s.unmatched + s.excluded, s.total_files);
        prop_assert_eq!(s.matched, plan.operations.len());
    }

    #[test]
    fn prop_plan_ignores_listing_order(
        (ids, listing, options) in arb_case(),
        seed in any::<u64>(),
    ) {
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let metadata = MetadataTable::with_participants(&refs);

        let mut shuffled = listing.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
        }

        let planner = Planner::default();
        let first = planner.plan(&PlanRequest {
            metadata: &metadata,
            listing: &listing,
            output_root: Path::new("/out"),
            options: options.clone(),
            auxiliary: AuxiliaryFiles::default(),
        }).unwrap();
        let second = planner.plan(&PlanRequest {
            metadata: &metadata,
            listing: &shuffled,
            output_root: Path::new("/out"),
            options,
            auxiliary: AuxiliaryFiles::default(),
        }).unwrap();

        prop_assert_eq!(first, second);
    }
}
