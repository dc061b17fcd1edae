//! Recommendation rule table.
//!
//! Recommendations are data, not behavior: a fixed lookup keyed by
//! `(impact_level, change_type)`. The texts are deployment policy and may be
//! replaced wholesale; the lookup itself is total over both enums.

use super::{ChangeType, ImpactLevel};

/// Returns the recommendations for an impact level and change type. Total
/// over both enums; never returns an empty list.
pub fn recommendations_for(level: ImpactLevel, change_type: ChangeType) -> Vec<String> {
    let mut out: Vec<String> = base_for_level(level).iter().map(|s| s.to_string()).collect();
    out.extend(change_specific(level, change_type).iter().map(|s| s.to_string()));
    out
}

fn base_for_level(level: ImpactLevel) -> &'static [&'static str] {
    match level {
        ImpactLevel::Critical => &[
            "Halt the change until all critical dependents are migrated or shielded",
            "Notify owners of every affected asset before proceeding",
            "Prepare a rollback plan and schedule the change in a maintenance window",
        ],
        ImpactLevel::High => &[
            "Coordinate the rollout with owners of high-impact dependents",
            "Stage the change in a non-production environment first",
        ],
        ImpactLevel::Medium => &[
            "Review affected pipelines and refresh their tests before the change",
        ],
        ImpactLevel::Low => &[
            "Proceed with standard change controls; monitor dependents after rollout",
        ],
        ImpactLevel::Minimal => &[
            "No special precautions required; record the change in the catalog",
        ],
    }
}

fn change_specific(level: ImpactLevel, change_type: ChangeType) -> &'static [&'static str] {
    match change_type {
        ChangeType::SchemaChange => match level {
            ImpactLevel::Critical | ImpactLevel::High => {
                &["Publish the new schema version and deprecation timeline to consumers"]
            }
            _ => &["Verify downstream schema bindings still resolve"],
        },
        ChangeType::DataTypeChange => match level {
            ImpactLevel::Critical | ImpactLevel::High => {
                &["Audit downstream casts and aggregations for precision or overflow changes"]
            }
            _ => &["Spot-check consumers for implicit type coercion"],
        },
        ChangeType::ColumnRemoval => match level {
            ImpactLevel::Critical | ImpactLevel::High => &[
                "Confirm no dependent queries select the removed column",
                "Offer a compatibility view during the migration window",
            ],
            _ => &["Search dependent transformations for references to the column"],
        },
        ChangeType::TableRemoval => match level {
            ImpactLevel::Critical | ImpactLevel::High => &[
                "Archive the table and retain a restore path before dropping it",
                "Verify regulatory retention obligations are met prior to removal",
            ],
            _ => &["Confirm downstream jobs no longer read the table before dropping it"],
        },
        ChangeType::PermissionChange => match level {
            ImpactLevel::Critical | ImpactLevel::High => {
                &["Re-run access reviews for every principal reading affected assets"]
            }
            _ => &["Validate service accounts retain required grants"],
        },
        ChangeType::LocationChange => match level {
            ImpactLevel::Critical | ImpactLevel::High => {
                &["Dual-write to old and new locations until all consumers cut over"]
            }
            _ => &["Update path references in dependent jobs and verify connectivity"],
        },
    }
}
