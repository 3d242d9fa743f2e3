//! Phenotype grouping and explicit pairwise selection.

use metab_model::{
    CanonicalDataset, GroupDefinition, GroupPair, ModelError, canonicalize_phenotype,
};
use tracing::info;

use crate::error::Result;
use crate::normalizer::rank_dataset;

/// Dataset relabelled by group name, with its ranked variant.
#[derive(Debug, Clone)]
pub struct GroupedDataset {
    /// File stem derived from the group names.
    pub stem: String,
    pub dataset: CanonicalDataset,
    pub ranked: CanonicalDataset,
}

fn stem_part(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// `Healthy` + `Severe Malnutrition` gives `healthy_and_severe_malnutrition`.
pub fn group_file_stem(groups: &[GroupDefinition]) -> String {
    groups
        .iter()
        .map(|group| stem_part(&group.name))
        .collect::<Vec<_>>()
        .join("_and_")
}

/// `control` vs `kwashiorkor` gives `control_vs_kwashiorkor`.
pub fn pair_file_stem(pair: &GroupPair) -> String {
    format!("{}_vs_{}", stem_part(&pair.first), stem_part(&pair.second))
}

/// Relabels each row with the name of the group its phenotype belongs to.
///
/// Membership compares canonical phenotype forms. Rows outside every group
/// are dropped; a phenotype listed in several groups takes the last one.
pub fn apply_groups(
    dataset: &CanonicalDataset,
    groups: &[GroupDefinition],
) -> Result<GroupedDataset> {
    let canonical: Vec<(String, Vec<String>)> = groups
        .iter()
        .map(|group| {
            (
                group.name.trim().to_string(),
                group.members.iter().map(|m| canonicalize_phenotype(m)).collect(),
            )
        })
        .collect();
    let grouped = dataset.relabel_phenotypes(|label| {
        let label = canonicalize_phenotype(label);
        canonical
            .iter()
            .rev()
            .find(|(_, members)| members.contains(&label))
            .map(|(name, _)| name.clone())
    })?;
    let ranked = rank_dataset(&grouped)?;
    info!(
        groups = groups.len(),
        rows = grouped.row_count(),
        dropped = dataset.row_count() - grouped.row_count(),
        "grouped phenotypes"
    );
    Ok(GroupedDataset {
        stem: group_file_stem(groups),
        dataset: grouped,
        ranked,
    })
}

/// Keeps only the rows labelled with one of the two requested labels.
///
/// Labels compare in canonical form. Either label missing from the dataset
/// is an error.
pub fn select_pair(dataset: &CanonicalDataset, pair: &GroupPair) -> Result<CanonicalDataset> {
    let first = canonicalize_phenotype(&pair.first);
    let second = canonicalize_phenotype(&pair.second);
    let present: Vec<String> = dataset
        .phenotype_labels()
        .into_iter()
        .map(canonicalize_phenotype)
        .collect();
    for (requested, canonical) in [(&pair.first, &first), (&pair.second, &second)] {
        if !present.contains(canonical) {
            return Err(ModelError::GroupNotFound(requested.clone()).into());
        }
    }
    let selected = dataset.relabel_phenotypes(|label| {
        let label_canonical = canonicalize_phenotype(label);
        (label_canonical == first || label_canonical == second).then(|| label.to_string())
    })?;
    info!(
        first = %pair.first,
        second = %pair.second,
        rows = selected.row_count(),
        "selected group pair"
    );
    Ok(selected)
}
