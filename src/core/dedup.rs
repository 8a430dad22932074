use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::core::notability::calculate_notability_score;
use crate::models::{Poi, PoiType};
use crate::utils::{distance, similarity, similarity::normalize_name};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Records farther apart than this are never the same place
    pub max_distance_m: f64,
    /// Minimum name similarity for two nearby records to be merged
    pub min_similarity: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            max_distance_m: 50.0,
            min_similarity: 0.70,
        }
    }
}

pub fn deduplicate(pois: Vec<Poi>) -> Vec<Poi> {
    deduplicate_with(pois, &DedupConfig::default())
}

/// Clusters records describing the same place and merges every cluster into one record.
///
/// Anchors are chosen in notability order, so the richest record absorbs its lesser
/// duplicates. The ordering is total, which makes the outcome independent of input order.
pub fn deduplicate_with(mut pois: Vec<Poi>, config: &DedupConfig) -> Vec<Poi> {
    let total = pois.len();
    pois.sort_by(anchor_order);

    let mut processed = vec![false; total];
    let mut clusters: Vec<Vec<usize>> = vec![];

    for anchor in 0..total {
        if processed[anchor] {
            continue;
        }
        processed[anchor] = true;

        let mut cluster = vec![anchor];
        for candidate in (anchor + 1)..total {
            if !processed[candidate] && is_duplicate(&pois[anchor], &pois[candidate], config) {
                processed[candidate] = true;
                cluster.push(candidate);
            }
        }
        clusters.push(cluster);
    }

    let mut slots: Vec<Option<Poi>> = pois.into_iter().map(Some).collect();
    let merged: Vec<Poi> = clusters
        .into_iter()
        .filter_map(|cluster| {
            let members: Vec<Poi> = cluster
                .into_iter()
                .filter_map(|index| slots[index].take())
                .collect();
            merge_cluster(members)
        })
        .collect();

    log::debug!("Deduplicated {} records into {}", total, merged.len());
    merged
}

fn anchor_order(a: &Poi, b: &Poi) -> Ordering {
    b.notability_score()
        .cmp(&a.notability_score())
        .then_with(|| b.priority().cmp(&a.priority()))
        .then_with(|| a.id.cmp(&b.id))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.discovered_at().cmp(&b.discovered_at()))
}

fn is_duplicate(anchor: &Poi, candidate: &Poi, config: &DedupConfig) -> bool {
    // names made only of blanks or punctuation count as missing
    if normalize_name(&anchor.name).is_empty() || normalize_name(&candidate.name).is_empty() {
        return false;
    }

    let meters = match distance(
        anchor.coordinate.latitude(),
        anchor.coordinate.longitude(),
        candidate.coordinate.latitude(),
        candidate.coordinate.longitude(),
    ) {
        Ok(meters) => meters,
        Err(e) => {
            log::warn!("Not comparing {} and {}: {}", anchor.id, candidate.id, e);
            return false;
        }
    };

    // the name is only looked at once the records are close enough
    if meters > config.max_distance_m {
        return false;
    }

    similarity(&anchor.name, &candidate.name) >= config.min_similarity
}

/// Value of the member with the highest source priority that has one; first seen wins ties.
fn pick<T: Clone>(members: &[Poi], field: impl Fn(&Poi) -> Option<&T>) -> Option<T> {
    let mut best: Option<(u8, &T)> = None;
    for member in members {
        if let Some(value) = field(member) {
            let priority = member.priority();
            if best.is_none_or(|(current, _)| priority > current) {
                best = Some((priority, value));
            }
        }
    }
    best.map(|(_, value)| value.clone())
}

fn merge_cluster(mut members: Vec<Poi>) -> Option<Poi> {
    if members.len() <= 1 {
        return members.pop();
    }

    let anchor = &members[0];
    log::debug!(
        "Merging {} records into {} ({})",
        members.len(),
        anchor.name,
        anchor.id
    );

    let poi_type = if anchor.poi_type == PoiType::Other {
        pick(&members, |p| Some(&p.poi_type).filter(|t| **t != PoiType::Other))
            .unwrap_or(PoiType::Other)
    } else {
        anchor.poi_type
    };

    let mut merged = Poi {
        id: anchor.id.clone(),
        name: anchor.name.clone(),
        description: pick(&members, |p| p.description.as_ref()),
        poi_type,
        coordinate: anchor.coordinate,
        distance_from_origin: anchor.distance_from_origin,
        sources: members
            .iter()
            .flat_map(|p| p.sources.iter().copied())
            .collect(),
        wikipedia_title: pick(&members, |p| p.wikipedia_title.as_ref()),
        external_entity_id: pick(&members, |p| p.external_entity_id.as_ref()),
        image_url: pick(&members, |p| p.image_url.as_ref()),
        website: pick(&members, |p| p.website.as_ref()),
        opening_hours: pick(&members, |p| p.opening_hours.as_ref()),
        heritage_status: pick(&members, |p| p.heritage_status.as_ref()),
        year_established: pick(&members, |p| p.year_established.as_ref()),
        annual_visitors: pick(&members, |p| p.annual_visitors.as_ref()),
        notability_score: 0,
        discovered_at: members
            .iter()
            .map(Poi::discovered_at)
            .min()
            .unwrap_or(anchor.discovered_at),
    };

    let best_member = members
        .iter()
        .map(Poi::notability_score)
        .max()
        .unwrap_or(0);
    let rescored = calculate_notability_score(merged.base_notability(), &merged.notability_flags());
    merged.notability_score = best_member.max(rescored);

    Some(merged)
}
