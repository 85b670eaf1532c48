//! Cross-Platform Intelligence Engine (C7): groups signals discussing the
//! same underlying problem across platforms into clusters, using the same
//! hashed-embedding similarity substrate as C2/C4/C5 (spec §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use super::lexical::{cosine_similarity, embed};
use super::pain_point::ProblemType;
use crate::models::signal::Platform;

/// Cosine-distance cut at which two clusters stop merging (spec §4.6);
/// expressed here as the equivalent similarity floor.
const MERGE_SIMILARITY_FLOOR: f32 = 0.70;
const DEFAULT_TEMPORAL_ALIGNMENT_DAYS: i64 = 14;
/// Below this pairwise similarity a relationship is not worth reporting at
/// all (spec §4.6 "discard below 0.50").
const DISCARD_FLOOR: f32 = 0.50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CorrelationType {
    Identical,
    Similar,
    Related,
    Divergent,
}

impl CorrelationType {
    fn from_similarity(similarity: f32) -> Option<CorrelationType> {
        if similarity >= 0.90 {
            Some(CorrelationType::Identical)
        } else if similarity >= 0.70 {
            Some(CorrelationType::Similar)
        } else if similarity >= DISCARD_FLOOR {
            Some(CorrelationType::Related)
        } else if similarity >= 0.30 {
            Some(CorrelationType::Divergent)
        } else {
            None
        }
    }
}

/// A signal as seen by the clustering stage: whatever C5/C4 already derived
/// for it, plus enough identity to group and re-attribute afterwards.
#[derive(Debug, Clone)]
pub struct ClusterItem {
    pub signal_id: Uuid,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub problem_type: ProblemType,
    pub intensity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Cluster {
    /// Stable, content-derived identifier: re-clustering unchanged input
    /// yields the same id (spec §4.6 "idempotent across re-runs").
    pub cluster_id: String,
    pub member_signal_ids: Vec<Uuid>,
    pub platforms_covered: Vec<Platform>,
    /// True once three or more distinct platforms are represented (spec
    /// §4.6 "universal trend").
    pub universal: bool,
    pub dominant_problem_type: ProblemType,
    pub correlation_type: Option<CorrelationType>,
    pub tight_temporal_alignment: bool,
    pub average_intensity: f32,
}

pub struct ClusteringEngine {
    pub temporal_alignment_days: i64,
}

impl Default for ClusteringEngine {
    fn default() -> Self {
        Self {
            temporal_alignment_days: DEFAULT_TEMPORAL_ALIGNMENT_DAYS,
        }
    }
}

fn canonical_keywords(items: &[&ClusterItem]) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut keywords = BTreeSet::new();
    for item in items {
        for token in item.text.split(|c: char| !c.is_alphanumeric()) {
            let lowered = token.to_lowercase();
            if lowered.len() >= 4 {
                keywords.insert(lowered);
            }
        }
    }
    keywords.into_iter().take(20).collect()
}

fn cluster_id_for(items: &[&ClusterItem]) -> String {
    let keywords = canonical_keywords(items);
    let mut hasher = Sha256::new();
    for keyword in &keywords {
        hasher.update(keyword.as_bytes());
        hasher.update(b"|");
    }
    hex::encode(hasher.finalize())[..32].to_string()
}

fn mode_problem_type(items: &[&ClusterItem]) -> ProblemType {
    use std::collections::HashMap;
    let mut counts: HashMap<ProblemType, (usize, f32)> = HashMap::new();
    for item in items {
        let entry = counts.entry(item.problem_type).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += item.intensity;
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, sum_a)), (_, (count_b, sum_b))| {
            count_a
                .cmp(count_b)
                .then_with(|| {
                    let avg_a = sum_a / *count_a as f32;
                    let avg_b = sum_b / *count_b as f32;
                    avg_a.partial_cmp(&avg_b).unwrap()
                })
        })
        .map(|(problem_type, _)| problem_type)
        .unwrap_or(ProblemType::Other)
}

impl ClusteringEngine {
    fn is_tightly_aligned(&self, items: &[&ClusterItem]) -> bool {
        if items.len() < 2 {
            return true;
        }
        let min = items.iter().map(|i| i.created_at).min().unwrap();
        let max = items.iter().map(|i| i.created_at).max().unwrap();
        (max - min) <= chrono::Duration::days(self.temporal_alignment_days)
    }

    /// Agglomerative average-linkage clustering over the hashed-embedding
    /// similarity of each item's text, merging until the closest remaining
    /// pair of clusters falls below [`MERGE_SIMILARITY_FLOOR`].
    pub fn cluster(&self, items: &[ClusterItem]) -> Vec<Cluster> {
        let n = items.len();
        if n == 0 {
            return Vec::new();
        }

        let embeddings: Vec<[f32; 256]> = items.iter().map(|i| embed(&i.text)).collect();
        let mut similarity = vec![vec![0f32; n]; n];
        for i in 0..n {
            for j in 0..n {
                similarity[i][j] = if i == j { 1.0 } else { cosine_similarity(&embeddings[i], &embeddings[j]) };
            }
        }

        let mut groups: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

        loop {
            if groups.len() < 2 {
                break;
            }
            let mut best: Option<(usize, usize, f32)> = None;
            for a in 0..groups.len() {
                for b in (a + 1)..groups.len() {
                    let mut total = 0.0f32;
                    let mut pairs = 0usize;
                    for &i in &groups[a] {
                        for &j in &groups[b] {
                            total += similarity[i][j];
                            pairs += 1;
                        }
                    }
                    let average = if pairs > 0 { total / pairs as f32 } else { 0.0 };
                    if best.map(|(_, _, best_sim)| average > best_sim).unwrap_or(true) {
                        best = Some((a, b, average));
                    }
                }
            }

            match best {
                Some((a, b, average)) if average >= MERGE_SIMILARITY_FLOOR => {
                    let merged = groups[b].clone();
                    groups[a].extend(merged);
                    groups.remove(b);
                }
                _ => break,
            }
        }

        groups
            .into_iter()
            .filter_map(|group| {
                let mut pairwise_total = 0.0f32;
                let mut pairwise_pairs = 0usize;
                for &i in &group {
                    for &j in &group {
                        if i != j {
                            pairwise_total += similarity[i][j];
                            pairwise_pairs += 1;
                        }
                    }
                }
                let mean_pairwise = if pairwise_pairs > 0 { pairwise_total / pairwise_pairs as f32 } else { 1.0 };

                // A multi-member group that never really agreed isn't a cluster
                // worth reporting (spec §4.6 "discard below 0.50").
                if group.len() >= 2 && mean_pairwise < DISCARD_FLOOR {
                    return None;
                }

                let members: Vec<&ClusterItem> = group.iter().map(|&i| &items[i]).collect();
                let platforms_covered: Vec<Platform> = {
                    let mut set: Vec<Platform> = members.iter().map(|m| m.platform).collect();
                    set.sort();
                    set.dedup();
                    set
                };

                let correlation_type = if group.len() >= 2 { CorrelationType::from_similarity(mean_pairwise) } else { None };

                let average_intensity = members.iter().map(|m| m.intensity).sum::<f32>() / members.len() as f32;

                Some(Cluster {
                    cluster_id: cluster_id_for(&members),
                    member_signal_ids: members.iter().map(|m| m.signal_id).collect(),
                    universal: platforms_covered.len() >= 3,
                    platforms_covered,
                    dominant_problem_type: mode_problem_type(&members),
                    correlation_type,
                    tight_temporal_alignment: self.is_tightly_aligned(&members),
                    average_intensity,
                })
            })
            .collect()
    }
}
