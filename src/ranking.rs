use serde::Serialize;

use crate::model::SafetyAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankStyle {
    pub label: &'static str,
    pub color: &'static str,
}

pub const SAFEST: RankStyle = RankStyle { label: "Safest Route", color: "#28a745" };
pub const BALANCED: RankStyle = RankStyle { label: "Balanced Route", color: "#ffc107" };
pub const FASTEST: RankStyle = RankStyle { label: "Fastest Route", color: "#dc3545" };

pub fn style_for_rank(rank: usize) -> RankStyle {
    match rank {
        0 => SAFEST,
        1 => BALANCED,
        _ => FASTEST,
    }
}

/// Anything that carries an assessment can be ranked.
pub trait Scored {
    fn assessment(&self) -> &SafetyAssessment;
}

impl Scored for SafetyAssessment {
    fn assessment(&self) -> &SafetyAssessment {
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Ranked<T> {
    pub rank: usize,
    pub original_index: usize,
    #[serde(flatten)]
    pub style: RankStyle,
    #[serde(flatten)]
    pub item: T,
}

/// Sorts by safety score, highest first, and labels by position.
/// Equal scores keep their input order.
pub fn rank_routes<T: Scored>(items: Vec<T>) -> Vec<Ranked<T>> {
    let mut indexed: Vec<(usize, T)> = items.into_iter().enumerate().collect();
    indexed.sort_by(|(_, a), (_, b)| {
        b.assessment()
            .safety_score
            .total_cmp(&a.assessment().safety_score)
    });

    indexed
        .into_iter()
        .enumerate()
        .map(|(rank, (original_index, item))| Ranked {
            rank,
            original_index,
            style: style_for_rank(rank),
            item,
        })
        .collect()
}
