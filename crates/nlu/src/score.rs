use std::collections::HashMap;

use crate::model::{NluEntity, ParsedEntity, ScoredEntity};

/// Score parsed entities against the known entity set.
///
/// `score = confidence * weight`, with an unset weight counting as 1.
/// Entities the platform does not know about are dropped.
pub fn compute_prediction_score(
    parsed: &[ParsedEntity],
    known: &HashMap<String, NluEntity>,
) -> Vec<ScoredEntity> {
    parsed
        .iter()
        .filter_map(|p| {
            let entity = known.get(&p.entity)?;
            Some(ScoredEntity {
                parsed: p.clone(),
                score: p.confidence * entity.weight.unwrap_or(1.0),
            })
        })
        .collect()
}
