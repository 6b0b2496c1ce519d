//! Shaping of the performer list for `{performers}` and
//! `{performers_stash_ids}`: gender exclusion, then ordering, then the
//! count limit, always in that order.

use crate::config::{PerformerOrder, PerformersConfig};
use crate::model::{Gender, Performer};

pub fn shape<'a>(performers: &'a [Performer], config: &PerformersConfig) -> Vec<&'a Performer> {
    let mut kept = exclude_genders(performers, &config.exclude_genders);
    order_by(&mut kept, config.order_by);
    if let Some(limit) = config.limit {
        kept.truncate(limit);
    }
    kept
}

fn exclude_genders<'a>(performers: &'a [Performer], excluded: &[Gender]) -> Vec<&'a Performer> {
    if excluded.is_empty() {
        return performers.iter().collect();
    }
    performers
        .iter()
        .filter(|p| !p.gender.is_some_and(|g| excluded.contains(&g)))
        .collect()
}

fn order_by(performers: &mut [&Performer], order: PerformerOrder) {
    match order {
        PerformerOrder::Id => performers.sort_by_key(|p| p.id),
        PerformerOrder::Name => performers.sort_by(|a, b| a.name.cmp(&b.name)),
    }
}
