//! Studio hierarchy resolution over the flat studio list fetched from the
//! catalog. Parent links in catalog data can be cyclic (operator error), so
//! every walk carries a visited set and stops on a revisit instead of
//! erroring. Only a genuinely missing record is an error.

use std::collections::HashSet;

use thiserror::Error;

use crate::model::Studio;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("studio '{0}' not found in studio list")]
    NotFound(String),
}

pub fn find_by_id<'a>(id: &str, studios: &'a [Studio]) -> Option<&'a Studio> {
    studios.iter().find(|s| s.id == id)
}

/// Case-insensitive name lookup.
pub fn find_by_name<'a>(name: &str, studios: &'a [Studio]) -> Option<&'a Studio> {
    let lower = name.to_lowercase();
    studios.iter().find(|s| s.name.to_lowercase() == lower)
}

/// Returns the studio's parent record, or the studio itself when it has no
/// parent reference. The studio and its declared parent must both be present
/// in `studios`.
pub fn parent_of<'a>(studio: &Studio, studios: &'a [Studio]) -> Result<&'a Studio, StudioError> {
    let current = find_by_id(&studio.id, studios)
        .ok_or_else(|| StudioError::NotFound(studio.id.clone()))?;

    let Some(parent_ref) = &current.parent_studio else {
        return Ok(current);
    };

    find_by_id(&parent_ref.id, studios).ok_or_else(|| StudioError::NotFound(parent_ref.id.clone()))
}

/// Top-most ancestor of the studio's parent chain. Stops at the studio whose
/// next parent was already visited, so cyclic data terminates at the last
/// studio before the cycle closes.
pub fn family_of<'a>(studio: &Studio, studios: &'a [Studio]) -> Result<&'a Studio, StudioError> {
    let mut current = find_by_id(&studio.id, studios)
        .ok_or_else(|| StudioError::NotFound(studio.id.clone()))?;

    let mut visited: HashSet<&str> = HashSet::from([current.id.as_str()]);

    loop {
        let parent = parent_of(current, studios)?;
        if visited.contains(parent.id.as_str()) {
            return Ok(current);
        }
        visited.insert(parent.id.as_str());
        current = parent;
    }
}

/// Full ancestor chain including the studio itself, root-first.
pub fn hierarchy_of<'a>(
    studio: &Studio,
    studios: &'a [Studio],
) -> Result<Vec<&'a Studio>, StudioError> {
    let mut current = find_by_id(&studio.id, studios)
        .ok_or_else(|| StudioError::NotFound(studio.id.clone()))?;

    let mut chain = vec![current];
    let mut visited: HashSet<&str> = HashSet::from([current.id.as_str()]);

    loop {
        let parent = parent_of(current, studios)?;
        if visited.contains(parent.id.as_str()) {
            break;
        }
        chain.push(parent);
        visited.insert(parent.id.as_str());
        current = parent;
    }

    chain.reverse();
    Ok(chain)
}

/// True iff `studio` is `ancestor` itself or nested under it.
pub fn is_descendant_of(
    studio: &Studio,
    ancestor: &Studio,
    studios: &[Studio],
) -> Result<bool, StudioError> {
    let mut current = find_by_id(&studio.id, studios)
        .ok_or_else(|| StudioError::NotFound(studio.id.clone()))?;
    let ancestor = find_by_id(&ancestor.id, studios)
        .ok_or_else(|| StudioError::NotFound(ancestor.id.clone()))?;

    if current.id == ancestor.id {
        return Ok(true);
    }

    let mut visited: HashSet<&str> = HashSet::from([current.id.as_str()]);

    loop {
        current = parent_of(current, studios)?;
        if current.id == ancestor.id {
            return Ok(true);
        }
        if visited.contains(current.id.as_str()) {
            return Ok(false);
        }
        visited.insert(current.id.as_str());
    }
}
