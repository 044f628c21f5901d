use serde_json::Value;

use crate::error::HistoryError;
use crate::types::Role;

/// A history entry that passed validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedTurn<'a> {
    pub role: Role,
    /// Non-empty; entries are not inspected further.
    pub parts: &'a [Value],
}

/// Prior turns that are known to be well formed.
#[derive(Debug, Clone, Default)]
pub struct ValidatedHistory<'a> {
    pub turns: Vec<ValidatedTurn<'a>>,
}

impl ValidatedHistory<'_> {
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }
}

/// Check the shape of an optional prior-turn list.
///
/// Every JSON value either passes or fails with exactly one [`HistoryError`],
/// reported for the first offending element.
pub fn validate(history: &Value) -> Result<ValidatedHistory<'_>, HistoryError> {
    let items = history
        .as_array()
        .ok_or(HistoryError::InvalidShape("History must be a list"))?;

    let turns = items
        .iter()
        .map(validate_turn)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedHistory { turns })
}

fn validate_turn(item: &Value) -> Result<ValidatedTurn<'_>, HistoryError> {
    let obj = item
        .as_object()
        .ok_or(HistoryError::InvalidShape("Each item in history must be an object"))?;

    let (Some(role), Some(parts)) = (obj.get("role"), obj.get("parts")) else {
        return Err(HistoryError::InvalidShape(
            "Each item in history must contain 'role' and 'parts'",
        ));
    };

    let role = role
        .as_str()
        .and_then(Role::parse)
        .ok_or(HistoryError::InvalidRole)?;

    match parts.as_array() {
        Some(parts) if !parts.is_empty() => Ok(ValidatedTurn { role, parts }),
        _ => Err(HistoryError::EmptyParts),
    }
}
