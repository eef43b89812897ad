//! Text column widths. The Postgres schema is generated from these, so a value
//! that passes validation always fits its column.

use stockledger_core::{DomainError, DomainResult};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_SKU_LEN: usize = 100;
pub const MAX_LOCATION_LEN: usize = 255;
pub const MAX_REFERENCE_LEN: usize = 255;
pub const MAX_NOTES_LEN: usize = 1000;

/// Length is counted in characters, as `VARCHAR(n)` does.
pub(crate) fn check_len(field: &str, value: &str, max: usize) -> DomainResult<()> {
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} cannot exceed {max} characters"
        )));
    }
    Ok(())
}
