use crate::{
    config::MedianConfig,
    error::{ErrorOrigin, InternalError},
    state::{MedianState, Storage},
};

/// Build a fresh state holding a copy of `src`.
///
/// The new state adopts `src`'s element type and is allocated with the
/// configured strategy, pre-sized to `src`'s row count when buffer-backed.
pub(crate) fn adopt(src: &MedianState, config: &MedianConfig) -> Result<MedianState, InternalError> {
    let rows = usize::try_from(src.row_count).map_err(|_| {
        InternalError::resource_exhausted(
            ErrorOrigin::State,
            format!("{} rows cannot be held in memory", src.row_count),
        )
    })?;
    let mut dest = MedianState::with_expected_rows(src.element.clone(), config, rows)?;
    copy_values(&mut dest, src)?;

    Ok(dest)
}

/// Append a copy of every value of `src` to `dest`.
pub(crate) fn merge_into(dest: &mut MedianState, src: &MedianState) -> Result<(), InternalError> {
    if !dest.element.is_compatible(&src.element) {
        return Err(InternalError::state_misuse(format!(
            "cannot merge median state over {} ({}, {}) into state over {} ({}, {})",
            src.element.name(),
            src.element.type_id(),
            src.element.compare().id,
            dest.element.name(),
            dest.element.type_id(),
            dest.element.compare().id,
        )));
    }

    if let Storage::Buffer(buffer) = &mut dest.storage {
        let total = dest
            .row_count
            .checked_add(src.row_count)
            .and_then(|total| usize::try_from(total).ok())
            .ok_or_else(|| {
                InternalError::resource_exhausted(
                    ErrorOrigin::State,
                    "merged row count cannot be held in memory",
                )
            })?;
        buffer.reserve_exact_total(total)?;
    }

    copy_values(dest, src)
}

fn copy_values(dest: &mut MedianState, src: &MedianState) -> Result<(), InternalError> {
    src.for_each_value(|value| dest.push(value.clone()))
}
