use crate::{
    catalog::{ArithFn, Operator},
    error::{ErrorClass, ErrorOrigin, InternalError},
    state::{ElementType, MedianState, Storage},
    value::Value,
};

///
/// Averaging
///
/// Operators used to average the two middle values of an even-count group.
/// Resolved only when such a group is finalized.
///

struct Averaging {
    plus: Operator<ArithFn>,
    divide: Operator<ArithFn>,
    two: Value,
}

impl Averaging {
    fn resolve(element: &ElementType) -> Result<Self, InternalError> {
        let ops = element.ops();
        match (ops.plus(), ops.divide(), ops.literal(2)) {
            (Some(plus), Some(divide), Some(two)) => Ok(Self { plus, divide, two }),
            _ => Err(InternalError::configuration(
                ErrorOrigin::Finalize,
                format!(
                    "no arithmetic operator available for averaging values of type {}",
                    element.name()
                ),
            )),
        }
    }

    fn mean(&self, lower: &Value, upper: &Value) -> Result<Value, InternalError> {
        let sum = (self.plus.func)(lower, upper)?;

        (self.divide.func)(&sum, &self.two)
    }
}

/// Consume a state and compute its median.
///
/// Empty states yield `None`. Odd counts return the middle value; even
/// counts return the type's mean of the two middle values.
pub(crate) fn finalize(state: MedianState) -> Result<Option<Value>, InternalError> {
    let MedianState {
        element,
        storage,
        row_count,
    } = state;

    if row_count == 0 {
        return Ok(None);
    }

    let even = row_count % 2 == 0;
    let averaging = if even {
        Some(Averaging::resolve(&element)?)
    } else {
        None
    };

    let (lower, upper) = middle_values(storage, &element, row_count)?;
    match (averaging, lower) {
        (Some(averaging), Some(lower)) => averaging.mean(&lower, &upper).map(Some),
        (None, _) => Ok(Some(upper)),
        (Some(_), None) => Err(short_read(row_count)),
    }
}

// Returns the lower middle value (even counts only) and the value at
// index `row_count / 2` of the ascending order.
fn middle_values(
    storage: Storage,
    element: &ElementType,
    row_count: u64,
) -> Result<(Option<Value>, Value), InternalError> {
    let mid = row_count / 2;
    let even = row_count % 2 == 0;

    match storage {
        Storage::Buffer(mut buffer) => {
            let sorted = buffer.sorted_view(element.compare().func);
            let mid = usize::try_from(mid).map_err(|_| short_read(row_count))?;
            let upper = sorted.get(mid).cloned().ok_or_else(|| short_read(row_count))?;
            let lower = if even {
                Some(
                    sorted
                        .get(mid - 1)
                        .cloned()
                        .ok_or_else(|| short_read(row_count))?,
                )
            } else {
                None
            };

            Ok((lower, upper))
        }
        Storage::Sort(mut sort) => {
            sort.perform_sort()?;

            let lead = if even { mid - 1 } else { mid };
            if sort.skip(lead)? != lead {
                return Err(short_read(row_count));
            }
            let lower = if even { sort.next()? } else { None };
            let upper = sort.next()?.ok_or_else(|| short_read(row_count))?;

            Ok((lower, upper))
        }
    }
}

fn short_read(row_count: u64) -> InternalError {
    InternalError::new(
        ErrorClass::Internal,
        ErrorOrigin::Finalize,
        format!("storage holds fewer than the {row_count} rows recorded by the state"),
    )
}
