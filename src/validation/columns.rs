//! Column extraction from loosely typed Arrow arrays
//!
//! Raw exports carry numbers as strings, dates as strings or temporal types,
//! and the occasional nested column. Everything is cast with Arrow's safe cast
//! (unparseable cells become null) and read into plain vectors.

use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Read a column as optional strings. Blank strings count as null.
///
/// Returns `None` if the column cannot be represented as text.
pub(crate) fn strings(column: &ArrayRef) -> Option<Vec<Option<String>>> {
    let casted = cast(column, &DataType::Utf8).ok()?;
    let array = casted.as_any().downcast_ref::<StringArray>()?;
    Some(
        (0..array.len())
            .map(|i| {
                if array.is_null(i) {
                    return None;
                }
                let value = array.value(i).trim();
                (!value.is_empty()).then(|| value.to_string())
            })
            .collect(),
    )
}

/// Read a column as optional `f64`. NaN and infinities are preserved.
///
/// Returns `None` if the column type has no numeric cast.
pub(crate) fn numbers(column: &ArrayRef) -> Option<Vec<Option<f64>>> {
    let casted = cast(column, &DataType::Float64).ok()?;
    let array = casted.as_any().downcast_ref::<Float64Array>()?;
    Some(
        (0..array.len())
            .map(|i| (!array.is_null(i)).then(|| array.value(i)))
            .collect(),
    )
}

/// Read a column as optional dates. Unparseable cells are `None`.
pub(crate) fn dates(column: &ArrayRef) -> Vec<Option<NaiveDate>> {
    match column.data_type() {
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            temporal_dates(column).unwrap_or_else(|| vec![None; column.len()])
        }
        _ => strings(column).map_or_else(
            || vec![None; column.len()],
            |values| {
                values
                    .into_iter()
                    .map(|value| value.as_deref().and_then(parse_date))
                    .collect()
            },
        ),
    }
}

fn temporal_dates(column: &ArrayRef) -> Option<Vec<Option<NaiveDate>>> {
    let casted = cast(column, &DataType::Date32).ok()?;
    let array = casted.as_any().downcast_ref::<Date32Array>()?;
    Some(
        (0..array.len())
            .map(|i| {
                if array.is_null(i) {
                    None
                } else {
                    array.value_as_date(i)
                }
            })
            .collect(),
    )
}

/// Parse the date formats seen in advertising exports.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }

    None
}
