pub mod event;
pub mod event_template;
pub mod refresh_token;
pub mod subscriber;
pub mod user;

use std::str::FromStr;

use sqlx::postgres::PgRow;
use sqlx::Row;
use statuspage_core::types::ParseEnumError;

/// Read a text column into one of the closed domain enumerations.
pub(crate) fn decode_enum<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: ParseEnumError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Nullable variant of [`decode_enum`].
pub(crate) fn decode_optional_enum<T>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| {
        s.parse().map_err(|e: ParseEnumError| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
    })
    .transpose()
}
