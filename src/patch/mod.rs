//! Sparse partial updates driven by per-entity field descriptor tables.
//!
//! Every admin update endpoint funnels its payload through [`SparsePatch`]:
//! the payload is a JSON object in which absent or `null` keys mean "leave
//! unchanged". Present keys are validated and encoded according to the
//! entity's [`EntitySchema`], and the resulting assignments are applied to a
//! single row in one `UPDATE` statement.

use serde_json::{Map, Value};
use sqlx::sqlite::SqliteArguments;
use sqlx::query::Query;
use sqlx::Sqlite;
use thiserror::Error;

use crate::db::{encode_list, flag_to_int, split_csv, DbPool};

/// Storage encoding of a patchable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Real,
    /// Boolean stored as integer 0/1
    Flag,
    /// List of strings stored as JSON array text. Also accepts a
    /// comma-separated string.
    TextList,
}

impl FieldKind {
    fn expected(self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Integer => "an integer",
            FieldKind::Real => "a number",
            FieldKind::Flag => "a boolean",
            FieldKind::TextList => "a list of strings or a comma-separated string",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Patchable shape of one table
#[derive(Debug)]
pub struct EntitySchema {
    /// Name used in error messages ("Car not found")
    pub label: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
}

/// An encoded value ready to bind
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("No fields to update")]
    NoFieldsToUpdate,

    #[error("Invalid value for '{field}': expected {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

/// A validated, non-empty set of column assignments for one entity
#[derive(Debug, Clone)]
pub struct SparsePatch {
    schema: &'static EntitySchema,
    assignments: Vec<(&'static str, FieldValue)>,
}

impl SparsePatch {
    /// Build a patch from a JSON object. Keys unknown to the schema are
    /// ignored. Fails with `NoFieldsToUpdate` when nothing remains.
    pub fn parse(
        schema: &'static EntitySchema,
        input: &Map<String, Value>,
    ) -> Result<Self, PatchError> {
        let mut assignments = Vec::new();
        for spec in schema.fields {
            let Some(raw) = input.get(spec.name) else {
                continue;
            };
            if let Some(value) = encode_field(spec, raw)? {
                assignments.push((spec.name, value));
            }
        }

        if assignments.is_empty() {
            return Err(PatchError::NoFieldsToUpdate);
        }

        Ok(Self {
            schema,
            assignments,
        })
    }

    /// Same as [`SparsePatch::parse`] for an arbitrary JSON value; anything
    /// other than an object carries no fields.
    pub fn from_value(
        schema: &'static EntitySchema,
        input: Option<&Value>,
    ) -> Result<Self, PatchError> {
        match input {
            Some(Value::Object(map)) => Self::parse(schema, map),
            _ => Err(PatchError::NoFieldsToUpdate),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.assignments
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// The UPDATE statement for this patch; the row id is the last parameter.
    pub fn to_sql(&self) -> String {
        let set_clause = self
            .assignments
            .iter()
            .map(|(name, _)| format!("{} = ?", name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("UPDATE {} SET {} WHERE id = ?", self.schema.table, set_clause)
    }

    /// Apply all assignments to row `id` in a single statement.
    pub async fn apply(&self, pool: &DbPool, id: i64) -> Result<(), PatchError> {
        let sql = self.to_sql();
        let mut query = sqlx::query(&sql);
        for (_, value) in &self.assignments {
            query = bind_value(query, value);
        }

        let result = query.bind(id).execute(pool).await?;
        if result.rows_affected() == 0 {
            return Err(PatchError::NotFound(self.schema.label));
        }

        tracing::debug!(
            table = self.schema.table,
            id,
            fields = self.assignments.len(),
            "Applied partial update"
        );
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &FieldValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        FieldValue::Text(s) => query.bind(s.clone()),
        FieldValue::Integer(i) => query.bind(*i),
        FieldValue::Real(f) => query.bind(*f),
    }
}

/// Encode one submitted value. `Ok(None)` means "leave unchanged".
pub fn encode_field(spec: &FieldSpec, raw: &Value) -> Result<Option<FieldValue>, PatchError> {
    let invalid = || PatchError::InvalidField {
        field: spec.name,
        expected: spec.kind.expected(),
    };

    if raw.is_null() {
        return Ok(None);
    }

    let value = match spec.kind {
        FieldKind::Text => FieldValue::Text(raw.as_str().ok_or_else(invalid)?.to_string()),
        FieldKind::Integer => FieldValue::Integer(as_integer(raw).ok_or_else(invalid)?),
        FieldKind::Real => FieldValue::Real(as_real(raw).ok_or_else(invalid)?),
        FieldKind::Flag => FieldValue::Integer(flag_to_int(as_flag(raw).ok_or_else(invalid)?)),
        FieldKind::TextList => FieldValue::Text(encode_list(&as_list(raw).ok_or_else(invalid)?)),
    };
    Ok(Some(value))
}

const I64_MIN_F64: f64 = i64::MIN as f64;
// i64::MAX rounds up to 2^63 as a float, which is itself out of range
const I64_MAX_EXCLUSIVE_F64: f64 = i64::MAX as f64;

/// Integer from a JSON number or numeric string
pub(crate) fn as_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| {
                    f.fract() == 0.0 && (I64_MIN_F64..I64_MAX_EXCLUSIVE_F64).contains(f)
                })
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_real(raw: &Value) -> Option<f64> {
    let f = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    f.is_finite().then_some(f)
}

fn as_flag(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_list(raw: &Value) -> Option<Vec<String>> {
    match raw {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        Value::String(s) => Some(split_csv(s)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_memory, CAR_SCHEMA, LAST_TRIP_SCHEMA};
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    async fn insert_car(pool: &DbPool) -> i64 {
        sqlx::query(
            "INSERT INTO cars (name, model, price_per_day, seats, transmission, fuel_type, images, description, available)
             VALUES ('Swift', 'VXI', 1500.0, 5, 'manual', 'petrol', '[]', 'city car', 1)",
        )
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[test]
    fn test_empty_patch_rejected() {
        let err = SparsePatch::parse(&CAR_SCHEMA, &Map::new()).unwrap_err();
        assert!(matches!(err, PatchError::NoFieldsToUpdate));
    }

    #[test]
    fn test_nulls_and_unknown_keys_are_not_changes() {
        let input = object(json!({ "name": null, "colour": "red" }));
        let err = SparsePatch::parse(&CAR_SCHEMA, &input).unwrap_err();
        assert!(matches!(err, PatchError::NoFieldsToUpdate));
    }

    #[test]
    fn test_non_object_payload_has_no_fields() {
        let err = SparsePatch::from_value(&CAR_SCHEMA, Some(&json!([1, 2]))).unwrap_err();
        assert!(matches!(err, PatchError::NoFieldsToUpdate));
        let err = SparsePatch::from_value(&CAR_SCHEMA, None).unwrap_err();
        assert!(matches!(err, PatchError::NoFieldsToUpdate));
    }

    #[test]
    fn test_sql_only_names_supplied_fields() {
        let input = object(json!({ "seats": 7, "available": false }));
        let patch = SparsePatch::parse(&CAR_SCHEMA, &input).unwrap();
        assert_eq!(
            patch.to_sql(),
            "UPDATE cars SET seats = ?, available = ? WHERE id = ?"
        );
        assert_eq!(patch.get("available"), Some(&FieldValue::Integer(0)));
    }

    #[test]
    fn test_type_mismatch_names_field() {
        let input = object(json!({ "seats": "many" }));
        match SparsePatch::parse(&CAR_SCHEMA, &input).unwrap_err() {
            PatchError::InvalidField { field, .. } => assert_eq!(field, "seats"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let input = object(json!({ "days": "4", "persons": 2.0 }));
        let patch = SparsePatch::parse(&LAST_TRIP_SCHEMA, &input).unwrap();
        assert_eq!(patch.get("days"), Some(&FieldValue::Integer(4)));
        assert_eq!(patch.get("persons"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn test_out_of_range_float_is_not_an_integer() {
        assert_eq!(as_integer(&json!(1e30)), None);
        assert_eq!(as_integer(&json!(-1e30)), None);
        assert_eq!(as_integer(&json!(9.3e18)), None);
        assert_eq!(as_integer(&json!(4.0e18)), Some(4_000_000_000_000_000_000));

        let input = object(json!({ "seats": 1e30 }));
        match SparsePatch::parse(&CAR_SCHEMA, &input).unwrap_err() {
            PatchError::InvalidField { field, .. } => assert_eq!(field, "seats"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_list_and_csv_encode_identically() {
        let native =
            SparsePatch::parse(&LAST_TRIP_SCHEMA, &object(json!({ "spots": ["X", "Y"] }))).unwrap();
        let legacy =
            SparsePatch::parse(&LAST_TRIP_SCHEMA, &object(json!({ "spots": "X, Y" }))).unwrap();
        assert_eq!(native.get("spots"), legacy.get("spots"));
    }

    #[test]
    fn test_list_with_non_string_item_rejected() {
        let input = object(json!({ "images": ["a.jpg", 3] }));
        assert!(matches!(
            SparsePatch::parse(&CAR_SCHEMA, &input),
            Err(PatchError::InvalidField { field: "images", .. })
        ));
    }

    #[tokio::test]
    async fn test_apply_changes_only_supplied_fields() {
        let pool = connect_memory().await.unwrap();
        let id = insert_car(&pool).await;

        let patch =
            SparsePatch::parse(&CAR_SCHEMA, &object(json!({ "price_per_day": 1800 }))).unwrap();
        patch.apply(&pool, id).await.unwrap();

        let (name, price, seats, description): (String, f64, i64, Option<String>) =
            sqlx::query_as("SELECT name, price_per_day, seats, description FROM cars WHERE id = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(name, "Swift");
        assert_eq!(price, 1800.0);
        assert_eq!(seats, 5);
        assert_eq!(description.as_deref(), Some("city car"));
    }

    #[tokio::test]
    async fn test_apply_missing_row_is_not_found() {
        let pool = connect_memory().await.unwrap();
        let patch = SparsePatch::parse(&CAR_SCHEMA, &object(json!({ "name": "Ghost" }))).unwrap();
        let err = patch.apply(&pool, 404).await.unwrap_err();
        assert!(matches!(err, PatchError::NotFound("Car")));
    }
}
