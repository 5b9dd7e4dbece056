//! JSON filter document grammar.
//!
//! ```text
//! filter    := string                      raw SQL
//!            | { "$and": [term, ...] }
//!            | { "$or":  [term, ...] }
//!            | { field: condition, ... }
//! condition := scalar                      col = scalar
//!            | { "$like": v } | { "$sql": "..." } | { "$in": [..] }
//!            | { "$between": [lo, hi] } | { "$eq": v }
//!            | { "$gt"|"$gte": v, "$lt"|"$lte": v }   (either or both)
//! ```

use super::{Condition, FieldMap, FilterExpr, Logic, Range};
use crate::error::{SqlError, SqlResult};
use crate::value::Value;
use serde_json::{Map, Value as Json};

pub(super) fn parse_filter(doc: &Json) -> SqlResult<FilterExpr> {
    match doc {
        Json::String(sql) => Ok(FilterExpr::Raw(sql.clone())),
        Json::Object(map) => parse_object(map),
        other => Err(SqlError::validation(format!(
            "filter must be a string or an object, got {other}"
        ))),
    }
}

fn parse_object(map: &Map<String, Json>) -> SqlResult<FilterExpr> {
    for (key, logic) in [("$and", Logic::And), ("$or", Logic::Or)] {
        let Some(terms) = map.get(key) else {
            continue;
        };
        if map.len() != 1 {
            return Err(SqlError::validation(format!(
                "`{key}` cannot be mixed with other keys in the same object"
            )));
        }
        let Json::Array(terms) = terms else {
            return Err(SqlError::validation(format!("`{key}` expects an array")));
        };
        let terms = terms.iter().map(parse_filter).collect::<SqlResult<Vec<_>>>()?;
        return Ok(FilterExpr::Conjunction { logic, terms });
    }

    let mut fields = FieldMap::new();
    for (field, condition) in map {
        if field.starts_with('$') {
            return Err(SqlError::validation(format!("unknown filter operator `{field}`")));
        }
        fields.insert(field.clone(), parse_condition(field, condition)?);
    }
    Ok(FilterExpr::Fields(fields))
}

fn parse_condition(field: &str, doc: &Json) -> SqlResult<Condition> {
    match doc {
        Json::Object(ops) => parse_operators(field, ops),
        Json::Array(_) => Err(SqlError::validation(format!(
            "`{field}`: arrays are only valid under `$in` or `$between`"
        ))),
        scalar => Ok(Condition::Equals(Value::from(scalar.clone()))),
    }
}

fn parse_operators(field: &str, ops: &Map<String, Json>) -> SqlResult<Condition> {
    let mut range = Range::new();
    let mut has_range = false;
    let mut single: Option<Condition> = None;

    for (op, arg) in ops {
        let condition = match op.as_str() {
            "$gt" | "$gte" | "$lt" | "$lte" => {
                let value = Value::from(arg.clone());
                range = match op.as_str() {
                    "$gt" => set_lower(field, range, value, false)?,
                    "$gte" => set_lower(field, range, value, true)?,
                    "$lt" => set_upper(field, range, value, false)?,
                    _ => set_upper(field, range, value, true)?,
                };
                has_range = true;
                continue;
            }
            "$like" => Condition::Like(Value::from(arg.clone())),
            "$eq" => Condition::ExplicitEq(Value::from(arg.clone())),
            "$sql" => match arg {
                Json::String(sql) => Condition::RawSql(sql.clone()),
                _ => {
                    return Err(SqlError::validation(format!(
                        "`{field}`: `$sql` expects a string"
                    )));
                }
            },
            "$in" => Condition::In(array_values(field, op, arg)?),
            "$between" => Condition::Between(array_values(field, op, arg)?),
            other => {
                return Err(SqlError::validation(format!(
                    "`{field}`: unknown filter operator `{other}`"
                )));
            }
        };
        if single.replace(condition).is_some() {
            return Err(conflict(field));
        }
    }

    match (single, has_range) {
        (Some(_), true) => Err(conflict(field)),
        (Some(condition), false) => Ok(condition),
        (None, true) => Ok(Condition::Range(range)),
        (None, false) => Err(SqlError::validation(format!(
            "`{field}`: empty operator object"
        ))),
    }
}

fn set_lower(field: &str, mut range: Range, value: Value, inclusive: bool) -> SqlResult<Range> {
    if range.lower.is_some() {
        return Err(SqlError::validation(format!(
            "`{field}`: `$gt` and `$gte` are mutually exclusive"
        )));
    }
    range = if inclusive { range.gte(value) } else { range.gt(value) };
    Ok(range)
}

fn set_upper(field: &str, mut range: Range, value: Value, inclusive: bool) -> SqlResult<Range> {
    if range.upper.is_some() {
        return Err(SqlError::validation(format!(
            "`{field}`: `$lt` and `$lte` are mutually exclusive"
        )));
    }
    range = if inclusive { range.lte(value) } else { range.lt(value) };
    Ok(range)
}

fn array_values(field: &str, op: &str, arg: &Json) -> SqlResult<Vec<Value>> {
    match arg {
        Json::Array(items) => Ok(items.iter().cloned().map(Value::from).collect()),
        _ => Err(SqlError::validation(format!("`{field}`: `{op}` expects an array"))),
    }
}

fn conflict(field: &str) -> SqlError {
    SqlError::validation(format!(
        "`{field}`: conflicting operators; only range bounds may be combined"
    ))
}
