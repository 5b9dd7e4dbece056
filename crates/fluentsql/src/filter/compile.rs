use super::{Condition, FieldMap, FilterExpr, Range};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// Compile a filter into predicate SQL, without the `WHERE` keyword.
///
/// Compilation is pure: the same filter and dialect always produce the same
/// text. Fragments are collected first and joined once, so no dangling
/// `AND`/`OR` is ever produced.
///
/// Raw and predicate SQL are used verbatim. An empty top-level [`FieldMap`]
/// compiles to `""`.
pub fn compile(expr: &FilterExpr, dialect: Dialect) -> SqlResult<String> {
    match expr {
        FilterExpr::Raw(sql) => Ok(sql.clone()),
        FilterExpr::Predicate(f) => Ok(f.call()),
        FilterExpr::Conjunction { logic, terms } => {
            if terms.is_empty() {
                return Err(SqlError::validation("conjunction must have at least one term"));
            }
            let parts = terms
                .iter()
                .map(|term| compile_term(term, dialect).map(|sql| format!("({sql})")))
                .collect::<SqlResult<Vec<_>>>()?;
            Ok(parts.join(logic.separator()))
        }
        FilterExpr::Fields(fields) => compile_fields(fields, dialect),
    }
}

/// Compile a filter into a full `WHERE ...` clause.
///
/// Returns `None` when the filter compiles to nothing or only whitespace.
pub fn where_clause(expr: &FilterExpr, dialect: Dialect) -> SqlResult<Option<String>> {
    let predicate = compile(expr, dialect)?;
    if predicate.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(format!("WHERE {predicate}")))
    }
}

/// A term nested inside a conjunction must produce something to parenthesize.
fn compile_term(term: &FilterExpr, dialect: Dialect) -> SqlResult<String> {
    let sql = compile(term, dialect)?;
    if sql.trim().is_empty() {
        return Err(SqlError::validation("conjunction term compiles to an empty predicate"));
    }
    Ok(sql)
}

fn compile_fields(fields: &FieldMap, dialect: Dialect) -> SqlResult<String> {
    let clauses = fields
        .iter()
        .map(|(field, condition)| compile_condition(field, condition, dialect))
        .collect::<SqlResult<Vec<_>>>()?;
    Ok(clauses.join(" AND "))
}

fn compile_condition(field: &str, condition: &Condition, dialect: Dialect) -> SqlResult<String> {
    let sql = match condition {
        Condition::Like(pattern) => format!("{field} LIKE {}", pattern.render(dialect)),
        Condition::RawSql(sql) => format!("{field} {sql}"),
        Condition::In(values) => format!("{field} IN ({})", render_list(values, dialect)),
        Condition::Between(bounds) => match bounds.as_slice() {
            [low, high] => format!(
                "{field} BETWEEN {} AND {}",
                low.render(dialect),
                high.render(dialect)
            ),
            _ => {
                return Err(SqlError::validation(format!(
                    "BETWEEN on `{field}` needs exactly 2 bounds, got {}",
                    bounds.len()
                )));
            }
        },
        Condition::Range(range) => compile_range(field, range, dialect)?,
        Condition::ExplicitEq(value) | Condition::Equals(value) => {
            format!("{field} = {}", value.render(dialect))
        }
    };
    Ok(sql)
}

fn compile_range(field: &str, range: &Range, dialect: Dialect) -> SqlResult<String> {
    let mut parts = Vec::with_capacity(2);
    if let Some(lower) = &range.lower {
        let op = if lower.inclusive { ">=" } else { ">" };
        parts.push(format!("{field} {op} {}", lower.value.render(dialect)));
    }
    if let Some(upper) = &range.upper {
        let op = if upper.inclusive { "<=" } else { "<" };
        parts.push(format!("{field} {op} {}", upper.value.render(dialect)));
    }
    if parts.is_empty() {
        return Err(SqlError::validation(format!("range on `{field}` has no bounds")));
    }
    Ok(parts.join(" AND "))
}

fn render_list(values: &[Value], dialect: Dialect) -> String {
    values
        .iter()
        .map(|v| v.render(dialect))
        .collect::<Vec<_>>()
        .join(",")
}
