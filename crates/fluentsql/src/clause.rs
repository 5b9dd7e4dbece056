//! Clause formatters composed by the query builder.
//!
//! Each function renders one clause of a SELECT and is independent of the
//! others. Empty inputs render to `None` so callers can skip the clause.

use crate::dialect::Dialect;

/// A joined table and its `ON` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table: String,
    pub on: String,
}

impl Join {
    pub fn new(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            on: on.into(),
        }
    }
}

impl<T: Into<String>, O: Into<String>> From<(T, O)> for Join {
    fn from((table, on): (T, O)) -> Self {
        Join::new(table, on)
    }
}

/// Join flavor, rendered in this order by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Right,
    Inner,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Inner => "JOIN",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Numeric convention: `-1` is descending, anything else ascending.
    pub fn from_sign(sign: i64) -> Self {
        if sign == -1 {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Paging state as recorded by `skip` / `limit` / `slice`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    pub skip: Option<u64>,
    pub size: Option<u64>,
    /// `(start, count)`; wins over `skip`/`size` when set.
    pub slice: Option<(u64, u64)>,
}

impl Paging {
    /// Resolve to `(offset, count)`, or `None` when no row bound exists.
    ///
    /// `skip` alone never produces a LIMIT: paging is only emitted when the
    /// row count is bounded.
    pub fn resolve(&self) -> Option<(Option<u64>, u64)> {
        if let Some((start, count)) = self.slice {
            return Some((Some(start), count));
        }
        match self.size {
            Some(size) if size > 0 => Some((self.skip, size)),
            _ => None,
        }
    }
}

/// `SELECT a,b` (defaults to `*` when no fields are given).
pub fn select(fields: &[String]) -> String {
    if fields.is_empty() {
        "SELECT *".to_string()
    } else {
        format!("SELECT {}", fields.join(","))
    }
}

/// `LEFT JOIN t ON ... LEFT JOIN u ON ...`
pub fn join(kind: JoinKind, joins: &[Join]) -> Option<String> {
    if joins.is_empty() {
        return None;
    }
    let parts: Vec<String> = joins
        .iter()
        .map(|j| format!("{} {} ON {}", kind.keyword(), j.table, j.on))
        .collect();
    Some(parts.join(" "))
}

/// `ORDER BY a ASC, b DESC`
pub fn sort(keys: &[(String, SortOrder)]) -> Option<String> {
    if keys.is_empty() {
        return None;
    }
    let parts: Vec<String> = keys
        .iter()
        .map(|(field, order)| format!("{field} {}", order.keyword()))
        .collect();
    Some(format!("ORDER BY {}", parts.join(", ")))
}

/// `LIMIT ...` from the resolved paging state.
pub fn limit(paging: &Paging, dialect: Dialect) -> Option<String> {
    paging
        .resolve()
        .map(|(offset, count)| dialect.limit(offset, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_defaults_to_star() {
        assert_eq!(select(&[]), "SELECT *");
        assert_eq!(select(&["id".into(), "name".into()]), "SELECT id,name");
    }

    #[test]
    fn joins_keep_order() {
        let joins = vec![
            Join::new("roles r", "u.role_id = r.id"),
            Join::from(("teams t", "u.team_id = t.id")),
        ];
        assert_eq!(
            join(JoinKind::Left, &joins).unwrap(),
            "LEFT JOIN roles r ON u.role_id = r.id LEFT JOIN teams t ON u.team_id = t.id"
        );
        assert_eq!(join(JoinKind::Inner, &joins[..1]).unwrap(), "JOIN roles r ON u.role_id = r.id");
        assert_eq!(join(JoinKind::Right, &[]), None);
    }

    #[test]
    fn sort_clause() {
        let keys = vec![
            ("name".to_string(), SortOrder::from_sign(1)),
            ("age".to_string(), SortOrder::from_sign(-1)),
        ];
        assert_eq!(sort(&keys).unwrap(), "ORDER BY name ASC, age DESC");
        assert_eq!(sort(&[]), None);
    }

    #[test]
    fn paging_resolution() {
        let slice = Paging {
            skip: Some(3),
            size: Some(4),
            slice: Some((0, 10)),
        };
        assert_eq!(limit(&slice, Dialect::MySql).as_deref(), Some("LIMIT 0,10"));

        let skip_only = Paging {
            skip: Some(5),
            ..Paging::default()
        };
        assert_eq!(limit(&skip_only, Dialect::MySql), None);

        let size_only = Paging {
            size: Some(3),
            ..Paging::default()
        };
        assert_eq!(limit(&size_only, Dialect::MySql).as_deref(), Some("LIMIT 3"));

        let skip_and_size = Paging {
            skip: Some(5),
            size: Some(3),
            slice: None,
        };
        assert_eq!(limit(&skip_and_size, Dialect::MySql).as_deref(), Some("LIMIT 5,3"));
        assert_eq!(
            limit(&skip_and_size, Dialect::Postgres).as_deref(),
            Some("LIMIT 3 OFFSET 5")
        );

        let zero_size = Paging {
            size: Some(0),
            ..Paging::default()
        };
        assert_eq!(limit(&zero_size, Dialect::MySql), None);
    }
}
