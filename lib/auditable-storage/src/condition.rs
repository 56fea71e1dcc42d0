//! Fluent WHERE-clause accumulation.
//!
//! A [`Condition`] collects `AND`/`OR` fragments with named parameters and
//! materializes them into a [`Clause`] meant to follow a base `WHERE 1=1`.
//! Zero-valued inputs are dropped, so optional filters can be passed through
//! unconditionally.

use crate::{Params, Value};

/// A SQL fragment and the named parameters it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clause {
    pub sql: String,
    pub params: Params,
}

impl Clause {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A fragment without parameters.
    pub fn text(sql: impl Into<String>) -> Self {
        Self::new(sql, Params::new())
    }

    /// Scope by primary key: `AND id = :id`.
    pub fn by_id(value: impl Into<Value>) -> Self {
        Self::by_field("id", value)
    }

    /// `AND <column> = :<column>`.
    pub fn by_field(column: &str, value: impl Into<Value>) -> Self {
        let mut params = Params::new();
        params.insert(column.to_string(), value.into());
        Self::new(format!("AND {} = :{}", column, column), params)
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }

    /// Append another clause, merging its parameters.
    pub fn and(mut self, other: Clause) -> Self {
        let joined = format!("{} {}", self.sql.trim(), other.sql.trim());
        self.sql = joined.trim().to_string();
        self.params.extend(other.params);
        self
    }
}

/// How a fragment joins the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    And,
    Or,
}

impl Joiner {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Joiner::And => "AND",
            Joiner::Or => "OR",
        }
    }
}

/// Comparison applied by a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Like,
    NotLike,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }

    fn is_like(&self) -> bool {
        matches!(self, Operator::Like | Operator::NotLike)
    }
}

/// Lower-case `value` and wrap it for a substring LIKE match.
pub fn like_pattern(value: &str) -> String {
    format!("%{}%", value.to_lowercase())
}

/// Ordered accumulator of WHERE fragments.
///
/// Every `name` argument is the placeholder name; an empty name falls back to
/// the column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    fragments: Vec<String>,
    names: Vec<String>,
    params: Params,
}

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one fragment. A zero `value` leaves the condition untouched.
    pub fn add(
        mut self,
        joiner: Joiner,
        column: &str,
        name: &str,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        let value = value.into();
        if value.is_zero() {
            return self;
        }

        let name = if name.is_empty() { column } else { name };
        let (column, value) = if operator.is_like() {
            (
                format!("LOWER({})", column),
                Value::String(like_pattern(&value.to_text())),
            )
        } else {
            (column.to_string(), value)
        };

        self.fragments.push(format!(
            "{} {} {} :{}",
            joiner.as_sql(),
            column,
            operator.as_sql(),
            name
        ));
        self.bind(name, value);
        self
    }

    pub fn equal(self, column: &str, name: &str, value: impl Into<Value>) -> Self {
        self.add(Joiner::And, column, name, Operator::Eq, value)
    }

    pub fn not_equal(self, column: &str, name: &str, value: impl Into<Value>) -> Self {
        self.add(Joiner::And, column, name, Operator::Ne, value)
    }

    pub fn like(self, column: &str, name: &str, value: impl Into<Value>) -> Self {
        self.add(Joiner::And, column, name, Operator::Like, value)
    }

    pub fn not_like(self, column: &str, name: &str, value: impl Into<Value>) -> Self {
        self.add(Joiner::And, column, name, Operator::NotLike, value)
    }

    /// `LOWER(column) LIKE '%value%'`, lower-casing the value.
    pub fn equal_case_insensitive(self, column: &str, name: &str, value: impl Into<Value>) -> Self {
        self.add(Joiner::And, column, name, Operator::Like, value)
    }

    pub fn or_equal(self, column: &str, name: &str, value: impl Into<Value>) -> Self {
        self.add(Joiner::Or, column, name, Operator::Eq, value)
    }

    pub fn or_not_equal(self, column: &str, name: &str, value: impl Into<Value>) -> Self {
        self.add(Joiner::Or, column, name, Operator::Ne, value)
    }

    pub fn or_like(self, column: &str, name: &str, value: impl Into<Value>) -> Self {
        self.add(Joiner::Or, column, name, Operator::Like, value)
    }

    pub fn or_not_like(self, column: &str, name: &str, value: impl Into<Value>) -> Self {
        self.add(Joiner::Or, column, name, Operator::NotLike, value)
    }

    pub fn or_equal_case_insensitive(
        self,
        column: &str,
        name: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add(Joiner::Or, column, name, Operator::Like, value)
    }

    /// `<joiner> column IN (:name_0, :name_1, ...)`. An empty list is a no-op.
    pub fn in_list<I, V>(mut self, joiner: Joiner, column: &str, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let name = if name.is_empty() { column } else { name };
        let mut placeholders = Vec::new();
        for (idx, value) in values.into_iter().enumerate() {
            let param = format!("{}_{}", name, idx);
            placeholders.push(format!(":{}", param));
            self.bind(&param, value.into());
        }
        if placeholders.is_empty() {
            return self;
        }

        self.fragments.push(format!(
            "{} {} IN ({})",
            joiner.as_sql(),
            column,
            placeholders.join(", ")
        ));
        self
    }

    /// Append a caller-owned fragment verbatim, e.g. `AND deleted_at IS NULL`.
    pub fn raw(mut self, clause: Clause) -> Self {
        if clause.is_empty() {
            return self;
        }
        self.fragments.push(clause.sql.trim().to_string());
        for (name, value) in clause.params {
            self.bind(&name, value);
        }
        self
    }

    fn bind(&mut self, name: &str, value: Value) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
        self.params.insert(name.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Placeholder names in the order they were first added.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Materialize into clause text and parameters, fragments in insertion order.
    pub fn build(&self) -> Clause {
        Clause {
            sql: self.fragments.join(" "),
            params: self.params.clone(),
        }
    }
}

impl From<Condition> for Clause {
    fn from(condition: Condition) -> Self {
        Clause {
            sql: condition.fragments.join(" "),
            params: condition.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_are_skipped() {
        let base = Condition::new().equal("status", "", "active");
        let after = base
            .clone()
            .equal("name", "", "")
            .equal("age", "", 0i64)
            .like("email", "", None::<String>);
        assert_eq!(base.build(), after.build());
        assert_eq!(after.build().sql, "AND status = :status");
    }

    #[test]
    fn each_non_zero_value_adds_one_fragment_and_parameter() {
        let clause = Condition::new()
            .equal("t.id", "id", 7i64)
            .not_equal("status", "", "banned")
            .or_equal("role", "", "admin")
            .build();

        assert_eq!(
            clause.sql,
            "AND t.id = :id AND status != :status OR role = :role"
        );
        assert_eq!(clause.params.len(), 3);
        assert_eq!(clause.params["id"], Value::Int(7));
    }

    #[test]
    fn like_lowercases_both_sides() {
        let clause = Condition::new()
            .like("name", "q", "JoHn")
            .or_not_like("email", "", "Spam")
            .equal_case_insensitive("city", "", "Oslo")
            .build();

        assert_eq!(
            clause.sql,
            "AND LOWER(name) LIKE :q OR LOWER(email) NOT LIKE :email AND LOWER(city) LIKE :city"
        );
        assert_eq!(clause.params["q"], Value::from("%john%"));
        assert_eq!(clause.params["email"], Value::from("%spam%"));
        assert_eq!(clause.params["city"], Value::from("%oslo%"));
    }

    #[test]
    fn in_list_expands_placeholders() {
        let clause = Condition::new()
            .in_list(Joiner::And, "id", "ids", vec![1i64, 2, 3])
            .in_list(Joiner::And, "code", "", Vec::<String>::new())
            .build();

        assert_eq!(clause.sql, "AND id IN (:ids_0, :ids_1, :ids_2)");
        assert_eq!(clause.params.len(), 3);
        assert_eq!(clause.params["ids_2"], Value::Int(3));
    }

    #[test]
    fn empty_condition_yields_empty_clause() {
        let clause = Condition::new().build();
        assert!(clause.is_empty());
        assert!(clause.params.is_empty());
    }

    #[test]
    fn raw_fragments_keep_order_and_params() {
        let mut params = Params::new();
        params.insert("since".to_string(), Value::Int(3));
        let condition = Condition::new()
            .equal("status", "", "open")
            .raw(Clause::new("AND age > :since", params))
            .raw(Clause::default());

        assert_eq!(condition.names(), ["status", "since"]);
        let clause = Clause::from(condition);
        assert_eq!(clause.sql, "AND status = :status AND age > :since");
        assert_eq!(clause.params["since"], Value::Int(3));
    }

    #[test]
    fn clauses_concatenate() {
        let clause = Clause::by_id(7i64).and(Clause::text("AND deleted_at IS NULL"));
        assert_eq!(clause.sql, "AND id = :id AND deleted_at IS NULL");
        assert_eq!(clause.params["id"], Value::Int(7));
    }
}
