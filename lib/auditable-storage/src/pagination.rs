use serde::Deserialize;

use crate::{Clause, Params, StorageError, Value};

/// Largest page a caller may request.
pub const MAX_ITEMS_PER_PAGE: i64 = 500;

/// Sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl Order {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Page/size/order request for list reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaginationRequest {
    /// Disable LIMIT/OFFSET entirely.
    #[serde(skip)]
    pub show_all: bool,
    pub page: i64,
    pub items_per_page: i64,
    pub order_by_field: Option<String>,
    pub order_by_direction: Order,
    /// Caller-owned ORDER BY expression, used verbatim.
    #[serde(skip)]
    pub order_custom: Option<String>,
}

impl PaginationRequest {
    pub fn page(page: i64, items_per_page: i64) -> Self {
        Self {
            page,
            items_per_page,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self {
            show_all: true,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, order: Order) -> Self {
        self.order_by_field = Some(field.into());
        self.order_by_direction = order;
        self
    }

    pub fn order_custom(mut self, expression: impl Into<String>) -> Self {
        self.order_custom = Some(expression.into());
        self
    }

    /// Check page bounds. Call before [`PaginationRequest::build`].
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.show_all {
            return Ok(());
        }
        if self.page < 1 {
            return Err(StorageError::Validation(format!(
                "page must be at least 1, got {}",
                self.page
            )));
        }
        if !(1..=MAX_ITEMS_PER_PAGE).contains(&self.items_per_page) {
            return Err(StorageError::Validation(format!(
                "items_per_page must be between 1 and {}, got {}",
                MAX_ITEMS_PER_PAGE, self.items_per_page
            )));
        }
        if (self.page - 1).checked_mul(self.items_per_page).is_none() {
            return Err(StorageError::Validation(format!(
                "page {} is out of range",
                self.page
            )));
        }
        Ok(())
    }

    /// Render ORDER BY / LIMIT / OFFSET.
    pub fn build(&self) -> Clause {
        let mut parts = Vec::new();
        let mut params = Params::new();

        match (&self.order_custom, &self.order_by_field) {
            (Some(custom), _) if !custom.trim().is_empty() => {
                parts.push(custom.trim().to_string());
            }
            (_, Some(field)) if !field.is_empty() => {
                parts.push(format!(
                    "ORDER BY {} {}",
                    field,
                    self.order_by_direction.as_sql()
                ));
            }
            _ => {}
        }

        if !self.show_all {
            parts.push("LIMIT :limit OFFSET :offset".to_string());
            params.insert("limit".to_string(), Value::Int(self.items_per_page));
            params.insert(
                "offset".to_string(),
                Value::Int((self.page - 1) * self.items_per_page),
            );
        }

        Clause::new(parts.join(" "), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_without_order() {
        let clause = PaginationRequest::page(1, 10).build();
        assert_eq!(clause.sql, "LIMIT :limit OFFSET :offset");
        assert_eq!(clause.params["limit"], Value::Int(10));
        assert_eq!(clause.params["offset"], Value::Int(0));
    }

    #[test]
    fn offset_is_page_minus_one_times_size() {
        let clause = PaginationRequest::page(3, 20).build();
        assert_eq!(clause.params["offset"], Value::Int(40));
    }

    #[test]
    fn show_all_never_limits() {
        let clause = PaginationRequest::all()
            .order_by("name", Order::Desc)
            .build();
        assert_eq!(clause.sql, "ORDER BY name DESC");
        assert!(!clause.sql.contains("LIMIT"));
        assert!(clause.params.is_empty());
    }

    #[test]
    fn custom_order_wins() {
        let clause = PaginationRequest::page(2, 5)
            .order_by("name", Order::Asc)
            .order_custom("ORDER BY FIELD(status, 'open', 'closed')")
            .build();
        assert_eq!(
            clause.sql,
            "ORDER BY FIELD(status, 'open', 'closed') LIMIT :limit OFFSET :offset"
        );
    }

    #[test]
    fn validation_bounds() {
        assert!(PaginationRequest::page(1, 500).validate().is_ok());
        assert!(PaginationRequest::page(0, 10).validate().is_err());
        assert!(PaginationRequest::page(1, 0).validate().is_err());
        assert!(PaginationRequest::page(1, 501).validate().is_err());
        assert!(PaginationRequest::all().validate().is_ok());
    }

    #[test]
    fn offset_overflow_fails_validation() {
        let request = PaginationRequest::page(i64::MAX / 100, 500);
        assert!(matches!(
            request.validate(),
            Err(StorageError::Validation(_))
        ));
        assert!(PaginationRequest::page(i64::MAX / 500 + 1, 500).validate().is_ok());
    }

    #[test]
    fn deserializes_request_body() {
        let request: PaginationRequest = serde_json::from_str(
            r#"{"page": 2, "items_per_page": 25, "order_by_field": "name", "order_by_direction": "DESC"}"#,
        )
        .unwrap();
        assert_eq!(request.page, 2);
        assert_eq!(request.order_by_direction, Order::Desc);
        assert!(!request.show_all);
    }
}
