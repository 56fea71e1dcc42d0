use crate::{Clause, Record};

/// Which rows of a soft-delete table a read or mutation may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Rows whose deletion marker is unset.
    Active,
    /// Rows whose deletion marker is set.
    SoftDeleted,
    /// Every row, regardless of the marker.
    All,
}

impl Visibility {
    /// Predicate selecting this set of rows, for a table with the given soft-delete flag.
    pub fn predicate(&self, soft_delete: bool) -> Clause {
        if !soft_delete {
            return Clause::default();
        }
        match self {
            Visibility::Active => Clause::text("AND deleted_at IS NULL"),
            Visibility::SoftDeleted => Clause::text("AND deleted_at IS NOT NULL"),
            Visibility::All => Clause::default(),
        }
    }
}

/// Static description of a table: name, selected columns, soft-delete flag
/// and the logical module recorded in audit entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    name: String,
    columns: Vec<String>,
    soft_delete: bool,
    module: String,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            soft_delete: false,
            module: String::new(),
        }
    }

    /// Descriptor selecting every column of `R`.
    pub fn for_record<R: Record>(name: impl Into<String>) -> Self {
        Self::new(name).with_columns(R::columns())
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_soft_delete(mut self, soft_delete: bool) -> Self {
        self.soft_delete = soft_delete;
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn soft_delete(&self) -> bool {
        self.soft_delete
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Column list for SELECT, `*` when none were declared.
    pub fn fields(&self) -> String {
        if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        }
    }

    /// Read predicate for this table: empty unless soft delete is enabled.
    pub fn visibility(&self, visibility: Visibility) -> Clause {
        visibility.predicate(self.soft_delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_delete_tables_hide_deleted_rows() {
        let table = TableDescriptor::new("users").with_soft_delete(true);
        assert_eq!(table.visibility(Visibility::Active).sql, "AND deleted_at IS NULL");
        assert_eq!(
            table.visibility(Visibility::SoftDeleted).sql,
            "AND deleted_at IS NOT NULL"
        );
        assert!(table.visibility(Visibility::All).is_empty());
    }

    #[test]
    fn plain_tables_never_filter() {
        let table = TableDescriptor::new("logs");
        assert!(table.visibility(Visibility::Active).is_empty());
        assert_eq!(table.fields(), "*");
    }
}
