/// Columns skipped when a [`Mode`] names neither a skip nor an only list.
pub const DEFAULT_SKIP_COLUMNS: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];

/// Column-selection policy for inserts and updates.
///
/// - `only` non-empty: a column participates iff it is listed.
/// - otherwise `skip` non-empty: a column participates iff it is not listed.
/// - both empty: [`DEFAULT_SKIP_COLUMNS`] are skipped, and unless
///   `auto_timestamp` is set the builder stamps `created_at`/`updated_at`
///   itself instead of relying on store defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mode {
    pub skip: Vec<String>,
    pub only: Vec<String>,
    pub auto_timestamp: bool,
}

impl Mode {
    /// Default skip set, timestamps stamped by the builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default skip set, timestamps left to the store.
    pub fn auto_timestamp() -> Self {
        Self {
            auto_timestamp: true,
            ..Self::default()
        }
    }

    /// Skip the given columns.
    pub fn skip<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Only the given columns participate.
    pub fn only<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            only: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_auto_timestamp(mut self, auto_timestamp: bool) -> Self {
        self.auto_timestamp = auto_timestamp;
        self
    }

    /// Whether `column` takes part in a mutation under this policy.
    pub fn participates(&self, column: &str) -> bool {
        if !self.only.is_empty() {
            return self.only.iter().any(|c| c == column);
        }
        if !self.skip.is_empty() {
            return !self.skip.iter().any(|c| c == column);
        }
        !DEFAULT_SKIP_COLUMNS.contains(&column)
    }

    /// Whether the builder must stamp `created_at`/`updated_at` explicitly.
    pub fn stamps_timestamps(&self) -> bool {
        self.only.is_empty() && self.skip.is_empty() && !self.auto_timestamp
    }

    /// Filter `columns` down to the participating ones, keeping their order.
    pub fn select<'a>(&self, columns: &[&'a str]) -> Vec<&'a str> {
        columns
            .iter()
            .copied()
            .filter(|c| self.participates(c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[&str] = &["id", "name", "email", "created_at", "updated_at", "deleted_at"];

    #[test]
    fn default_mode_skips_key_and_timestamps() {
        let mode = Mode::new();
        assert_eq!(mode.select(COLUMNS), vec!["name", "email"]);
        assert!(mode.stamps_timestamps());
        assert!(!Mode::auto_timestamp().stamps_timestamps());
    }

    #[test]
    fn only_takes_precedence_over_skip() {
        let mode = Mode {
            skip: vec!["email".to_string()],
            only: vec!["email".to_string(), "id".to_string()],
            auto_timestamp: false,
        };
        assert_eq!(mode.select(COLUMNS), vec!["id", "email"]);
        assert!(!mode.stamps_timestamps());
    }

    #[test]
    fn explicit_skip_replaces_default_set() {
        let mode = Mode::skip(["id"]);
        assert_eq!(
            mode.select(COLUMNS),
            vec!["name", "email", "created_at", "updated_at", "deleted_at"]
        );
        assert!(!mode.stamps_timestamps());
    }
}
