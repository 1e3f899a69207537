//! Error types for the grid.
//!
//! Nothing in the row model or the selection engine returns these to the
//! caller: a [`GridError`] is reported once through the shared
//! [`WarnOnce`] logger and the offending unit of work is skipped. The only
//! fallible public surface is configuration loading, which returns
//! [`ConfigError`].

use std::path::PathBuf;

use arbor_core::WarnOnce;

/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Non-fatal problems detected while applying data or selection changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// An operation that needs the row id callback ran without one.
    #[error("{operation} requires a row id callback, none was provided")]
    MissingRowIdCallback { operation: &'static str },

    /// A transaction item referenced an id that is not in the id map.
    #[error("could not find row id={id}, data item was not found for this id")]
    RowIdNotFound { id: String },

    /// A transaction item had no id callback and no leaf holds the same record.
    #[error("could not find data item as object was not found")]
    RowDataNotFound,

    /// Two leaves resolved to the same id while building nodes.
    #[error("duplicate node id '{id}' detected from row data, the last row with this id wins")]
    DuplicateRowId { id: String },

    /// Selection was requested for a pinned row.
    #[error("cannot select pinned rows")]
    PinnedRowSelection,

    /// Selection was requested for a node whose id is not known yet.
    #[error("cannot select node until it has finished loading")]
    MissingNodeId,

    /// More than one node was targeted while only single selection is allowed.
    #[error("cannot multi select {count} nodes while row selection mode is single")]
    MultiSelectNotAllowed { count: usize },

    /// Select-all was requested while only single selection is allowed.
    #[error("cannot select all rows while row selection mode is single")]
    SelectAllRequiresMultiRow,

    /// A selection call arrived while row selection is disabled.
    #[error("cannot {operation} while row selection is not enabled")]
    SelectionNotEnabled { operation: &'static str },
}

impl GridError {
    /// Create a missing id callback error.
    pub fn missing_row_id_callback(operation: &'static str) -> Self {
        Self::MissingRowIdCallback { operation }
    }

    /// Create an id lookup error.
    pub fn row_id_not_found(id: impl Into<String>) -> Self {
        Self::RowIdNotFound { id: id.into() }
    }

    /// Create a duplicate id error.
    pub fn duplicate_row_id(id: impl Into<String>) -> Self {
        Self::DuplicateRowId { id: id.into() }
    }

    /// Key used to report this error through [`WarnOnce`].
    ///
    /// Errors tied to one row include the row id, so every distinct row is
    /// reported once.
    pub fn warn_key(&self) -> String {
        match self {
            Self::MissingRowIdCallback { operation } => format!("missing-row-id-callback:{operation}"),
            Self::RowIdNotFound { id } => format!("row-id-not-found:{id}"),
            Self::RowDataNotFound => "row-data-not-found".to_owned(),
            Self::DuplicateRowId { id } => format!("duplicate-row-id:{id}"),
            Self::PinnedRowSelection => "pinned-row-selection".to_owned(),
            Self::MissingNodeId => "missing-node-id".to_owned(),
            Self::MultiSelectNotAllowed { .. } => "multi-select-not-allowed".to_owned(),
            Self::SelectAllRequiresMultiRow => "select-all-requires-multi-row".to_owned(),
            Self::SelectionNotEnabled { operation } => format!("selection-not-enabled:{operation}"),
        }
    }

    /// Log this error once through `logger`.
    pub fn report(&self, logger: &WarnOnce) {
        logger.warn_once(&self.warn_key(), self);
    }
}

/// Errors that can occur while loading grid options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parsing error.
    #[error("invalid TOML grid options: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error.
    #[error("invalid JSON grid options: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("failed to read grid options '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension names no supported format.
    #[error("unsupported grid options format '{path}', expected .toml or .json")]
    UnsupportedFormat { path: PathBuf },

    /// A value parsed but is not usable.
    #[error("invalid value for option '{option}': {message}")]
    InvalidValue { option: String, message: String },
}

impl ConfigError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a value error.
    pub fn invalid_value(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            option: option.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_key_includes_row_id() {
        let a = GridError::row_id_not_found("7");
        let b = GridError::row_id_not_found("8");
        assert_ne!(a.warn_key(), b.warn_key());
        assert_eq!(
            a.to_string(),
            "could not find row id=7, data item was not found for this id"
        );
    }

    #[test]
    fn test_report_logs_once() {
        let logger = WarnOnce::new();
        GridError::PinnedRowSelection.report(&logger);
        GridError::PinnedRowSelection.report(&logger);
        assert_eq!(logger.warned_count(), 1);
        assert!(logger.has_warned("pinned-row-selection"));
    }
}
