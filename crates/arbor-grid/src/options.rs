//! Grid configuration.
//!
//! Serialisable settings live in [`GridOptions`] and can be loaded from TOML
//! or JSON. Behaviour that needs code (row ids, selectability, grouping keys)
//! is supplied separately through [`GridCallbacks`], since closures cannot be
//! serialised.
//!
//! # Example
//!
//! ```
//! use arbor_grid::options::{GridOptions, RowSelectionMode};
//!
//! let options = GridOptions::from_toml_str(r#"
//!     [row_selection]
//!     mode = "multiRow"
//!     group_selects = "descendants"
//! "#).unwrap();
//!
//! let selection = options.row_selection.unwrap();
//! assert_eq!(selection.mode, RowSelectionMode::MultiRow);
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::node::RowNode;

/// Whether one or many rows may be selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowSelectionMode {
    /// At most one row is selected at a time.
    #[default]
    SingleRow,
    /// Any number of rows may be selected.
    MultiRow,
}

/// How selecting a group row relates to its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupSelectsMode {
    /// A group row is selected on its own, like a leaf.
    #[default]
    #[serde(rename = "self")]
    SelfOnly,
    /// Selecting a group selects every descendant; the group state is derived.
    Descendants,
    /// Like `Descendants`, but only descendants passing the filter.
    FilteredDescendants,
}

impl GroupSelectsMode {
    /// Whether group state is derived from the children.
    pub fn selects_children(self) -> bool {
        !matches!(self, Self::SelfOnly)
    }
}

/// Which rows a select-all acts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectAllScope {
    /// Every row.
    #[default]
    All,
    /// Rows passing the filter.
    Filtered,
    /// Rows on the current page.
    CurrentPage,
}

/// Whether clicking a row selects or deselects it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClickSelection {
    /// Clicks never change the selection.
    #[default]
    Disabled,
    /// Clicks select but never deselect.
    EnableSelection,
    /// Clicks deselect but never select.
    EnableDeselection,
    /// Clicks select and deselect.
    Enabled,
}

impl ClickSelection {
    /// Whether a click may select a row.
    pub fn selects(self) -> bool {
        matches!(self, Self::EnableSelection | Self::Enabled)
    }

    /// Whether a click may deselect a row.
    pub fn deselects(self) -> bool {
        matches!(self, Self::EnableDeselection | Self::Enabled)
    }
}

/// Row selection settings. Selection is disabled when absent from
/// [`GridOptions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowSelectionOptions {
    pub mode: RowSelectionMode,
    pub enable_click_selection: ClickSelection,
    /// In multi-row mode, a plain click adds to the selection instead of
    /// replacing it.
    pub enable_selection_without_keys: bool,
    pub group_selects: GroupSelectsMode,
    pub select_all: SelectAllScope,
    /// Show the select-all checkbox in the header.
    pub header_checkbox: bool,
}

impl Default for RowSelectionOptions {
    fn default() -> Self {
        Self {
            mode: RowSelectionMode::SingleRow,
            enable_click_selection: ClickSelection::Disabled,
            enable_selection_without_keys: false,
            group_selects: GroupSelectsMode::SelfOnly,
            select_all: SelectAllScope::All,
            header_checkbox: true,
        }
    }
}

impl RowSelectionOptions {
    /// Multi-row selection with defaults otherwise.
    pub fn multi_row() -> Self {
        Self {
            mode: RowSelectionMode::MultiRow,
            ..Self::default()
        }
    }

    /// Single-row selection with defaults otherwise.
    pub fn single_row() -> Self {
        Self::default()
    }

    /// Set how group rows relate to their children.
    pub fn with_group_selects(mut self, mode: GroupSelectsMode) -> Self {
        self.group_selects = mode;
        self
    }

    /// Set the click behaviour.
    pub fn with_click_selection(mut self, click: ClickSelection) -> Self {
        self.enable_click_selection = click;
        self
    }

    /// Set the select-all scope.
    pub fn with_select_all(mut self, scope: SelectAllScope) -> Self {
        self.select_all = scope;
        self
    }

    /// Let plain clicks add to the selection.
    pub fn with_selection_without_keys(mut self, enabled: bool) -> Self {
        self.enable_selection_without_keys = enabled;
        self
    }

    /// Whether more than one row may be selected.
    pub fn is_multi_row(&self) -> bool {
        self.mode == RowSelectionMode::MultiRow
    }
}

/// Grouping settings for the built-in single-level grouping stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingOptions {
    /// Name of the grouped field, used in group ids.
    pub field: String,
    /// Whether new group rows start expanded.
    pub expanded_by_default: bool,
    /// Add a footer row after each group's children.
    pub include_footer: bool,
    /// Add a grand total footer after all rows.
    pub include_total_footer: bool,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            field: "group".to_owned(),
            expanded_by_default: true,
            include_footer: false,
            include_total_footer: false,
        }
    }
}

/// Pagination settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationOptions {
    pub page_size: usize,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

/// Serialisable grid settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    pub row_selection: Option<RowSelectionOptions>,
    /// Keep the existing leaf order on immutable updates, appending new rows.
    pub suppress_maintain_unsorted_order: bool,
    pub grouping: GroupingOptions,
    pub pagination: Option<PaginationOptions>,
}

impl GridOptions {
    /// Options with row selection enabled.
    pub fn with_row_selection(mut self, selection: RowSelectionOptions) -> Self {
        self.row_selection = Some(selection);
        self
    }

    /// Options with pagination enabled.
    pub fn with_pagination(mut self, page_size: usize) -> Self {
        self.pagination = Some(PaginationOptions { page_size });
        self
    }

    /// Parse options from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let options: Self = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Parse options from a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let options = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("json") => Self::from_json_str(&content)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };
        tracing::debug!(target: arbor_core::logging::targets::CONFIG, path = %path.display(), "loaded grid options");
        Ok(options)
    }

    /// Serialise to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("grid_options", e.to_string()))
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if let Some(pagination) = &self.pagination
            && pagination.page_size == 0
        {
            return Err(ConfigError::invalid_value(
                "pagination.page_size",
                "page size must be at least 1",
            ));
        }
        if self.grouping.field.is_empty() {
            return Err(ConfigError::invalid_value(
                "grouping.field",
                "group field name must not be empty",
            ));
        }
        Ok(())
    }
}

/// Resolves the id of a record: `(record, level) -> id`.
pub type GetRowId<T> = Arc<dyn Fn(&T, i32) -> String + Send + Sync>;

/// Decides whether a row may be selected.
pub type IsRowSelectable<T> = Arc<dyn Fn(&RowNode<T>) -> bool + Send + Sync>;

/// Returns the group value of a record.
pub type GroupKeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Keeps records for which it returns `true`.
pub type RowFilter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Code-supplied grid behaviour.
pub struct GridCallbacks<T> {
    pub get_row_id: Option<GetRowId<T>>,
    pub is_row_selectable: Option<IsRowSelectable<T>>,
    pub group_key: Option<GroupKeyFn<T>>,
}

impl<T> Default for GridCallbacks<T> {
    fn default() -> Self {
        Self {
            get_row_id: None,
            is_row_selectable: None,
            group_key: None,
        }
    }
}

impl<T> Clone for GridCallbacks<T> {
    fn clone(&self) -> Self {
        Self {
            get_row_id: self.get_row_id.clone(),
            is_row_selectable: self.is_row_selectable.clone(),
            group_key: self.group_key.clone(),
        }
    }
}

impl<T> std::fmt::Debug for GridCallbacks<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridCallbacks")
            .field("get_row_id", &self.get_row_id.is_some())
            .field("is_row_selectable", &self.is_row_selectable.is_some())
            .field("group_key", &self.group_key.is_some())
            .finish()
    }
}

impl<T> GridCallbacks<T> {
    /// No callbacks: ids come from the internal counter, every row is
    /// selectable and nothing is grouped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve row ids with `f`.
    pub fn with_row_id(mut self, f: impl Fn(&T, i32) -> String + Send + Sync + 'static) -> Self {
        self.get_row_id = Some(Arc::new(f));
        self
    }

    /// Decide selectability with `f`.
    pub fn with_row_selectable(
        mut self,
        f: impl Fn(&RowNode<T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_row_selectable = Some(Arc::new(f));
        self
    }

    /// Group leaves by the value `f` returns.
    pub fn with_group_key(mut self, f: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.group_key = Some(Arc::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_disable_selection() {
        let options = GridOptions::default();
        assert!(options.row_selection.is_none());
        assert!(!options.suppress_maintain_unsorted_order);
        assert!(options.pagination.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let options = GridOptions::from_toml_str(
            r#"
            suppress_maintain_unsorted_order = true

            [row_selection]
            mode = "multiRow"
            enable_click_selection = "enableDeselection"
            group_selects = "filteredDescendants"
            select_all = "currentPage"

            [pagination]
            page_size = 25
            "#,
        )
        .unwrap();

        let selection = options.row_selection.unwrap();
        assert_eq!(selection.mode, RowSelectionMode::MultiRow);
        assert!(selection.enable_click_selection.deselects());
        assert!(!selection.enable_click_selection.selects());
        assert_eq!(selection.group_selects, GroupSelectsMode::FilteredDescendants);
        assert_eq!(selection.select_all, SelectAllScope::CurrentPage);
        assert!(selection.header_checkbox);
        assert!(options.suppress_maintain_unsorted_order);
        assert_eq!(options.pagination.unwrap().page_size, 25);
    }

    #[test]
    fn test_parse_json_group_self() {
        let options = GridOptions::from_json_str(
            r#"{"row_selection": {"mode": "singleRow", "group_selects": "self"}}"#,
        )
        .unwrap();
        let selection = options.row_selection.unwrap();
        assert_eq!(selection.group_selects, GroupSelectsMode::SelfOnly);
        assert!(!selection.group_selects.selects_children());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = GridOptions::from_toml_str("[pagination]\npage_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err = GridOptions::from_json_str(r#"{"row_selection": {"mode": "many"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let options = GridOptions::default()
            .with_row_selection(RowSelectionOptions::multi_row())
            .with_pagination(10);
        let text = options.to_toml_string().unwrap();
        assert_eq!(GridOptions::from_toml_str(&text).unwrap(), options);
    }
}
