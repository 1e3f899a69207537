//! Integration tests for loading grid options from files.

use std::io::Write;

use arbor_grid::{
    ClickSelection, ConfigError, Grid, GridCallbacks, GridOptions, GroupSelectsMode, RowSelectionMode, SelectAllScope,
};

fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("failed to create temp file");
    file.write_all(contents.as_bytes()).expect("failed to write config");
    file
}

#[test]
fn test_load_toml_file() {
    let file = write_config(
        ".toml",
        r#"
suppress_maintain_unsorted_order = true

[row_selection]
mode = "multiRow"
enable_click_selection = "enableSelection"
group_selects = "filteredDescendants"
select_all = "currentPage"

[grouping]
field = "team"
include_footer = true

[pagination]
page_size = 25
"#,
    );

    let options = GridOptions::load(file.path()).unwrap();
    let selection = options.row_selection.clone().unwrap();
    assert_eq!(selection.mode, RowSelectionMode::MultiRow);
    assert_eq!(selection.enable_click_selection, ClickSelection::EnableSelection);
    assert_eq!(selection.group_selects, GroupSelectsMode::FilteredDescendants);
    assert_eq!(selection.select_all, SelectAllScope::CurrentPage);
    assert!(selection.header_checkbox);
    assert!(options.suppress_maintain_unsorted_order);
    assert_eq!(options.grouping.field, "team");
    assert!(options.grouping.include_footer);
    assert_eq!(options.pagination.map(|p| p.page_size), Some(25));
}

#[test]
fn test_load_json_file() {
    let file = write_config(
        ".json",
        r#"{ "row_selection": { "mode": "singleRow", "enable_click_selection": "enabled" } }"#,
    );

    let options = GridOptions::load(file.path()).unwrap();
    let selection = options.row_selection.unwrap();
    assert_eq!(selection.mode, RowSelectionMode::SingleRow);
    assert_eq!(selection.enable_click_selection, ClickSelection::Enabled);
    assert_eq!(options.pagination, None);
}

#[test]
fn test_unsupported_extension() {
    let file = write_config(".yaml", "row_selection: {}");
    let err = GridOptions::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = GridOptions::load(&path).unwrap_err();
    match err {
        ConfigError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn test_invalid_values_rejected() {
    let file = write_config(".toml", "[pagination]\npage_size = 0\n");
    let err = GridOptions::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref option, .. } if option == "pagination.page_size"));

    let file = write_config(".json", r#"{ "row_selection": { "mode": "everything" } }"#);
    assert!(matches!(GridOptions::load(file.path()), Err(ConfigError::Json(_))));

    let file = write_config(".toml", "[grouping]\nfield = \"\"\n");
    assert!(matches!(
        GridOptions::load(file.path()),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn test_saved_options_load_back() {
    let options = GridOptions::default()
        .with_row_selection(
            arbor_grid::RowSelectionOptions::multi_row().with_group_selects(GroupSelectsMode::Descendants),
        )
        .with_pagination(10);
    let file = write_config(".toml", &options.to_toml_string().unwrap());

    assert_eq!(GridOptions::load(file.path()).unwrap(), options);
}

#[test]
fn test_grid_from_config_file() {
    let file = write_config(
        ".toml",
        "[row_selection]\nmode = \"multiRow\"\n\n[pagination]\npage_size = 2\n",
    );

    let callbacks = GridCallbacks::new().with_row_id(|n: &u32, _: i32| n.to_string());
    let mut grid = Grid::from_config_file(file.path(), callbacks).unwrap();
    grid.set_row_data((1..=5).map(std::sync::Arc::new).collect());

    assert!(grid.selection().is_multi_select());
    assert_eq!(grid.model().total_pages(), 3);

    grid.select_all(None);
    assert_eq!(grid.get_selection_count(), 5);
}

#[test]
fn test_grid_from_bad_config_file() {
    let file = write_config(".ini", "mode = multiRow");
    let result = Grid::<u32>::from_config_file(file.path(), GridCallbacks::new());
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
}
