//! Integration tests for selection through the grid facade.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use arbor_grid::{
    CheckState, ChildSelection, ClickSelection, Grid, GridCallbacks, GridOptions, GroupSelectsMode, Modifiers, RowModel,
    RowFilter, RowRangeSelectionContext, RowSelectionOptions, SelectAllScope, SelectionEventSource, SetSelectedParams,
};

#[derive(Debug)]
struct Row {
    id: u32,
    team: &'static str,
}

fn rows(ids: &[u32]) -> Vec<Arc<Row>> {
    ids.iter()
        .map(|&id| {
            Arc::new(Row {
                id,
                team: if id <= 3 { "core" } else { "docs" },
            })
        })
        .collect()
}

fn clickable() -> GridOptions {
    GridOptions::default().with_row_selection(
        RowSelectionOptions::multi_row().with_click_selection(ClickSelection::Enabled),
    )
}

fn grid(options: GridOptions, ids: &[u32]) -> Grid<Row> {
    let callbacks = GridCallbacks::new().with_row_id(|r: &Row, _: i32| r.id.to_string());
    let mut grid = Grid::new(options, callbacks);
    grid.set_row_data(rows(ids));
    grid
}

fn grouped(options: GridOptions, ids: &[u32]) -> Grid<Row> {
    let callbacks = GridCallbacks::new()
        .with_row_id(|r: &Row, _: i32| r.id.to_string())
        .with_group_key(|r: &Row| r.team.to_owned());
    let mut grid = Grid::new(options, callbacks);
    grid.set_row_data(rows(ids));
    grid
}

fn selected(grid: &Grid<Row>) -> Vec<String> {
    grid.get_selection_state().unwrap_or_default()
}

fn count_selection_changed(grid: &Grid<Row>) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    grid.events().selection_changed.connect(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    count
}

fn assert_count_invariant(grid: &Grid<Row>) {
    let count = grid.get_selection_count();
    assert_eq!(count, grid.get_selected_nodes().len());
    assert_eq!(count, grid.get_selection_state().map_or(0, |ids| ids.len()));
}

#[test]
fn test_click_then_shift_click_extends_down() {
    let mut g = grid(clickable(), &[1, 2, 3]);
    g.handle_selection_event("2", Modifiers::NONE, SelectionEventSource::RowClicked);
    assert_eq!(selected(&g), vec!["2"]);

    g.handle_selection_event("3", Modifiers::shift(), SelectionEventSource::RowClicked);
    assert_eq!(selected(&g), vec!["2", "3"]);
    assert_count_invariant(&g);
}

#[test]
fn test_meta_click_deselects_one_row() {
    let mut g = grid(clickable(), &[1, 2, 3]);
    g.select_all(None);
    assert_eq!(g.get_selection_count(), 3);

    g.handle_selection_event("2", Modifiers::meta(), SelectionEventSource::RowClicked);
    assert_eq!(selected(&g), vec!["1", "3"]);
    assert_count_invariant(&g);
}

#[test]
fn test_group_selection_lists_leaves_only() {
    let options = GridOptions::default().with_row_selection(
        RowSelectionOptions::multi_row().with_group_selects(GroupSelectsMode::Descendants),
    );
    let mut g = grouped(options, &[1, 2, 3, 4]);
    let core = g.model().get_group_node("core").unwrap();

    g.set_nodes_selected(SetSelectedParams::new(vec![core], true, SelectionEventSource::Api));
    assert_eq!(selected(&g), vec!["1", "2", "3"]);
    assert_eq!(
        g.selection().calculate_selected_from_children(g.tree(), core),
        ChildSelection::Selected
    );
    assert_count_invariant(&g);
}

#[test]
fn test_shift_ctrl_after_deselect_releases_range() {
    let mut g = grid(clickable(), &[1, 2, 3, 4]);
    g.select_all(None);

    g.handle_selection_event("1", Modifiers::ctrl(), SelectionEventSource::RowClicked);
    assert_eq!(selected(&g), vec!["2", "3", "4"]);

    g.handle_selection_event("3", Modifiers::ctrl().with_shift(), SelectionEventSource::RowClicked);
    assert_eq!(selected(&g), vec!["4"]);
    assert_count_invariant(&g);
}

#[test]
fn test_plain_gesture_alternates() {
    let mut g = grid(clickable(), &[1, 2]);
    let source = SelectionEventSource::CheckboxSelected;

    g.handle_selection_event("1", Modifiers::NONE, source);
    assert_eq!(selected(&g), vec!["1"]);
    g.handle_selection_event("1", Modifiers::NONE, source);
    assert!(selected(&g).is_empty());
    g.handle_selection_event("1", Modifiers::NONE, source);
    assert_eq!(selected(&g), vec!["1"]);
}

#[test]
fn test_reselecting_changes_nothing() {
    let mut g = grid(clickable(), &[1, 2]);
    let key = g.get_row_node("1").unwrap();
    g.set_nodes_selected(SetSelectedParams::new(vec![key], true, SelectionEventSource::Api));

    let count = count_selection_changed(&g);
    let updated = g.set_nodes_selected(SetSelectedParams::new(vec![key], true, SelectionEventSource::Api));
    assert_eq!(updated, 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_selection_state_round_trip() {
    let mut first = grid(clickable(), &[1, 2, 3, 4]);
    first.handle_selection_event("3", Modifiers::NONE, SelectionEventSource::CheckboxSelected);
    first.handle_selection_event("1", Modifiers::NONE, SelectionEventSource::CheckboxSelected);
    let state = first.get_selection_state().unwrap();

    let mut second = grid(clickable(), &[1, 2, 3, 4]);
    second.set_selection_state(&state);

    let mut a = selected(&first);
    let mut b = selected(&second);
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn test_extend_then_truncate_at_end_discards_nothing() {
    let g = grid(clickable(), &[1, 2, 3, 4]);
    let model = g.model();
    let first = g.get_row_node("1").unwrap();
    let third = g.get_row_node("3").unwrap();

    let mut ctx = RowRangeSelectionContext::new();
    ctx.set_root(model, first);
    let extended = ctx.extend(model, third, false);
    assert_eq!(extended.keep.len(), 3);
    assert!(extended.discard.is_empty());

    let truncated = ctx.truncate(model, third);
    assert!(truncated.discard.is_empty());
    assert!(ctx.is_in_range(model, third));
    assert!(!truncated.keep.contains(&third));
}

#[test]
fn test_select_all_scopes_and_header_state() {
    let options = GridOptions::default()
        .with_row_selection(RowSelectionOptions::multi_row().with_select_all(SelectAllScope::Filtered));
    let mut g = grid(options, &[1, 2, 3, 4]);
    let even: RowFilter<Row> = Arc::new(|r: &Row| r.id % 2 == 0);
    g.set_filter(Some(even));

    let checkbox = g.toggle_header_checkbox();
    assert_eq!(selected(&g), vec!["2", "4"]);
    assert_eq!(checkbox.state, CheckState::Checked);
    assert_eq!(g.get_select_all_state(SelectAllScope::All), None);

    g.set_filter(None);
    assert_eq!(
        g.header_checkbox().state,
        CheckState::PartiallyChecked
    );

    g.toggle_header_checkbox();
    assert_eq!(g.get_selection_count(), 4);
}

#[test]
fn test_select_all_source_follows_scope() {
    let mut g = grid(clickable(), &[1, 2, 3]);
    let sources = Arc::new(Mutex::new(Vec::new()));
    let s = sources.clone();
    g.events()
        .selection_changed
        .connect(move |event| s.lock().unwrap().push(event.source));

    g.select_all(Some(SelectAllScope::Filtered));
    g.deselect_all(Some(SelectAllScope::CurrentPage));
    assert_eq!(
        *sources.lock().unwrap(),
        vec![
            SelectionEventSource::ApiSelectAllFiltered,
            SelectionEventSource::ApiSelectAllCurrentPage
        ]
    );
    assert_eq!(g.get_selection_count(), 0);
}

#[test]
fn test_row_model_exposes_first_displayed_row() {
    let g = grid(clickable(), &[5, 6]);
    assert_eq!(g.model().first_displayed_row(), g.get_row_node("5"));
}
