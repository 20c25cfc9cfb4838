pub mod date_input;

use tui::layout::{Constraint, Direction, Layout, Rect};
use tui::widgets::ListState;

/// Rect of the given percentage size centered in `r`, for popups.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Move the selection one row down, wrapping to the top.
pub fn select_next(list_state: &mut ListState, len: usize) {
    if len == 0 {
        return;
    }
    let i = match list_state.selected() {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    };
    list_state.select(Some(i));
}

/// Move the selection one row up, wrapping to the bottom.
pub fn select_previous(list_state: &mut ListState, len: usize) {
    if len == 0 {
        return;
    }
    let i = match list_state.selected() {
        Some(0) | None => len - 1,
        Some(i) => i - 1,
    };
    list_state.select(Some(i));
}

/// Initial list state for `len` rows: first row selected if there is one.
pub fn first_selected(len: usize) -> ListState {
    let mut list_state = ListState::default();
    if len > 0 {
        list_state.select(Some(0));
    }
    list_state
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_wraps_both_ways() {
        let mut state = first_selected(3);
        select_previous(&mut state, 3);
        assert_eq!(state.selected(), Some(2));
        select_next(&mut state, 3);
        assert_eq!(state.selected(), Some(0));
    }

    #[test]
    fn empty_list_has_no_selection() {
        let mut state = first_selected(0);
        select_next(&mut state, 0);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn popup_is_inside_parent() {
        let parent = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(50, 20, parent);
        assert!(popup.width > 0 && popup.width <= 50);
        assert!(popup.right() <= parent.right() && popup.bottom() <= parent.bottom());
        assert!(popup.x > 0 && popup.y > 0);
    }
}
