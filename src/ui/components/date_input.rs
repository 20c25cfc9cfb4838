use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

use crate::schedule::recurrence::days_in_month;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

impl DatePart {
    fn width(self) -> usize {
        match self {
            DatePart::Year => 4,
            DatePart::Month | DatePart::Day => 2,
        }
    }

    fn next(self) -> Self {
        match self {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        }
    }

    fn previous(self) -> Self {
        match self {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        }
    }
}

/// Field-by-field date entry. An optional input starts empty and can be
/// cleared with Delete; a required one always holds a date.
pub struct DateInputState {
    date: Option<NaiveDate>,
    fallback: NaiveDate,
    optional: bool,
    pub editing: bool,
    pub date_part: DatePart,
    buffer: String,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            fallback: date,
            optional: false,
            editing: false,
            date_part: DatePart::Year,
            buffer: String::new(),
        }
    }

    /// Starts empty; typing begins from `fallback`.
    pub fn optional(fallback: NaiveDate) -> Self {
        Self {
            date: None,
            optional: true,
            ..Self::new(fallback)
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        self.date_part = DatePart::Year;
        self.buffer.clear();
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
        self.buffer.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.buffer.push(c);
                if self.buffer.len() == self.date_part.width() {
                    self.commit_buffer();
                    self.date_part = self.date_part.next();
                }
            }
            KeyCode::Backspace => {
                self.buffer.pop();
            }
            KeyCode::Delete if self.optional => {
                self.date = None;
                self.buffer.clear();
            }
            KeyCode::Right => {
                self.date_part = self.date_part.next();
                self.buffer.clear();
            }
            KeyCode::Left => {
                self.date_part = self.date_part.previous();
                self.buffer.clear();
            }
            _ => {}
        }
    }

    fn commit_buffer(&mut self) {
        let Ok(value) = self.buffer.parse::<u32>() else {
            self.buffer.clear();
            return;
        };
        self.buffer.clear();

        let base = self.date.unwrap_or(self.fallback);
        let (mut year, mut month, mut day) = (base.year(), base.month(), base.day());
        match self.date_part {
            DatePart::Year if (1900..=2100).contains(&value) => year = value as i32,
            DatePart::Month if (1..=12).contains(&value) => month = value,
            DatePart::Day if value >= 1 => day = value,
            _ => return,
        }
        if self.date_part == DatePart::Day && day > days_in_month(year, month) {
            return;
        }

        // moving to a shorter month keeps the day valid
        let day = day.min(days_in_month(year, month));
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            self.date = Some(date);
        }
    }

    pub fn get_display_string(&self) -> String {
        let Some(date) = self.date.or(self.editing.then_some(self.fallback)) else {
            return "Not set".to_string();
        };
        if !self.editing {
            return date.format("%Y-%m-%d").to_string();
        }

        let mut parts = [
            format!("{:04}", date.year()),
            format!("{:02}", date.month()),
            format!("{:02}", date.day()),
        ];
        let index = match self.date_part {
            DatePart::Year => 0,
            DatePart::Month => 1,
            DatePart::Day => 2,
        };
        let placeholder = match self.date_part {
            DatePart::Year => "YYYY",
            DatePart::Month => "MM",
            DatePart::Day => "DD",
        };
        parts[index] = if self.buffer.is_empty() {
            format!("[{placeholder}]")
        } else {
            format!("[{}]", self.buffer)
        };
        parts.join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_digits(state: &mut DateInputState, digits: &str) {
        for c in digits.chars() {
            state.handle_input(KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_all_parts_sets_the_date() {
        let mut state = DateInputState::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        state.toggle_editing();
        type_digits(&mut state, "20250314");

        assert_eq!(state.date(), NaiveDate::from_ymd_opt(2025, 3, 14));
    }

    #[test]
    fn impossible_day_is_ignored() {
        let mut state = DateInputState::new(NaiveDate::from_ymd_opt(2023, 2, 10).unwrap());
        state.toggle_editing();
        state.date_part = DatePart::Day;
        type_digits(&mut state, "30");

        assert_eq!(state.date(), NaiveDate::from_ymd_opt(2023, 2, 10));
    }

    #[test]
    fn month_change_clamps_day() {
        let mut state = DateInputState::new(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        state.toggle_editing();
        state.date_part = DatePart::Month;
        type_digits(&mut state, "02");

        assert_eq!(state.date(), NaiveDate::from_ymd_opt(2024, 2, 29));
    }

    #[test]
    fn optional_input_can_be_cleared() {
        let fallback = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut state = DateInputState::optional(fallback);
        assert_eq!(state.get_display_string(), "Not set");

        state.toggle_editing();
        state.date_part = DatePart::Day;
        type_digits(&mut state, "15");
        assert_eq!(state.date(), NaiveDate::from_ymd_opt(2024, 6, 15));

        state.handle_input(KeyCode::Delete);
        assert_eq!(state.date(), None);
    }

    #[test]
    fn display_marks_the_active_part() {
        let mut state = DateInputState::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        state.toggle_editing();
        state.handle_input(KeyCode::Right);
        assert_eq!(state.get_display_string(), "2024-[MM]-01");

        state.handle_input(KeyCode::Char('1'));
        assert_eq!(state.get_display_string(), "2024-[1]-01");
    }
}
