use std::ops::Range;

/// A row in one of the dashboard's selectable lists.
pub trait ListItem {
    fn display_text(&self) -> String;
    fn filter_text(&self) -> &str;
}

/// Selection index over a list whose length can change underneath it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    index: usize,
}

impl Selection {
    /// Selected index, or `None` for an empty list.
    pub fn current(&self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.index.min(len - 1))
        }
    }

    pub fn move_up(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    pub fn move_down(&mut self, len: usize) {
        if len > 0 && self.index + 1 < len {
            self.index += 1;
        }
    }

    pub fn select(&mut self, index: usize, len: usize) {
        self.index = index.min(len.saturating_sub(1));
    }

    pub fn select_last(&mut self, len: usize) {
        self.index = len.saturating_sub(1);
    }

    pub fn clamp(&mut self, len: usize) {
        self.index = self.index.min(len.saturating_sub(1));
    }
}

/// Next item after `from` whose filter text starts with `c`, wrapping
/// around. Case-insensitive.
pub fn next_match<T: ListItem>(items: &[T], from: usize, c: char) -> Option<usize> {
    let len = items.len();
    (1..=len).map(|step| (from + step) % len).find(|&idx| {
        items[idx]
            .filter_text()
            .chars()
            .next()
            .is_some_and(|first| first.to_lowercase().eq(c.to_lowercase()))
    })
}

/// Rows of a list that fit in `height` lines while keeping `selected` visible.
pub fn visible_window(len: usize, selected: usize, height: usize) -> Range<usize> {
    if height == 0 || len == 0 {
        return 0..0;
    }
    if len <= height {
        return 0..len;
    }
    let start = selected.saturating_sub(height - 1).min(len - height);
    start..start + height
}
