use std::time::{Duration, Instant};

use crate::district::District;

/// Indices of districts whose name contains `query`, case-insensitively,
/// in list order and capped at `limit`. A blank query matches nothing.
pub fn filter_indices(query: &str, districts: &[District], limit: usize) -> Vec<usize> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    districts
        .iter()
        .enumerate()
        .filter(|(_, d)| d.name.to_lowercase().contains(&needle))
        .map(|(idx, _)| idx)
        .take(limit)
        .collect()
}

/// Same as [`filter_indices`], returning the districts themselves
pub fn filter<'a>(query: &str, districts: &'a [District], limit: usize) -> Vec<&'a District> {
    filter_indices(query, districts, limit)
        .into_iter()
        .map(|idx| &districts[idx])
        .collect()
}

/// Free-text search box state with debounced suggestion refresh
#[derive(Debug)]
pub struct SearchController {
    query: String,
    suggestions: Vec<usize>,
    highlighted: usize,
    limit: usize,
    debounce: Duration,
    refresh_at: Option<Instant>,
}

impl SearchController {
    pub fn new(limit: usize, debounce: Duration) -> Self {
        Self {
            query: String::new(),
            suggestions: Vec::new(),
            highlighted: 0,
            limit,
            debounce,
            refresh_at: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// District indices currently offered
    pub fn suggestions(&self) -> &[usize] {
        &self.suggestions
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.suggestions.get(self.highlighted).copied()
    }

    pub fn highlighted_position(&self) -> usize {
        self.highlighted
    }

    pub fn set_query(&mut self, query: impl Into<String>, now: Instant) {
        self.query = query.into();
        self.refresh_at = Some(now + self.debounce);
    }

    pub fn push_char(&mut self, c: char, now: Instant) {
        self.query.push(c);
        self.refresh_at = Some(now + self.debounce);
    }

    pub fn pop_char(&mut self, now: Instant) {
        self.query.pop();
        self.refresh_at = Some(now + self.debounce);
    }

    /// Recompute suggestions once the debounce window has passed.
    /// Returns `true` when the list was refreshed.
    pub fn tick(&mut self, now: Instant, districts: &[District]) -> bool {
        match self.refresh_at {
            Some(at) if now >= at => {
                self.refresh_now(districts);
                true
            }
            _ => false,
        }
    }

    pub fn refresh_now(&mut self, districts: &[District]) {
        self.refresh_at = None;
        self.suggestions = filter_indices(&self.query, districts, self.limit);
        self.highlighted = 0;
    }

    pub fn highlight_next(&mut self) {
        if !self.suggestions.is_empty() {
            self.highlighted = (self.highlighted + 1) % self.suggestions.len();
        }
    }

    pub fn highlight_prev(&mut self) {
        if !self.suggestions.is_empty() {
            self.highlighted = self
                .highlighted
                .checked_sub(1)
                .unwrap_or(self.suggestions.len() - 1);
        }
    }

    /// Accept a suggestion: the box shows its name and the list closes
    pub fn select(&mut self, district: &District) {
        self.query = district.name.clone();
        self.suggestions.clear();
        self.highlighted = 0;
        self.refresh_at = None;
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.suggestions.clear();
        self.highlighted = 0;
        self.refresh_at = None;
    }
}
