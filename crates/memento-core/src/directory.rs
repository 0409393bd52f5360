//! Sortable projection of the student/alumni directory.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Columns the directory table can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    StudentId,
    Batch,
    Hometown,
    Email,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Current sort of a directory view. Starts unsorted and ascending; only
/// `request_sort` moves it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortConfig {
    /// Header click: a new key sorts ascending, the same key flips direction.
    pub fn request_sort(self, key: SortKey) -> Self {
        if self.key == Some(key) {
            Self {
                key: Some(key),
                direction: self.direction.toggle(),
            }
        } else {
            Self {
                key: Some(key),
                direction: SortDirection::Ascending,
            }
        }
    }
}

/// Anything that can be listed in the directory table.
pub trait SortFields {
    /// The value shown in `key`'s column, `None` when the field is absent.
    fn sort_value(&self, key: SortKey) -> Option<&str>;
}

impl<T: SortFields> SortFields for &T {
    fn sort_value(&self, key: SortKey) -> Option<&str> {
        (**self).sort_value(key)
    }
}

/// Ordered copy of `records` under `config`. The input is left alone.
///
/// Absent fields compare as the empty string. Ties keep fetch order.
pub fn project<R: SortFields + Clone>(records: &[R], config: SortConfig) -> Vec<R> {
    let mut ordered = records.to_vec();

    let Some(key) = config.key else {
        return ordered;
    };

    ordered.sort_by(|a, b| {
        let ord = compare_by(a, b, key);
        match config.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    ordered
}

fn compare_by<R: SortFields>(a: &R, b: &R, key: SortKey) -> Ordering {
    let left = a.sort_value(key).unwrap_or("");
    let right = b.sort_value(key).unwrap_or("");
    left.cmp(right)
}
