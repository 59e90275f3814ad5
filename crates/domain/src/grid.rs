//! Grid identifiers: logical names of the smart plugs laid out in rows and
//! columns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical identifier of one smart plug, e.g. `w.r0.c3`.
///
/// Identifiers are opaque outside of grid expansion: anything read from the
/// registry store or named explicitly in a topic is accepted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridId(String);

impl GridId {
    /// Wrap an identifier as-is.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier of the plug at `row`, `column`.
    ///
    /// Coordinates are rendered with their `Display` impl so values taken
    /// straight from a topic segment produce the same identifier as numeric
    /// ones.
    pub fn at(row: impl fmt::Display, column: impl fmt::Display) -> Self {
        Self(format!("w.r{row}.c{column}"))
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configured size of the plug grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GridDimensions {
    /// Number of columns in every row (grid width).
    pub columns_per_row: u32,
    /// Number of rows in every column (grid height).
    pub rows_per_column: u32,
}

impl Default for GridDimensions {
    fn default() -> Self {
        Self {
            columns_per_row: 8,
            rows_per_column: 8,
        }
    }
}

impl GridDimensions {
    /// Create dimensions for a `columns_per_row` × `rows_per_column` grid.
    #[must_use]
    pub fn new(columns_per_row: u32, rows_per_column: u32) -> Self {
        Self {
            columns_per_row,
            rows_per_column,
        }
    }

    /// Every identifier of `row`, in column order.
    pub fn row(self, row: &str) -> impl Iterator<Item = GridId> + '_ {
        (0..self.columns_per_row).map(move |column| GridId::at(row, column))
    }

    /// Every identifier of `column`, in row order.
    pub fn column(self, column: &str) -> impl Iterator<Item = GridId> + '_ {
        (0..self.rows_per_column).map(move |row| GridId::at(row, column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_format_coordinates() {
        assert_eq!(GridId::at(2, 5).as_str(), "w.r2.c5");
        assert_eq!(GridId::at("2", "5"), GridId::at(2, 5));
    }

    #[test]
    fn should_expand_row_in_column_order() {
        let dims = GridDimensions::new(3, 2);
        let ids: Vec<_> = dims.row("1").map(|id| id.to_string()).collect();
        assert_eq!(ids, ["w.r1.c0", "w.r1.c1", "w.r1.c2"]);
    }

    #[test]
    fn should_expand_column_in_row_order() {
        let dims = GridDimensions::new(3, 2);
        let ids: Vec<_> = dims.column("4").map(|id| id.to_string()).collect();
        assert_eq!(ids, ["w.r0.c4", "w.r1.c4"]);
    }

    #[test]
    fn should_serialize_transparently() {
        let json = serde_json::to_string(&GridId::at(0, 1)).unwrap();
        assert_eq!(json, "\"w.r0.c1\"");
    }
}
