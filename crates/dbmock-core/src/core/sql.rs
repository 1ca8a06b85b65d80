// crates/dbmock-core/src/core/sql.rs
// ============================================================================
// Module: dbmock SQL Text
// Description: SQL text normalization shared by declaration and execution.
// Purpose: Make SQL comparison insensitive to layout whitespace.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Declared and actual SQL are normalized the same way before any matcher sees
//! them: every run of whitespace, including newlines, becomes one space and
//! the result is trimmed.

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Collapses whitespace runs to single spaces and trims both ends.
#[must_use]
pub fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::normalize_sql;

    #[test]
    fn collapses_newlines_and_indentation() {
        let sql = "\n    SELECT id,\n\t   name\n    FROM users  ";
        assert_eq!(normalize_sql(sql), "SELECT id, name FROM users");
    }

    #[test]
    fn leaves_normalized_sql_unchanged() {
        assert_eq!(normalize_sql("SELECT 1"), "SELECT 1");
        assert_eq!(normalize_sql("   "), "");
    }
}
