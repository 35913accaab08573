//! Tab-separated hit tables written by `matchComp`.
//!
//! The first line is a header. Each following line describes one library
//! hit; column 4 holds the matched component id.

pub const ID_COLUMN: usize = 4;

/// A single hit line split on tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRow<'a> {
    fields: Vec<&'a str>,
}

impl<'a> MatchRow<'a> {
    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matched_id(&self) -> Option<&'a str> {
        self.fields.get(ID_COLUMN).copied()
    }

    pub fn int_field(&self, idx: usize) -> Option<i64> {
        self.fields.get(idx).and_then(|f| f.trim().parse().ok())
    }
}

/// Data lines of a match table, skipping the header and blank lines.
pub fn rows(text: &str) -> Vec<MatchRow<'_>> {
    text.split('\n')
        .skip(1)
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(|line| MatchRow {
            fields: line.split('\t').collect(),
        })
        .collect()
}

/// Ids of every hit line carrying more than [`ID_COLUMN`] fields.
pub fn matched_ids(text: &str) -> Vec<&str> {
    rows(text)
        .iter()
        .filter(|row| row.len() > ID_COLUMN)
        .filter_map(MatchRow::matched_id)
        .collect()
}
