//! Parser for the USGS tab-delimited RDB format.
//!
//! An RDB document is a block of `#` comment lines, a header row of column
//! names, a format row (`5s`, `15s`, `20d`, `14n`, ...) and then data rows,
//! all separated by tabs.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RdbTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RdbTable {
    pub fn parse(text: &str) -> Self {
        let mut lines = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.starts_with('#') && !line.trim().is_empty());

        let columns: Vec<String> = match lines.next() {
            Some(header) => header.split('\t').map(|c| c.trim().to_string()).collect(),
            None => return RdbTable::default(),
        };

        let mut rows = Vec::new();
        for line in lines {
            let mut fields: Vec<String> = line.split('\t').map(|f| f.trim().to_string()).collect();
            if rows.is_empty() && is_format_row(&fields) {
                continue;
            }
            fields.resize(columns.len(), String::new());
            rows.push(fields);
        }

        RdbTable { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the non-empty value of `name` in `row`.
    pub fn get<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        self.column(name)
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

// Format specs are a width followed by a type letter, e.g. `15s` or `12n`.
fn is_format_row(fields: &[String]) -> bool {
    fields.iter().all(|f| {
        let width = f.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        !width.is_empty() && width.len() < f.len() && width.chars().all(|c| c.is_ascii_digit())
    })
}

// -- Tests -------------------------------------------------------------------
