// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Parser for the column tables printed by SONiC `show` commands.
//!
//! ```text
//!   Interface            Lanes    Speed    MTU    FEC    Alias    Vlan    Oper    Admin
//! -----------  ---------------  -------  -----  -----  -------  ------  ------  -------
//!   Ethernet0      0,1,2,3,4,5     100G   9100     rs     etp1  routed      up       up
//! ```
//!
//! Column boundaries come from the runs of dashes of the separator line.
//! Headers are whatever the line above the separator holds in each span.
//! A cell may overflow into the gap that follows its dashes, and the last
//! column extends to the end of the line.
//!
//! A row whose key cell is empty continues the previous row: its non-empty
//! cells are appended, space separated, to the cells of that row.

use crate::errors::ParseError;
use ordermap::OrderMap;
use tracing::trace;

/// Cells of one table row, by column header.
pub type Row = OrderMap<String, String>;

/// Rows of a table, by the value of their key column.
pub type Table = OrderMap<String, Row>;

#[derive(Debug)]
struct Column {
    name: String,
    start: usize,
    end: Option<usize>,
}

fn is_separator(line: &str) -> bool {
    let line = line.trim();
    line.contains('-') && line.chars().all(|c| c == '-' || c == ' ')
}

fn cell(chars: &[char], start: usize, end: Option<usize>) -> String {
    let end = end.unwrap_or(chars.len()).min(chars.len());
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect::<String>().trim().to_string()
}

fn columns(header: &str, separator: &str) -> Vec<Column> {
    let header: Vec<char> = header.chars().collect();
    let mut spans = vec![];
    let mut start = None;
    for (pos, c) in separator.chars().chain(std::iter::once(' ')).enumerate() {
        match (c == '-', start) {
            (true, None) => start = Some(pos),
            (false, Some(s)) => {
                spans.push((s, pos));
                start = None;
            }
            _ => {}
        }
    }
    let starts: Vec<usize> = spans.iter().map(|(s, _)| *s).collect();
    spans
        .iter()
        .enumerate()
        .map(|(i, (s, e))| Column {
            name: cell(&header, *s, Some(*e)),
            start: *s,
            end: starts.get(i + 1).copied(),
        })
        .collect()
}

/// Split a table output in its columns and data lines.
fn layout(output: &str) -> Result<(Vec<Column>, Vec<&str>), ParseError> {
    let lines: Vec<&str> = output.lines().collect();
    let sep = lines
        .iter()
        .position(|l| is_separator(l))
        .ok_or(ParseError::NoSeparator)?;
    let header = lines[..sep]
        .iter()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or(ParseError::NoHeader)?;
    let columns = columns(header, lines[sep]);
    let data = lines[sep + 1..]
        .iter()
        .copied()
        .filter(|l| !l.trim().is_empty() && !is_separator(l))
        .collect();
    Ok((columns, data))
}

fn split_row(columns: &[Column], line: &str) -> Row {
    let chars: Vec<char> = line.chars().collect();
    columns
        .iter()
        .map(|c| (c.name.clone(), cell(&chars, c.start, c.end)))
        .collect()
}

fn merge_continuation(row: &mut Row, continuation: Row) {
    for (name, value) in continuation {
        if value.is_empty() {
            continue;
        }
        let cell = row.entry(name).or_default();
        if !cell.is_empty() {
            cell.push(' ');
        }
        cell.push_str(&value);
    }
}

fn parse_rows(output: &str, key: Option<&str>) -> Result<Vec<Row>, ParseError> {
    let (columns, data) = layout(output)?;
    let key = match key {
        Some(k) => columns
            .iter()
            .find(|c| c.name == k)
            .map(|c| c.name.clone())
            .ok_or_else(|| ParseError::MissingColumn(k.to_string()))?,
        None => columns
            .first()
            .map(|c| c.name.clone())
            .ok_or(ParseError::NoHeader)?,
    };
    let mut rows: Vec<Row> = vec![];
    for line in data {
        let row = split_row(&columns, line);
        if row.get(&key).is_some_and(|v| !v.is_empty()) {
            rows.push(row);
        } else if let Some(last) = rows.last_mut() {
            merge_continuation(last, row);
        } else {
            return Err(ParseError::OrphanContinuation(line.to_string()));
        }
    }
    trace!("Parsed {} rows over {} columns", rows.len(), columns.len());
    Ok(rows)
}

/// Parse a table into its rows, in output order. Continuations are detected
/// on the first column.
pub fn parse_show_table_rows(output: &str) -> Result<Vec<Row>, ParseError> {
    parse_rows(output, None)
}

/// Parse a table into rows keyed by the value of `key_column`.
pub fn parse_show_table(output: &str, key_column: &str) -> Result<Table, ParseError> {
    Ok(parse_rows(output, Some(key_column))?
        .into_iter()
        .filter_map(|row| row.get(key_column).cloned().map(|k| (k, row)))
        .collect())
}
