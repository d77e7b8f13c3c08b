// RAPL-SWEEP TABLES
// COLUMN-NAMED ROWS OF NUMBERS OR TEXT, READ FROM AND WRITTEN TO
// DELIMITED FILES (THE PROFILER WRITES SEMICOLON-SEPARATED OUTPUT).
//
// EVERY TRANSFORM TAKES &self AND RETURNS A NEW TABLE. NOTHING IS EDITED
// IN PLACE ONCE IT LEAVES THE STAGE THAT BUILT IT.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

pub const DELIMITER: char = ';';

// HARDWARE POWER DOMAIN COLUMNS: PACKAGE_0, CORE_0, DRAM_1, PSYS, ...
// EVERYTHING ELSE THE PROFILER WRITES IS lower_snake_case.
const DOMAIN_PATTERN: &str = r"^[A-Z][A-Z0-9]*(?:_[0-9]+)?$";

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Num(f64),
    Text(String),
}

impl Cell {
    // NUMBERS WIN; QUOTED OR UNPARSABLE CELLS STAY TEXT
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(inner) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
            return Cell::Text(inner.to_string());
        }
        match raw.parse::<f64>() {
            Ok(v) => Cell::Num(v),
            Err(_) => Cell::Text(raw.to_string()),
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Cell::Num(v) => Some(*v),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Num(v) => write!(f, "{v}"),
            Cell::Text(s) => write!(f, "'{s}'"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::MalformedTable(format!(
                "row {} has {} cells, header has {} columns",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
            available: self.columns.clone(),
        })
    }

    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.require(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                row[idx].as_num().ok_or_else(|| {
                    Error::MalformedTable(format!(
                        "column {name:?} row {} is not numeric: {}",
                        r + 1,
                        row[idx]
                    ))
                })
            })
            .collect()
    }

    // APPEND (OR OVERWRITE) A COLUMN HOLDING THE SAME VALUE IN EVERY ROW
    pub fn with_constant(&self, name: &str, value: Cell) -> Self {
        let mut out = self.clone();
        match out.column_index(name) {
            Some(idx) => {
                for row in &mut out.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                out.columns.push(name.to_string());
                for row in &mut out.rows {
                    row.push(value.clone());
                }
            }
        }
        out
    }

    pub fn map_numeric(&self, name: &str, f: impl Fn(f64) -> f64) -> Result<Self> {
        let idx = self.require(name)?;
        let values = self.numeric_column(name)?;
        let mut out = self.clone();
        for (row, v) in out.rows.iter_mut().zip(values) {
            row[idx] = Cell::Num(f(v));
        }
        Ok(out)
    }

    // ABSENT NAMES ARE IGNORED
    pub fn drop_columns(&self, names: &[&str]) -> Self {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i].as_str()))
            .collect();
        self.project(&keep)
    }

    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let idx = names
            .iter()
            .map(|n| self.require(n))
            .collect::<Result<Vec<usize>>>()?;
        Ok(self.project(&idx))
    }

    fn project(&self, idx: &[usize]) -> Self {
        Self {
            columns: idx.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| idx.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    // STACK TABLES VERTICALLY. THE FIRST TABLE FIXES THE COLUMN ORDER;
    // LATER TABLES MUST CARRY THE SAME COLUMN SET (ANY ORDER).
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Result<Self> {
        let mut iter = tables.into_iter();
        let mut out = match iter.next() {
            Some(first) => first,
            None => return Ok(Self::default()),
        };
        for table in iter {
            if table.columns == out.columns {
                out.rows.extend(table.rows);
                continue;
            }
            if table.columns.len() != out.columns.len() {
                return Err(Error::MalformedTable(format!(
                    "cannot concatenate tables with different columns: [{}] vs [{}]",
                    out.columns.join(", "),
                    table.columns.join(", ")
                )));
            }
            let names: Vec<&str> = out.columns.iter().map(String::as_str).collect();
            let aligned = table.select(&names).map_err(|_| {
                Error::MalformedTable(format!(
                    "cannot concatenate tables with different columns: [{}] vs [{}]",
                    out.columns.join(", "),
                    table.columns.join(", ")
                ))
            })?;
            out.rows.extend(aligned.rows);
        }
        Ok(out)
    }

    // COLUMNS NAMED LIKE HARDWARE POWER DOMAINS, IN TABLE ORDER
    pub fn energy_domains(&self) -> Vec<&str> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(DOMAIN_PATTERN).expect("static domain pattern"));
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| re.is_match(c))
            .collect()
    }

    pub fn parse(text: &str, delimiter: char) -> Result<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| Error::MalformedTable("missing header line".to_string()))?;
        let columns: Vec<String> = trim_trailing_empty(split_fields(header, delimiter))
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect();
        if columns.iter().any(String::is_empty) {
            return Err(Error::MalformedTable(format!("empty column name in header {header:?}")));
        }

        let mut table = Self::new(columns);
        let width = table.columns.len();
        for line in lines {
            let mut fields = split_fields(line, delimiter);
            // THE PROFILER TERMINATES EVERY DATA ROW WITH A DELIMITER, AND
            // MULTI-ITERATION OUTPUT RUNS ITS ROWS TOGETHER ON ONE LINE
            let terminated = fields.len() > width
                && (fields.len() - 1) % width == 0
                && fields.last().is_some_and(|f| f.trim().is_empty());
            if terminated {
                fields.pop();
                for row in fields.chunks(width) {
                    table.push_row(row.iter().map(|f| Cell::parse(f)).collect())?;
                }
            } else {
                table.push_row(fields.iter().map(|f| Cell::parse(f)).collect())?;
            }
        }
        Ok(table)
    }

    pub fn read(path: &Path, delimiter: char) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, delimiter)
    }

    pub fn to_delimited(&self, delimiter: char) -> String {
        let sep = delimiter.to_string();
        let mut out = self.columns.join(&sep);
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(Cell::to_string).collect();
            out.push_str(&cells.join(&sep));
            out.push('\n');
        }
        out
    }

    pub fn write(&self, path: &Path, delimiter: char) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_delimited(delimiter))?;
        Ok(())
    }
}

// SPLIT ON THE DELIMITER, EXCEPT INSIDE SINGLE-QUOTED TEXT.
// THE PROFILER DOES NOT ESCAPE QUOTES: A FIELD OPENED BY ' ENDS ONLY AT A '
// FOLLOWED BY THE DELIMITER OR THE END OF THE LINE.
fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if quoted {
            cur.push(ch);
            if ch == '\'' && chars.peek().map_or(true, |&next| next == delimiter) {
                quoted = false;
            }
        } else if ch == delimiter {
            fields.push(std::mem::take(&mut cur));
        } else {
            if ch == '\'' && cur.trim().is_empty() {
                quoted = true;
            }
            cur.push(ch);
        }
    }
    fields.push(cur);
    fields
}

fn trim_trailing_empty(mut fields: Vec<String>) -> Vec<String> {
    while fields.len() > 1 && fields.last().is_some_and(|f| f.trim().is_empty()) {
        fields.pop();
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILER_OUTPUT: &str = "command;CORE_0;PACKAGE_0;duration_ms;measure_count;measure_delta;exit_code\n\
        'python3 nbody.py 500';2500000;4100000;812;406;2000;0;\n";

    #[test]
    fn parses_profiler_row_with_trailing_delimiter() {
        let t = Table::parse(PROFILER_OUTPUT, DELIMITER).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.columns().len(), 7);
        assert_eq!(t.rows()[0][0], Cell::Text("python3 nbody.py 500".to_string()));
        assert_eq!(t.numeric_column("CORE_0").unwrap(), vec![2_500_000.0]);
        assert_eq!(t.numeric_column("exit_code").unwrap(), vec![0.0]);
    }

    #[test]
    fn rejects_short_row() {
        let text = "a;b;c\n1;2\n";
        assert!(matches!(Table::parse(text, ';'), Err(Error::MalformedTable(_))));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(matches!(Table::parse("\n\n", ';'), Err(Error::MalformedTable(_))));
    }

    #[test]
    fn quoted_text_keeps_delimiter() {
        let t = Table::parse("command;x\n'echo a;b';1\n", ';').unwrap();
        assert_eq!(t.rows()[0][0], Cell::Text("echo a;b".to_string()));
        assert_eq!(t.rows()[0][1], Cell::Num(1.0));
    }

    #[test]
    fn unbalanced_apostrophe_in_command() {
        let text = "command;CORE_0;duration_ms;measure_count;measure_delta;exit_code\n\
            'sh -c echo don't';2500000;812;406;2000;0;\n";
        let t = Table::parse(text, DELIMITER).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows()[0][0], Cell::Text("sh -c echo don't".to_string()));
        assert_eq!(t.numeric_column("measure_delta").unwrap(), vec![2000.0]);
        assert_eq!(t.numeric_column("exit_code").unwrap(), vec![0.0]);
    }

    #[test]
    fn iteration_rows_on_one_line() {
        // ROWS FOLLOW EACH OTHER WITH NO NEWLINE BETWEEN THEM
        let text = "command;iteration;CORE_0;duration_ms;measure_count;measure_delta;exit_code\n\
            'w';0;100;10;5;2000;0;'w';1;300;10;5;4000;0;'w';2;500;10;5;6000;0;";
        let t = Table::parse(text, DELIMITER).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.numeric_column("iteration").unwrap(), vec![0.0, 1.0, 2.0]);
        assert_eq!(t.numeric_column("CORE_0").unwrap(), vec![100.0, 300.0, 500.0]);
        assert_eq!(t.rows()[2][0], Cell::Text("w".to_string()));
    }

    #[test]
    fn run_together_rows_must_fill_the_header() {
        let text = "command;x;y\n'w';1;2;'w';3;\n";
        assert!(matches!(Table::parse(text, ';'), Err(Error::MalformedTable(_))));
    }

    #[test]
    fn delimited_output_reparses() {
        let t = Table::parse(PROFILER_OUTPUT, DELIMITER).unwrap();
        let again = Table::parse(&t.to_delimited(DELIMITER), DELIMITER).unwrap();
        assert_eq!(t, again);
    }

    #[test]
    fn energy_domains_skip_metadata() {
        let t = Table::parse(PROFILER_OUTPUT, DELIMITER).unwrap();
        assert_eq!(t.energy_domains(), vec!["CORE_0", "PACKAGE_0"]);
    }

    #[test]
    fn concat_aligns_column_order() {
        let a = Table::parse("x;y\n1;2\n", ';').unwrap();
        let b = Table::parse("y;x\n4;3\n", ';').unwrap();
        let t = Table::concat([a, b]).unwrap();
        assert_eq!(t.numeric_column("x").unwrap(), vec![1.0, 3.0]);
        assert_eq!(t.numeric_column("y").unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn concat_rejects_different_columns() {
        let a = Table::parse("x;y\n1;2\n", ';').unwrap();
        let b = Table::parse("x;z\n1;2\n", ';').unwrap();
        assert!(matches!(Table::concat([a, b]), Err(Error::MalformedTable(_))));
    }

    #[test]
    fn drop_and_select() {
        let t = Table::parse(PROFILER_OUTPUT, DELIMITER).unwrap();
        let dropped = t.drop_columns(&["command", "exit_code", "not_there"]);
        assert_eq!(dropped.columns().len(), 5);
        let sel = t.select(&["measure_delta", "CORE_0"]).unwrap();
        assert_eq!(sel.columns(), &["measure_delta".to_string(), "CORE_0".to_string()]);
        assert!(matches!(t.select(&["DRAM_0"]), Err(Error::MissingColumn { .. })));
    }
}
