// src/csv.rs
//
// Delimited text output for DataSets. A cell is quoted only when it holds the
// delimiter, a double quote or a line break.

use std::borrow::Cow;
use std::io::{self, Write};

use crate::config::options::ExportFormat;
use crate::data::DataSet;

fn quote(cell: &str, delim: char) -> Cow<'_, str> {
    if cell.contains([delim, '"', '\n', '\r']) {
        Cow::Owned(join!("\"", &cell.replace('"', "\"\""), "\""))
    } else {
        Cow::Borrowed(cell)
    }
}

pub fn write_row<W: Write>(w: &mut W, row: &[String], delim: char) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{delim}")?;
        }
        w.write_all(quote(cell, delim).as_bytes())?;
    }
    writeln!(w)
}

/// Header row (unless disabled), then every data row.
pub fn write_table<W: Write>(w: &mut W, data: &DataSet, format: ExportFormat, include_headers: bool) -> io::Result<()> {
    let delim = format.delim();
    if include_headers && !data.headers.is_empty() {
        write_row(w, &data.headers, delim)?;
    }
    for row in &data.rows {
        write_row(w, row, delim)?;
    }
    Ok(())
}
