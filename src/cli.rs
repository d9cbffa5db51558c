//! Command line arguments.

use std::path::PathBuf;

use cellar_engine::engine::CellRef;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "cellar")]
#[command(
    author,
    version,
    about = "Evaluate spreadsheet formulas and edit sheet documents"
)]
pub struct Cli {
    /// Sheet document to read (JSON)
    pub file: Option<PathBuf>,

    /// Evaluate a formula against the sheet and print its display value
    #[arg(short = 'c', long = "command", value_name = "FORMULA")]
    pub command: Option<String>,

    /// Set a cell, applied in order (e.g. A1=5 or B1==A1*2)
    #[arg(short, long = "set", value_name = "ADDR=VALUE", value_parser = parse_assignment)]
    pub set: Vec<Assignment>,

    /// Append a row to the grid
    #[arg(long)]
    pub add_row: bool,

    /// Append a column to the grid
    #[arg(long)]
    pub add_column: bool,

    /// Remove the cells on a row (1-based, as in addresses)
    #[arg(long, value_name = "ROW", value_parser = parse_row)]
    pub delete_row: Option<usize>,

    /// Remove the cells in a column (letters, as in addresses)
    #[arg(long, value_name = "COLUMN", value_parser = parse_column)]
    pub delete_column: Option<usize>,

    /// Recompute every formula after loading
    #[arg(long)]
    pub recalculate: bool,

    /// Write the resulting sheet here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Configuration file (default: <config dir>/cellar/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Recompute only formulas that mention the edited address
    #[arg(long)]
    pub legacy_recalc: bool,

    /// Fail when an edit leaves a circular reference
    #[arg(long)]
    pub strict: bool,

    /// Load the sheet with this id from the configured store
    #[arg(long, value_name = "ID", conflicts_with = "file")]
    pub sheet_id: Option<u64>,

    /// Save the result to the configured store under NAME
    #[arg(long, value_name = "NAME", conflicts_with = "sheet_id")]
    pub save: Option<String>,
}

impl Cli {
    /// Whether any option changes the sheet.
    pub fn edits(&self) -> bool {
        !self.set.is_empty()
            || self.add_row
            || self.add_column
            || self.delete_row.is_some()
            || self.delete_column.is_some()
            || self.recalculate
    }
}

/// One `--set` argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub address: String,
    pub value: String,
}

fn parse_assignment(arg: &str) -> Result<Assignment, String> {
    let (address, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=VALUE, got '{arg}'"))?;
    let address = address.trim();
    if address.is_empty() {
        return Err(format!("missing address in '{arg}'"));
    }
    Ok(Assignment {
        address: address.to_string(),
        value: value.to_string(),
    })
}

fn parse_row(arg: &str) -> Result<usize, String> {
    CellRef::parse(&format!("A{}", arg.trim()))
        .map(|cell| cell.row)
        .map_err(|_| format!("'{arg}' is not a row number"))
}

fn parse_column(arg: &str) -> Result<usize, String> {
    CellRef::parse(&format!("{}1", arg.trim().to_ascii_uppercase()))
        .map(|cell| cell.col)
        .map_err(|_| format!("'{arg}' is not a column name"))
}
