//! Cellar - spreadsheet formula evaluation from the command line

mod cli;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use cellar_core::{
    CellUpdate, CellarError, Config, NewSheet, RecalcMode, Recalculated, Recalculator, Sheet,
    SheetStore, open_store,
};
use cellar_engine::engine::{ERROR_MARKER, FORMULA_MARKER, is_formula, try_evaluate};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `RUST_LOG` and quiet below warnings by default.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let (config, _warnings) = Config::load(cli.config.as_deref());
    let recalc = if cli.legacy_recalc {
        Recalculator::new(RecalcMode::Legacy)
    } else {
        config.recalculator()
    };

    let mut store = if cli.sheet_id.is_some() || cli.save.is_some() {
        Some(open_configured_store(&config)?)
    } else {
        None
    };

    let sheet = match (&cli.file, cli.sheet_id, store.as_deref()) {
        (Some(path), _, _) => load_sheet(path)?,
        (None, Some(id), Some(store)) => {
            store.get(id)?.ok_or(CellarError::SheetNotFound(id))?.data
        }
        _ => config.new_sheet(),
    };

    let sheet = apply_edits(cli, &recalc, sheet)?;

    if let Some(formula) = &cli.command {
        let formula = if is_formula(formula) {
            formula.clone()
        } else {
            format!("{FORMULA_MARKER}{formula}")
        };
        match try_evaluate(&formula, &sheet.cells) {
            Ok(display) => println!("{}", display),
            Err(e) => {
                println!("{}", ERROR_MARKER);
                bail!("{} evaluates to {}: {}", formula, ERROR_MARKER, e);
            }
        }
    }

    if let Some(store) = store.as_deref() {
        if let Some(id) = cli.sheet_id
            && cli.edits()
        {
            store.update(id, sheet.clone())?;
            eprintln!("Updated sheet {}", id);
        }
        if let Some(name) = &cli.save {
            let stored = store.create(NewSheet {
                name: name.clone(),
                data: sheet.clone(),
            })?;
            eprintln!("Saved '{}' as sheet {}", stored.name, stored.id);
        }
    }
    if let Some(store) = store.as_mut() {
        store.close()?;
    }

    if let Some(output_path) = &cli.output {
        fs::write(output_path, sheet.to_json()?)
            .with_context(|| format!("Failed to write '{}'", output_path.display()))?;
        eprintln!("Wrote {}", output_path.display());
    } else if cli.command.is_none() && cli.save.is_none() {
        println!("{}", sheet.to_json()?);
    }

    Ok(())
}

fn open_configured_store(config: &Config) -> Result<Box<dyn SheetStore>> {
    if config.storage_dir.is_none() {
        return Err(anyhow!(
            "no storage_dir configured; set it in config.toml to use --sheet-id or --save"
        ));
    }
    Ok(open_store(config)?)
}

fn load_sheet(path: &Path) -> Result<Sheet> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    let sheet = Sheet::from_json(&content)
        .with_context(|| format!("Failed to parse '{}'", path.display()))?;
    debug!(path = %path.display(), cells = sheet.cells.len(), "loaded sheet");
    Ok(sheet)
}

/// Apply the edits requested on the command line, in a fixed order:
/// full recalculation, cell assignments, then structural changes.
fn apply_edits(cli: &Cli, recalc: &Recalculator, mut sheet: Sheet) -> Result<Sheet> {
    let check = |out: Recalculated| -> Result<Sheet> {
        let out = if cli.strict { out.deny_cycles()? } else { out };
        Ok(out.sheet)
    };

    if cli.recalculate {
        sheet = check(recalc.recalculate_all(&sheet))?;
    }
    for assignment in &cli.set {
        let update = CellUpdate::value(assignment.value.as_str());
        let out = recalc
            .apply_cell_update(&sheet, &assignment.address, &update)
            .with_context(|| format!("Failed to set {}", assignment.address))?;
        sheet = check(out)?;
    }
    if cli.add_row {
        sheet = sheet.add_row();
    }
    if cli.add_column {
        sheet = sheet.add_column();
    }
    if let Some(row) = cli.delete_row {
        sheet = check(recalc.delete_row(&sheet, row)?)?;
    }
    if let Some(col) = cli.delete_column {
        sheet = check(recalc.delete_column(&sheet, col)?)?;
    }
    Ok(sheet)
}
