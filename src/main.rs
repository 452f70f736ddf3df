use std::io::{BufReader, Write};

use anyhow::{Context, Result};
use tracing::info;
use wasm_import_scan::{get_args, init_tracing, parse_imports, write_imports, ModuleSource};

fn main() -> Result<()> {
    let config = get_args()?;
    init_tracing(&config)?;

    let source = match config.file.as_str() {
        "-" => ModuleSource::from_reader(BufReader::new(std::io::stdin()))?,
        path => ModuleSource::from_path(path)?,
    };

    let imports = parse_imports(&source).with_context(|| format!("failed to scan imports of {}", config.file))?;
    info!(count = imports.len(), "scanned imports");

    let imports = config.select(imports);
    let mut out = std::io::stdout().lock();
    write_imports(&mut out, &config, &imports)?;
    out.flush()?;

    Ok(())
}
