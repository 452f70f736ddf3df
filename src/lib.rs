use std::io::Write;

use anyhow::Result;
use clap::{ArgAction, Parser};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

pub mod binary;
pub mod source;

pub use binary::{
    cursor::Cursor,
    error::ScanError,
    module::parse_imports,
    types::{Import, ImportKind},
};
pub use source::ModuleSource;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct CmdConfig {
    #[arg(value_name="FILE", help="wasm or wat file path", default_value="-")]
    pub file: String,
    #[arg(long, value_parser=parse_kind, help="only list imports of this kind: function, table, memory or global (repeatable)")]
    pub kind: Vec<ImportKind>,
    #[arg(long, help="print the number of imports only")]
    pub count: bool,
    #[arg(long)]
    pub disable_ansi_color: bool,
    #[arg(short, long, action=ArgAction::Count, help="raise log verbosity (repeatable)")]
    pub verbose: u8,
}

impl CmdConfig {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    pub fn select(&self, imports: Vec<Import>) -> Vec<Import> {
        if self.kind.is_empty() {
            return imports;
        }
        imports.into_iter().filter(|import| self.kind.contains(&import.kind)).collect()
    }
}

fn parse_kind(value: &str) -> std::result::Result<ImportKind, String> {
    match value {
        "function" => Ok(ImportKind::Function),
        "table" => Ok(ImportKind::Table),
        "memory" => Ok(ImportKind::Memory),
        "global" => Ok(ImportKind::Global),
        _ => Err(format!("unknown import kind `{value}`")),
    }
}

pub fn get_args() -> Result<CmdConfig> {
    Ok(CmdConfig::parse())
}

pub fn init_tracing(config: &CmdConfig) -> Result<()> {
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(!config.disable_ansi_color)
        .with_filter(config.log_level());

    tracing_subscriber::registry()
        .with(fmt)
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;
    Ok(())
}

pub fn write_imports(out: &mut impl Write, config: &CmdConfig, imports: &[Import]) -> Result<()> {
    if config.count {
        writeln!(out, "{}", imports.len())?;
        return Ok(());
    }

    for import in imports {
        writeln!(out, "{}\t{}\t{}", import.module, import.name, import.kind)?;
    }
    Ok(())
}
