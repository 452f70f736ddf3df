use std::{fs, io::Read, path::Path};

use anyhow::Context;

use crate::binary::{
    error::{Result, ScanError},
    module::WASM_MAGIC,
};

/// Module bytes ready for scanning, taken either as a wasm binary or compiled from the text
/// format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    wasm: Vec<u8>,
}

impl ModuleSource {
    /// Binary input, including a damaged one, is kept as is so that header errors surface
    /// from the scanner. Only input that reads as text is compiled as wat.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let text = match as_text(&bytes) {
            Some(text) if !bytes.starts_with(WASM_MAGIC) => text,
            _ => return Ok(ModuleSource { wasm: bytes }),
        };

        let wasm = wat::parse_str(text)
            .map_err(|err| ScanError::invalid_input(format!("failed to parse wat: {err}")))?;

        Ok(ModuleSource { wasm })
    }

    pub fn from_reader(mut reader: impl Read) -> anyhow::Result<Self> {
        let mut buf = vec![];
        reader.read_to_end(&mut buf).context("failed to read module")?;
        Ok(Self::from_bytes(buf)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_bytes(bytes).with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.wasm
    }
}

fn as_text(bytes: &[u8]) -> Option<&str> {
    std::str::from_utf8(bytes)
        .ok()
        .filter(|text| !text.chars().any(|c| c.is_control() && !c.is_whitespace()))
}

impl AsRef<[u8]> for ModuleSource {
    fn as_ref(&self) -> &[u8] {
        &self.wasm
    }
}
