use num_traits::FromPrimitive;
use tracing::{debug, trace};

use super::{
    cursor::Cursor,
    error::{Result, ScanError},
    section::SectionCode,
    types::{Import, ImportKind, Limits},
};

pub const WASM_MAGIC: &[u8; 4] = b"\0asm";
pub const WASM_VERSION: &[u8; 4] = &[0x01, 0x00, 0x00, 0x00];

/// Lists the imports a module declares, in section order.
///
/// Only the header and the section headers in front of the import section are looked at;
/// scanning stops as soon as the import section has been decoded. A module without an import
/// section yields an empty list.
pub fn parse_imports(module: impl AsRef<[u8]>) -> Result<Vec<Import>> {
    scan(module.as_ref())
}

#[tracing::instrument(skip(wasm), fields(len = wasm.len()), level = tracing::Level::TRACE)]
fn scan(wasm: &[u8]) -> Result<Vec<Import>> {
    let mut cursor = Cursor::new(wasm);
    decode_preamble(&mut cursor)?;

    while cursor.has_more_bytes() {
        let offset = cursor.offset();
        let (id, size) = decode_section_header(&mut cursor)?;

        match SectionCode::from_u8(id) {
            Some(SectionCode::Import) => {
                debug!(offset, size, "import section");
                return decode_import_section(&mut cursor);
            }
            code => {
                debug!(offset, id, size, ?code, "skip section");
                cursor.skip_bytes(size as usize)?;
            }
        }
    }

    Ok(vec![])
}

fn decode_preamble(cursor: &mut Cursor) -> Result<()> {
    cursor.assert_bytes(WASM_MAGIC)?;
    cursor.assert_bytes(WASM_VERSION)
}

fn decode_section_header(cursor: &mut Cursor) -> Result<(u8, u32)> {
    let id = cursor.read_byte()?;
    let size = cursor.read_var_u32()?;
    Ok((id, size))
}

fn decode_import_section(cursor: &mut Cursor) -> Result<Vec<Import>> {
    let count = cursor.read_var_u32()?;
    // an entry is at least three bytes, so the count alone can't force a huge allocation
    let mut imports = Vec::with_capacity((count as usize).min(cursor.remaining() / 3));

    for _ in 0..count {
        imports.push(decode_import(cursor)?);
    }

    Ok(imports)
}

fn decode_import(cursor: &mut Cursor) -> Result<Import> {
    let module = cursor.read_name()?;
    let name = cursor.read_name()?;

    let offset = cursor.offset();
    let value = cursor.read_byte()?;
    let kind = ImportKind::from_u8(value).ok_or(ScanError::UnknownImportKind { offset, value })?;

    match kind {
        ImportKind::Function => {
            let type_index = cursor.read_var_u32()?;
            trace!(%module, field = %name, type_index, "function import");
        }
        ImportKind::Table => {
            let limits = decode_table_type(cursor)?;
            trace!(%module, field = %name, ?limits, "table import");
        }
        ImportKind::Memory => {
            let limits = decode_limits(cursor)?;
            trace!(%module, field = %name, ?limits, "memory import");
        }
        ImportKind::Global => {
            decode_global_type(cursor)?;
            trace!(%module, field = %name, "global import");
        }
    }

    Ok(Import { module, name, kind })
}

fn decode_limits(cursor: &mut Cursor) -> Result<Limits> {
    let flags = cursor.read_byte()?;
    let min = cursor.read_var_u32()?;
    let max = match flags & 0x01 {
        0 => None,
        _ => Some(cursor.read_var_u32()?),
    };

    Ok(Limits { flags, min, max })
}

fn decode_table_type(cursor: &mut Cursor) -> Result<Limits> {
    cursor.skip_bytes(1)?; // reftype
    decode_limits(cursor)
}

fn decode_global_type(cursor: &mut Cursor) -> Result<()> {
    cursor.skip_bytes(1)?; // valtype
    cursor.skip_bytes(1) // mut
}
