/*
    Copyright (C) 2024 fieryhenry

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

// Everything here is based off of https://android.googlesource.com/platform/frameworks/base/+/master/libs/androidfw/include/androidfw/ResourceTypes.h

use std::{
    fmt::Display,
    io::{Read, Seek, Write},
    num::ParseIntError,
    str::FromStr,
};

use binrw::{binrw, BinRead, BinWrite};

use crate::stream::{
    read_binrw, read_bytes, write_binrw, write_bytes, NewResultCtx, Readable, StreamError,
    StreamResult, Writeable,
};

/// Type identifier of a chunk. Values not listed here are kept as `Unknown` so that they can be
/// passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkType {
    Null,
    StringPool,
    Table,
    Xml,
    TablePackage,
    TableType,
    TableTypeSpec,
    TableLibrary,
    TableOverlayable,
    TableOverlayablePolicy,
    TableStagedAlias,
    Unknown(u16),
}

impl From<u16> for ChunkType {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => Self::Null,
            0x0001 => Self::StringPool,
            0x0002 => Self::Table,
            0x0003 => Self::Xml,
            0x0200 => Self::TablePackage,
            0x0201 => Self::TableType,
            0x0202 => Self::TableTypeSpec,
            0x0203 => Self::TableLibrary,
            0x0204 => Self::TableOverlayable,
            0x0205 => Self::TableOverlayablePolicy,
            0x0206 => Self::TableStagedAlias,
            other => Self::Unknown(other),
        }
    }
}

impl From<ChunkType> for u16 {
    fn from(value: ChunkType) -> Self {
        match value {
            ChunkType::Null => 0x0000,
            ChunkType::StringPool => 0x0001,
            ChunkType::Table => 0x0002,
            ChunkType::Xml => 0x0003,
            ChunkType::TablePackage => 0x0200,
            ChunkType::TableType => 0x0201,
            ChunkType::TableTypeSpec => 0x0202,
            ChunkType::TableLibrary => 0x0203,
            ChunkType::TableOverlayable => 0x0204,
            ChunkType::TableOverlayablePolicy => 0x0205,
            ChunkType::TableStagedAlias => 0x0206,
            ChunkType::Unknown(other) => other,
        }
    }
}

impl Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkType::Null => write!(f, "NULL"),
            ChunkType::StringPool => write!(f, "STRING"),
            ChunkType::Table => write!(f, "TABLE"),
            ChunkType::Xml => write!(f, "XML"),
            ChunkType::TablePackage => write!(f, "PACKAGE"),
            ChunkType::TableType => write!(f, "TYPE"),
            ChunkType::TableTypeSpec => write!(f, "SPEC"),
            ChunkType::TableLibrary => write!(f, "LIBRARY"),
            ChunkType::TableOverlayable => write!(f, "OVERLAYABLE"),
            ChunkType::TableOverlayablePolicy => write!(f, "OVERLAYABLE_POLICY"),
            ChunkType::TableStagedAlias => write!(f, "STAGED_ALIAS"),
            ChunkType::Unknown(other) => write!(f, "UNKNOWN({other:#06x})"),
        }
    }
}

/// Header that appears at the front of every data chunk in a resource.
#[binrw]
#[brw(little)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ChunkHeader {
    /// Type identifier for this chunk. The meaning of this value depends on the containing chunk.
    #[br(map = |raw: u16| ChunkType::from(raw))]
    #[bw(map = |t: &ChunkType| u16::from(*t))]
    pub chunk_type: ChunkType,
    /// Size of the chunk header (in bytes). Adding this value to the address of the chunk allows
    /// you to find its associated data (if any).
    pub header_size: u16,
    /// Total size of this chunk (in bytes). This is the chunkSize plus the size of any data
    /// associated with the chunk. Adding this value to the chunk allows you to completely skip its
    /// contents (including any child chunks). If this value is the same as chunkSize, there is no
    /// data associated with the chunk.
    pub size: u32,
}

impl ChunkHeader {
    /// Size of the bare header triple.
    pub const SIZE: u16 = 8;

    pub fn new(chunk_type: ChunkType, header_size: u16) -> Self {
        Self {
            chunk_type,
            header_size,
            size: header_size as u32,
        }
    }

    /// Subtracts the header size (8) from the current pos. Useful when a struct needs to find the
    /// start offset of the header. If pos is < 8, 0 is returned.
    pub fn get_header_offset(pos: u64) -> u64 {
        pos.saturating_sub(Self::SIZE as u64)
    }

    /// A header is usable only when it covers itself and its body covers the header.
    pub fn validate(&self, pos: u64) -> StreamResult<()> {
        if self.header_size < Self::SIZE || self.size < self.header_size as u32 {
            return Err(StreamError::new_string_context(
                format!(
                    "malformed {} chunk: header_size={}, size={}",
                    self.chunk_type, self.header_size, self.size
                ),
                pos,
                "validate ChunkHeader",
            ));
        }
        Ok(())
    }
}

impl Readable for ChunkHeader {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        read_binrw(reader).add_context(|| "read ChunkHeader")
    }
}

impl Writeable for ChunkHeader {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        write_binrw(self, writer).add_context(|| "write ChunkHeader")
    }
}

/// The read/write/refresh contract shared by every container chunk.
///
/// `refresh` recomputes counts, offsets and sizes from the children (children first) and must be
/// called before `write` whenever the tree was edited. It is idempotent.
pub trait Chunk {
    fn header(&self) -> &ChunkHeader;

    fn refresh(&mut self);

    /// Emits the chunk, header included, and returns the number of bytes written.
    fn write_chunk<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<u64>;

    fn chunk_type(&self) -> ChunkType {
        self.header().chunk_type
    }

    fn chunk_size(&self) -> u32 {
        self.header().size
    }
}

/// A chunk this library does not model. Its header and body are kept byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChunk {
    pub header: ChunkHeader,
    /// Everything after the 8 byte header triple, extended header fields included.
    pub body: Vec<u8>,
}

impl Readable for UnknownChunk {
    type Args = ChunkHeader;
    fn read<R: Read + Seek>(reader: &mut R, header: Self::Args) -> StreamResult<Self> {
        let body = read_bytes(reader, (header.size - ChunkHeader::SIZE as u32) as usize)
            .add_context(|| format!("read body for UnknownChunk {}", header.chunk_type))?;
        Ok(Self { header, body })
    }
}

impl Chunk for UnknownChunk {
    fn header(&self) -> &ChunkHeader {
        &self.header
    }

    fn refresh(&mut self) {
        self.header.size = ChunkHeader::SIZE as u32 + self.body.len() as u32;
    }

    fn write_chunk<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<u64> {
        write_binrw(&self.header, writer).add_context(|| "write header for UnknownChunk")?;
        write_bytes(writer, &self.body).add_context(|| "write body for UnknownChunk")?;
        Ok(ChunkHeader::SIZE as u64 + self.body.len() as u64)
    }
}

/// This is a reference to a unique entry (a ResTable_entry structure) in a resource table. The
/// value is structured as 0xpptteeee, where pp is the package index, tt is the type index in that
/// package, and eeee is the entry index in that type. The package and type values start at 1 for
/// the first item, to help catch cases where they have been supplied.
#[derive(Debug, BinRead, BinWrite, PartialEq, Eq, Hash, Copy, Clone, Default)]
#[brw(little)]
pub struct ResTableRef {
    pub entry_index: u16,
    pub type_index: u8,
    pub package_index: u8,
}

impl ResTableRef {
    pub fn new(package_index: u8, type_index: u8, entry_index: u16) -> Self {
        Self {
            entry_index,
            type_index,
            package_index,
        }
    }

    pub fn id(self) -> u32 {
        self.into()
    }

    /// Resource id 0 never names a resource.
    pub fn is_null(self) -> bool {
        self.id() == 0
    }
}

impl Display for ResTableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@0x{:08x}", self.id())
    }
}

impl From<ResTableRef> for u32 {
    fn from(value: ResTableRef) -> Self {
        (value.entry_index as u32)
            | ((value.type_index as u32) << 16)
            | ((value.package_index as u32) << 24)
    }
}

impl From<u32> for ResTableRef {
    fn from(value: u32) -> Self {
        Self {
            package_index: (value >> 24) as u8,
            type_index: (value >> 16) as u8,
            entry_index: value as u16,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ParseResTableRefError {
    Int(ParseIntError),
    InvalidStartChar,
}

impl Display for ParseResTableRefError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(e) => write!(f, "invalid resource id: {e}"),
            Self::InvalidStartChar => write!(f, "resource id must start with '@'"),
        }
    }
}

impl FromStr for ResTableRef {
    type Err = ParseResTableRefError;
    /// Accepts `@0x7f010000` as well as a plain decimal `@2130771968`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('@')
            .ok_or(ParseResTableRefError::InvalidStartChar)?;
        let val = match rest.strip_prefix("0x") {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => rest.parse(),
        }
        .map_err(ParseResTableRefError::Int)?;

        Ok(val.into())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::stream::{ReadableNoOptions, WriteableNoOptions};

    use super::*;

    #[test]
    fn header_keeps_unknown_types() {
        let mut reader = Cursor::new(b"\x99\x09\x10\x00\x20\x00\x00\x00".to_vec());
        let header = ChunkHeader::read_no_opts(&mut reader).unwrap();
        assert_eq!(header.chunk_type, ChunkType::Unknown(0x0999));
        assert_eq!(header.header_size, 0x10);
        assert_eq!(header.size, 0x20);

        let mut writer = Cursor::new(Vec::new());
        header.write_no_opts(&mut writer).unwrap();
        assert_eq!(writer.into_inner(), b"\x99\x09\x10\x00\x20\x00\x00\x00");
    }

    #[test]
    fn malformed_header_is_rejected() {
        let header = ChunkHeader {
            chunk_type: ChunkType::TablePackage,
            header_size: 0x120,
            size: 0x10,
        };
        assert!(header.validate(0).is_err());
    }

    #[test]
    fn res_table_ref_layout() {
        let reference = ResTableRef::from(0x7f020003);
        assert_eq!(reference.package_index, 0x7f);
        assert_eq!(reference.type_index, 0x02);
        assert_eq!(reference.entry_index, 0x0003);
        assert_eq!(reference.to_string(), "@0x7f020003");
        assert_eq!("@0x7f020003".parse::<ResTableRef>(), Ok(reference));
        assert_eq!(
            "7f020003".parse::<ResTableRef>(),
            Err(ParseResTableRefError::InvalidStartChar)
        );
    }
}
