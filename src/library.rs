/*
    Copyright (C) 2025 fieryhenry

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

use std::io::{Read, Seek, SeekFrom, Write};

use crate::{
    defs::{Chunk, ChunkHeader, ChunkType},
    stream::{
        NewResultCtx, Readable, ReadableNoOptions, ResultCtx, StreamError, StreamResult,
        VecReadable, VecWritable, Writeable, WriteableNoOptions,
    },
};

/// Reads a NUL padded UTF-16 string occupying exactly `length` units.
pub(crate) fn read_utf16_fixed_null_string<R: Read + Seek>(
    reader: &mut R,
    length: usize,
) -> StreamResult<String> {
    let data = <Vec<u16>>::read_vec(reader, length)
        .add_context(|| "read utf16 chars for read_utf16_fixed_null_string")?;
    let end = data.iter().position(|c| *c == 0).unwrap_or(length);
    Ok(String::from_utf16_lossy(&data[..end]))
}

pub(crate) fn write_utf16_fixed_null_string<W: Write + Seek>(
    writer: &mut W,
    string: &str,
    length: usize,
) -> StreamResult<()> {
    let mut data: Vec<u16> = string.encode_utf16().collect();
    if data.len() > length {
        return Err(StreamError::new_string_context(
            format!("invalid data length {}, expected at most {}", data.len(), length),
            writer.stream_position()?,
            "validate data length for write_utf16_fixed_null_string",
        ));
    }
    data.resize(length, 0);
    data.write_vec(writer)
        .add_context(|| "write encoded utf16 data for write_utf16_fixed_null_string")
}

/// A shared library package-id to package name entry.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LibraryEntry {
    /// The package-id of this shared library was assigned at build time.
    /// We use a u32 to keep the structure aligned on a u32 boundary.
    pub package_id: u32,

    /// The package name of the shared library, \0 terminated
    pub package_name: String,
}

impl LibraryEntry {
    const NAME_LENGTH: usize = 128;
    pub const SIZE: usize = 4 + Self::NAME_LENGTH * 2;
}

impl Readable for LibraryEntry {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        Ok(Self {
            package_id: u32::read_no_opts(reader)
                .add_context(|| "read package_id for LibraryEntry")?,
            package_name: read_utf16_fixed_null_string(reader, Self::NAME_LENGTH)
                .add_context(|| "read package_name for LibraryEntry")?,
        })
    }
}

impl Writeable for LibraryEntry {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        self.package_id
            .write_no_opts(writer)
            .add_context(|| "write package_id for LibraryEntry")?;
        write_utf16_fixed_null_string(writer, &self.package_name, Self::NAME_LENGTH)
            .add_context(|| "write package_name for LibraryEntry")
    }
}

/// Maps the staged (non-finalized) resource id to its finalized resource id.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct StagedAliasEntry {
    /// The compile-time staged resource id to rewrite.
    pub staged_res_id: u32,

    /// The compile-time finalized resource id to which the staged resource id should be rewritten.
    pub finalized_res_id: u32,
}

impl StagedAliasEntry {
    pub const SIZE: usize = 8;
}

impl Readable for StagedAliasEntry {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        Ok(Self {
            staged_res_id: u32::read_no_opts(reader)
                .add_context(|| "read staged_res_id for StagedAliasEntry")?,
            finalized_res_id: u32::read_no_opts(reader)
                .add_context(|| "read finalized_res_id for StagedAliasEntry")?,
        })
    }
}

impl Writeable for StagedAliasEntry {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        self.staged_res_id
            .write_no_opts(writer)
            .add_context(|| "write staged_res_id for StagedAliasEntry")?;
        self.finalized_res_id
            .write_no_opts(writer)
            .add_context(|| "write finalized_res_id for StagedAliasEntry")
    }
}

/// A chunk made of a u32 count followed by fixed size records: the LIBRARY and STAGED_ALIAS
/// chunks of a package.
#[derive(Debug, Clone, PartialEq)]
pub struct CountedChunk<T> {
    header: ChunkHeader,
    pub entries: Vec<T>,
}

/// A package-id to package name mapping for any shared libraries used in this resource table. The
/// package-id's encoded in this resource table may be different that the id's assigned at runtime.
/// We must be able to translate the package-id's based on the package name.
pub type LibraryChunk = CountedChunk<LibraryEntry>;

/// A map that allows rewriting staged (non-finalized) resource ids to their finalized counterparts
pub type StagedAliasChunk = CountedChunk<StagedAliasEntry>;

pub trait CountedRecord: ReadableNoOptions + WriteableNoOptions {
    const CHUNK_TYPE: ChunkType;
    const RECORD_SIZE: usize;
}

impl CountedRecord for LibraryEntry {
    const CHUNK_TYPE: ChunkType = ChunkType::TableLibrary;
    const RECORD_SIZE: usize = LibraryEntry::SIZE;
}

impl CountedRecord for StagedAliasEntry {
    const CHUNK_TYPE: ChunkType = ChunkType::TableStagedAlias;
    const RECORD_SIZE: usize = StagedAliasEntry::SIZE;
}

impl<T: CountedRecord> CountedChunk<T> {
    const HEADER_SIZE: u16 = ChunkHeader::SIZE + 4;

    pub fn new(entries: Vec<T>) -> Self {
        let mut chunk = Self {
            header: ChunkHeader::new(T::CHUNK_TYPE, Self::HEADER_SIZE),
            entries,
        };
        chunk.refresh();
        chunk
    }
}

impl<T: CountedRecord> Readable for CountedChunk<T> {
    type Args = ChunkHeader;
    fn read<R: Read + Seek>(reader: &mut R, header: Self::Args) -> StreamResult<Self> {
        let header_offset = ChunkHeader::get_header_offset(reader.stream_position()?);
        let count = u32::read_no_opts(reader)
            .add_context(|| format!("read count for {} chunk", T::CHUNK_TYPE))?;
        reader
            .seek(SeekFrom::Start(header_offset + header.header_size as u64))
            .stream_context(|| format!("seek to entries of {} chunk", T::CHUNK_TYPE))?;
        let entries = <Vec<T>>::read_vec(reader, count as usize)
            .add_context(|| format!("read entries for {} chunk", T::CHUNK_TYPE))?;
        reader
            .seek(SeekFrom::Start(header_offset + header.size as u64))
            .stream_context(|| format!("seek to end of {} chunk", T::CHUNK_TYPE))?;
        Ok(Self { header, entries })
    }
}

impl<T: CountedRecord> Chunk for CountedChunk<T> {
    fn header(&self) -> &ChunkHeader {
        &self.header
    }

    fn refresh(&mut self) {
        self.header.header_size = Self::HEADER_SIZE;
        self.header.size = Self::HEADER_SIZE as u32 + (self.entries.len() * T::RECORD_SIZE) as u32;
    }

    fn write_chunk<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<u64> {
        self.header
            .write_no_opts(writer)
            .add_context(|| format!("write header for {} chunk", T::CHUNK_TYPE))?;
        (self.entries.len() as u32)
            .write_no_opts(writer)
            .add_context(|| format!("write count for {} chunk", T::CHUNK_TYPE))?;
        self.entries
            .write_vec(writer)
            .add_context(|| format!("write entries for {} chunk", T::CHUNK_TYPE))?;
        Ok(self.header.size as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::stream::to_vec;

    use super::*;

    #[test]
    fn staged_alias_chunk_layout() {
        let mut chunk = StagedAliasChunk::new(vec![StagedAliasEntry {
            staged_res_id: 0x7f010001,
            finalized_res_id: 0x7f010002,
        }]);
        chunk.refresh();
        let bytes = to_vec(|w| chunk.write_chunk(w).map(|_| ())).unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[..8], b"\x06\x02\x0c\x00\x14\x00\x00\x00");

        let mut reader = Cursor::new(bytes);
        let header = ChunkHeader::read_no_opts(&mut reader).unwrap();
        assert_eq!(StagedAliasChunk::read(&mut reader, header).unwrap(), chunk);
    }

    #[test]
    fn library_name_is_padded() {
        let chunk = LibraryChunk::new(vec![LibraryEntry {
            package_id: 2,
            package_name: "com.example.lib".to_string(),
        }]);
        let bytes = to_vec(|w| chunk.write_chunk(w).map(|_| ())).unwrap();
        assert_eq!(bytes.len(), 12 + 260);

        let mut reader = Cursor::new(bytes);
        let header = ChunkHeader::read_no_opts(&mut reader).unwrap();
        let copy = LibraryChunk::read(&mut reader, header).unwrap();
        assert_eq!(copy.entries[0].package_name, "com.example.lib");
    }
}
