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
    config::ResConfig,
    defs::{Chunk, ChunkHeader, ChunkType},
    stream::{
        read_bytes, write_bytes, NewResultCtx, Readable, ReadableNoOptions, ResultCtx,
        StreamError, StreamResult, VecReadable, VecWritable, WriteableNoOptions,
    },
    string_pool::StringPool,
    type_block::TypeBlock,
};

/// A specification of the resources defined by a particular type.
///
/// There should be one of these chunks for each resource type.
///
/// This structure is followed by an array of integers providing the set of configuration change
/// flags (ResTable_config::CONFIG_*) that have multiple resources for that configuration. In
/// addition, the high bit is set if that resource has been made public.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpecBlock {
    header: ChunkHeader,
    /// The type identifier this chunk is holding. Type IDs start at 1 (corresponding to the value
    /// of the type bits in a resource identifier). 0 is invalid.
    pub id: u8,
    res0: u8,
    /// Used to be reserved, if >0 specifies the number of ResTable_type entries for this spec.
    pub types_count: u16,
    header_extra: Vec<u8>,
    pub flags: Vec<u32>,
}

impl TypeSpecBlock {
    const FIXED_HEADER: usize = ChunkHeader::SIZE as usize + 1 + 1 + 2 + 4;
    pub const SPEC_PUBLIC: u32 = 0x40000000;

    pub fn new(id: u8) -> Self {
        Self {
            header: ChunkHeader::new(ChunkType::TableTypeSpec, Self::FIXED_HEADER as u16),
            id,
            res0: 0,
            types_count: 0,
            header_extra: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.flags.len()
    }

    pub fn is_public(&self, entry_id: u16) -> bool {
        self.flags
            .get(entry_id as usize)
            .is_some_and(|flags| flags & Self::SPEC_PUBLIC != 0)
    }

    pub fn set_public(&mut self, entry_id: u16, public: bool) {
        let id = entry_id as usize;
        if id >= self.flags.len() {
            self.flags.resize(id + 1, 0);
        }
        match public {
            true => self.flags[id] |= Self::SPEC_PUBLIC,
            false => self.flags[id] &= !Self::SPEC_PUBLIC,
        }
    }
}

impl Readable for TypeSpecBlock {
    type Args = ChunkHeader;
    fn read<R: Read + Seek>(reader: &mut R, header: Self::Args) -> StreamResult<Self> {
        let header_offset = ChunkHeader::get_header_offset(reader.stream_position()?);

        let id = u8::read_no_opts(reader).add_context(|| "read id for TypeSpecBlock")?;
        let res0 = u8::read_no_opts(reader).add_context(|| "read res0 for TypeSpecBlock")?;
        let types_count =
            u16::read_no_opts(reader).add_context(|| "read types_count for TypeSpecBlock")?;
        let entry_count =
            u32::read_no_opts(reader).add_context(|| "read entry_count for TypeSpecBlock")?;

        let header_size = header.header_size as usize;
        if header_size < Self::FIXED_HEADER {
            return Err(StreamError::new_string_context(
                format!("header size {header_size} is too small"),
                header_offset,
                "validate header_size for TypeSpecBlock",
            ));
        }
        let header_extra = read_bytes(reader, header_size - Self::FIXED_HEADER)
            .add_context(|| "read extra header for TypeSpecBlock")?;

        let flags = <Vec<u32>>::read_vec(reader, entry_count as usize)
            .add_context(|| "read config_masks for TypeSpecBlock")?;

        reader
            .seek(SeekFrom::Start(header_offset + header.size as u64))
            .stream_context(|| "seek to end of TypeSpecBlock")?;

        Ok(Self {
            header,
            id,
            res0,
            types_count,
            header_extra,
            flags,
        })
    }
}

impl Chunk for TypeSpecBlock {
    fn header(&self) -> &ChunkHeader {
        &self.header
    }

    fn refresh(&mut self) {
        self.header.header_size = (Self::FIXED_HEADER + self.header_extra.len()) as u16;
        self.header.size = self.header.header_size as u32 + 4 * self.flags.len() as u32;
    }

    fn write_chunk<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<u64> {
        self.header
            .write_no_opts(writer)
            .add_context(|| "write header for TypeSpecBlock")?;
        self.id
            .write_no_opts(writer)
            .add_context(|| "write id for TypeSpecBlock")?;
        self.res0
            .write_no_opts(writer)
            .add_context(|| "write res0 for TypeSpecBlock")?;
        self.types_count
            .write_no_opts(writer)
            .add_context(|| "write types_count for TypeSpecBlock")?;
        (self.flags.len() as u32)
            .write_no_opts(writer)
            .add_context(|| "write entry_count for TypeSpecBlock")?;
        write_bytes(writer, &self.header_extra)
            .add_context(|| "write extra header for TypeSpecBlock")?;
        self.flags
            .write_vec(writer)
            .add_context(|| "write config_masks for TypeSpecBlock")?;
        Ok(self.header.size as u64)
    }
}

/// One resource type of a package: its spec chunk and every configuration of it.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecTypePair {
    pub spec: TypeSpecBlock,
    pub types: Vec<TypeBlock>,
    /// False for type chunks read without a spec chunk. Such a spec is only written once one of
    /// its flags is set.
    has_spec: bool,
}

impl SpecTypePair {
    pub fn new(id: u8) -> Self {
        Self {
            spec: TypeSpecBlock::new(id),
            types: Vec::new(),
            has_spec: true,
        }
    }

    pub(crate) fn without_spec(id: u8) -> Self {
        Self {
            has_spec: false,
            ..Self::new(id)
        }
    }

    pub fn has_spec(&self) -> bool {
        self.has_spec
    }

    pub(crate) fn set_spec(&mut self, spec: TypeSpecBlock) {
        self.spec = spec;
        self.has_spec = true;
    }

    pub(crate) fn mark_spec(&mut self) {
        self.has_spec = true;
    }

    pub fn id(&self) -> u8 {
        self.spec.id
    }

    /// Largest entry count among the spec and its type blocks. New entries get this id.
    pub fn highest_entry_count(&self) -> usize {
        self.types
            .iter()
            .map(TypeBlock::entry_count)
            .chain(std::iter::once(self.spec.entry_count()))
            .max()
            .unwrap_or(0)
    }

    /// Entry id of any entry named `name` across the configurations of this type.
    pub fn get_any_entry(&self, name: &str, key_pool: &StringPool) -> Option<u16> {
        self.types
            .iter()
            .find_map(|block| block.find_entry_id(name, key_pool))
    }

    pub fn type_block(&self, config: &ResConfig) -> Option<&TypeBlock> {
        self.types.iter().find(|block| block.config() == config)
    }

    /// Index into `types` of the block for `config`, creating it when missing.
    pub fn get_or_create_type_block(&mut self, config: &ResConfig) -> usize {
        if let Some(index) = self.types.iter().position(|block| block.config() == config) {
            return index;
        }
        let mut block = TypeBlock::new(self.id(), config.clone());
        block.set_entry_count(self.highest_entry_count());
        self.types.push(block);
        self.types.len() - 1
    }

    pub fn sort_types(&mut self) {
        self.types.sort_by(|a, b| a.compare(b));
    }

    /// Refreshes the type blocks, then sizes the spec flags to cover every entry id.
    pub fn refresh(&mut self) {
        for block in &mut self.types {
            block.refresh();
        }
        let count = self.highest_entry_count();
        self.spec.flags.resize(count, 0);
        if self.spec.flags.iter().any(|flags| *flags != 0) {
            self.has_spec = true;
        }
        if self.spec.types_count != 0 {
            self.spec.types_count = self.types.len() as u16;
        }
        self.spec.refresh();
    }

    fn spec_size(&self) -> u64 {
        match self.has_spec {
            true => self.spec.chunk_size() as u64,
            false => 0,
        }
    }

    pub fn size(&self) -> u64 {
        self.spec_size()
            + self
                .types
                .iter()
                .map(|block| block.chunk_size() as u64)
                .sum::<u64>()
    }

    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<u64> {
        let mut written = 0;
        if self.has_spec {
            written += self
                .spec
                .write_chunk(writer)
                .add_context(|| format!("write spec 0x{:02x}", self.id()))?;
        }
        for block in &self.types {
            written += block
                .write_chunk(writer)
                .add_context(|| format!("write type 0x{:02x}", self.id()))?;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use crate::res_value::ResValue;

    use super::*;

    #[test]
    fn highest_entry_count_drives_spec_flags() {
        let mut pair = SpecTypePair::new(3);
        let default = pair.get_or_create_type_block(&ResConfig::default());
        pair.types[default].get_or_create_entry(4);

        let mut land = ResConfig::default();
        land.set_orientation(2);
        let land = pair.get_or_create_type_block(&land);
        assert_eq!(pair.types[land].entry_count(), 5);
        assert_eq!(pair.get_or_create_type_block(&ResConfig::default()), default);

        pair.refresh();
        assert_eq!(pair.spec.entry_count(), 5);
        assert_eq!(pair.spec.chunk_size(), 16 + 5 * 4);
    }

    #[test]
    fn missing_spec_is_not_invented() {
        let mut pair = SpecTypePair::without_spec(2);
        let index = pair.get_or_create_type_block(&ResConfig::default());
        pair.types[index].get_or_create_entry(1);
        pair.refresh();
        assert!(!pair.has_spec());
        assert_eq!(pair.size(), pair.types[index].chunk_size() as u64);

        pair.spec.set_public(1, true);
        pair.refresh();
        assert!(pair.has_spec());
        assert_eq!(pair.size(), 16 + 2 * 4 + pair.types[index].chunk_size() as u64);
    }

    #[test]
    fn any_entry_is_found_in_other_configs() {
        let mut keys = StringPool::default();
        let key = keys.get_or_create("title");
        let mut pair = SpecTypePair::new(1);
        let mut land = ResConfig::default();
        land.set_orientation(2);
        let index = pair.get_or_create_type_block(&land);
        let entry = pair.types[index].get_or_create_entry(2);
        entry.key = key;
        entry.set_value(ResValue::int(1));

        assert_eq!(pair.get_any_entry("title", &keys), Some(2));
        assert_eq!(pair.get_any_entry("missing", &keys), None);
    }
}
