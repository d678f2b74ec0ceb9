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

use std::{
    cell::RefCell,
    cmp::Ordering,
    io::{Read, Seek, SeekFrom, Write},
};

use tracing::{trace, warn};

use crate::{
    config::ResConfig,
    defs::{Chunk, ChunkHeader, ChunkType},
    entry::Entry,
    entry_array::{EntryArray, EntryArrayArgs, OffsetEncoding},
    error::{ArscError, Result},
    res_value::ResValue,
    stream::{
        read_bytes, write_bytes, NewResultCtx, Readable, ReadableNoOptions, ResultCtx,
        StreamError, StreamResult, WriteableNoOptions,
    },
    string_pool::{ResStringPoolRef, StringPool},
};

/// A collection of resource entries for a particular resource data type.
///
/// If the flag FLAG_SPARSE is not set in `flags`, then this struct is followed by an array of
/// uint32_t defining the resource values, corresponding to the array of the type strings in the
/// ResTable_package::type_strings string block. Each of these hold an index from entries_start; a
/// value of NO_ENTRY means that entry is not defined.
///
/// If the flag FLAG_SPARSE is set in `flags`, then this struct is followed by an array of
/// ResTable_sparseTypeEntry defining only the entries that have values for this type. Each entry
/// is sorted by their entry ID such that a binary search can be performed over the entries.
///
/// There may be multiple of these chunks for a particular resource type, supply different
/// configuration variations for the resource values of that type.
#[derive(Debug, Clone)]
pub struct TypeBlock {
    header: ChunkHeader,
    /// The type identifier this chunk is holding. Type IDs start at 1 (corresponding the the value
    /// of the type bits in a resource identifier). 0 is invalid.
    id: u8,
    flags: u8,
    reserved: u16,
    /// Configuration this collection of entries is designed for.
    config: ResConfig,
    /// Header bytes after the configuration written by newer tools.
    header_extra: Vec<u8>,
    entries: EntryArray,
    type_name: RefCell<Option<(u8, String)>>,
}

impl PartialEq for TypeBlock {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.flags == other.flags
            && self.config == other.config
            && self.header_extra == other.header_extra
            && self.entries == other.entries
    }
}

impl TypeBlock {
    /// id, flags, reserved, entry count and entries start.
    const FIXED_HEADER: usize = ChunkHeader::SIZE as usize + 1 + 1 + 2 + 4 + 4;

    pub fn new(id: u8, config: ResConfig) -> Self {
        let mut block = Self {
            header: ChunkHeader::new(ChunkType::TableType, 0),
            id,
            flags: 0,
            reserved: 0,
            config,
            header_extra: Vec::new(),
            entries: EntryArray::default(),
            type_name: RefCell::new(None),
        };
        block.refresh();
        block
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn set_id(&mut self, id: u8) {
        self.id = id;
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.flags = flags;
    }

    pub fn config(&self) -> &ResConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ResConfig {
        &mut self.config
    }

    pub fn is_default(&self) -> bool {
        self.config.is_default()
    }

    pub fn qualifiers(&self) -> String {
        self.config.qualifiers()
    }

    /// Name of this type in the package's type string pool. The lookup is cached and redone when
    /// the id changed since.
    pub fn type_name(&self, type_pool: &StringPool) -> Option<String> {
        if let Some((id, name)) = self.type_name.borrow().as_ref() {
            if *id == self.id {
                return Some(name.clone());
            }
        }
        let name = type_pool.get((self.id as usize).checked_sub(1)?)?.to_string();
        *self.type_name.borrow_mut() = Some((self.id, name.clone()));
        Some(name)
    }

    /// Stores `name` at this type's slot of the package type pool.
    pub fn set_type_name(&mut self, name: &str, type_pool: &mut StringPool) {
        if self.id == 0 {
            return;
        }
        type_pool.set(self.id as usize - 1, name.to_string());
        *self.type_name.get_mut() = Some((self.id, name.to_string()));
    }

    pub(crate) fn forget_type_name(&mut self) {
        *self.type_name.get_mut() = None;
    }

    pub fn entries(&self) -> &EntryArray {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut EntryArray {
        &mut self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Resizes the slot array; retained slots keep their entries.
    pub fn set_entry_count(&mut self, count: usize) {
        if count != self.entries.len() {
            self.entries.set_count(count);
        }
    }

    /// True when no slot holds an entry.
    pub fn is_empty(&self) -> bool {
        self.entries.count_non_null() == 0
    }

    pub fn count_non_null_entries(&self) -> usize {
        self.entries.count_non_null()
    }

    pub fn get_entry(&self, entry_id: u16) -> Option<&Entry> {
        self.entries.get(entry_id as usize)
    }

    pub fn get_entry_mut(&mut self, entry_id: u16) -> Option<&mut Entry> {
        self.entries.get_mut(entry_id as usize)
    }

    /// The entry at `entry_id`, created with a null value when the slot is empty.
    pub fn get_or_create_entry(&mut self, entry_id: u16) -> &mut Entry {
        self.entries.get_or_insert_with(entry_id as usize, || {
            Entry::new(ResStringPoolRef { index: 0 }, ResValue::null())
        })
    }

    /// Entry id of the first entry whose key resolves to `name` in `key_pool`.
    pub fn find_entry_id(&self, name: &str, key_pool: &StringPool) -> Option<u16> {
        self.entries
            .iter_non_null()
            .find(|(_, entry)| key_pool.resolve(entry.key) == Some(name))
            .map(|(id, _)| id as u16)
    }

    pub fn list_entries(&self, skip_null: bool) -> Vec<(u16, Option<&Entry>)> {
        self.entries
            .iter()
            .filter(|(_, entry)| !skip_null || entry.is_some())
            .map(|(id, entry)| (id as u16, entry))
            .collect()
    }

    /// Nulls the slot at `entry_id`.
    pub fn remove_entry(&mut self, entry_id: u16) -> Option<Entry> {
        self.entries.set_null(entry_id as usize)
    }

    /// Nulls every slot and returns the ids that held an entry.
    pub fn clean_entries(&mut self) -> Vec<u16> {
        let ids: Vec<u16> = self
            .entries
            .iter_non_null()
            .map(|(id, _)| id as u16)
            .collect();
        for id in &ids {
            self.entries.set_null(*id as usize);
        }
        ids
    }

    /// Copies the non-null entries of `other` into this block. Fails without touching anything
    /// when the type ids differ.
    pub fn merge(&mut self, other: &TypeBlock) -> Result<()> {
        self.merge_with(other, Entry::clone)
    }

    /// Like [`TypeBlock::merge`], passing every incoming entry through `convert`.
    pub fn merge_with<F: FnMut(&Entry) -> Entry>(
        &mut self,
        other: &TypeBlock,
        convert: F,
    ) -> Result<()> {
        self.check_same_type(other)?;
        self.entries.merge_with(&other.entries, convert);
        Ok(())
    }

    /// Like [`TypeBlock::merge`], first taking over the name `other` has in `other_type_pool`.
    /// `type_pool` is the type string pool of this block's package.
    pub fn merge_named(
        &mut self,
        other: &TypeBlock,
        type_pool: &mut StringPool,
        other_type_pool: &StringPool,
    ) -> Result<()> {
        self.merge_named_with(other, type_pool, other_type_pool, Entry::clone)
    }

    pub fn merge_named_with<F: FnMut(&Entry) -> Entry>(
        &mut self,
        other: &TypeBlock,
        type_pool: &mut StringPool,
        other_type_pool: &StringPool,
        convert: F,
    ) -> Result<()> {
        self.check_same_type(other)?;
        if let Some(name) = other.type_name(other_type_pool) {
            self.set_type_name(&name, type_pool);
        }
        self.merge_with(other, convert)
    }

    fn check_same_type(&self, other: &TypeBlock) -> Result<()> {
        if self.id != other.id {
            return Err(ArscError::TypeIdMismatch {
                expected: self.id,
                found: other.id,
            });
        }
        Ok(())
    }

    /// Orders by type id, then by configuration.
    pub fn compare(&self, other: &TypeBlock) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.config.cmp(&other.config))
    }

    fn encoding(&self) -> OffsetEncoding {
        OffsetEncoding::from_flags(self.flags)
    }

    fn entries_start(&self) -> u32 {
        self.header.header_size as u32 + self.entries.offsets_size(self.encoding()) as u32
    }
}

impl Chunk for TypeBlock {
    fn header(&self) -> &ChunkHeader {
        &self.header
    }

    fn refresh(&mut self) {
        let encoding = self.entries.fit_encoding(self.encoding());
        self.flags = encoding.apply(self.flags);
        self.header.header_size =
            (Self::FIXED_HEADER + self.config.size() + self.header_extra.len()) as u16;
        self.header.size = self.entries_start() + self.entries.entries_size() as u32;
    }

    fn write_chunk<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<u64> {
        let encoding = self.encoding();
        self.header
            .write_no_opts(writer)
            .add_context(|| "write header for TypeBlock")?;
        self.id
            .write_no_opts(writer)
            .add_context(|| "write id for TypeBlock")?;
        self.flags
            .write_no_opts(writer)
            .add_context(|| "write flags for TypeBlock")?;
        self.reserved
            .write_no_opts(writer)
            .add_context(|| "write reserved for TypeBlock")?;
        (self.entries.offset_count(encoding) as u32)
            .write_no_opts(writer)
            .add_context(|| "write entry_count for TypeBlock")?;
        self.entries_start()
            .write_no_opts(writer)
            .add_context(|| "write entries_start for TypeBlock")?;
        self.config
            .write_no_opts(writer)
            .add_context(|| "write config for TypeBlock")?;
        write_bytes(writer, &self.header_extra)
            .add_context(|| "write extra header for TypeBlock")?;
        self.entries
            .write(writer, encoding)
            .add_context(|| "write entries for TypeBlock")?;
        Ok(self.header.size as u64)
    }
}

impl Readable for TypeBlock {
    type Args = ChunkHeader;
    fn read<R: Read + Seek>(reader: &mut R, header: Self::Args) -> StreamResult<Self> {
        let header_offset = ChunkHeader::get_header_offset(reader.stream_position()?);

        let id = u8::read_no_opts(reader).add_context(|| "read id for TypeBlock")?;
        let flags = u8::read_no_opts(reader).add_context(|| "read flags for TypeBlock")?;
        let reserved = u16::read_no_opts(reader).add_context(|| "read reserved for TypeBlock")?;
        let entry_count =
            u32::read_no_opts(reader).add_context(|| "read entry_count for TypeBlock")?;
        let entries_start =
            u32::read_no_opts(reader).add_context(|| "read entries_start for TypeBlock")?;
        let config = ResConfig::read_no_opts(reader).add_context(|| "read config for TypeBlock")?;

        let consumed = Self::FIXED_HEADER + config.size();
        let header_size = header.header_size as usize;
        if header_size < consumed {
            return Err(StreamError::new_string_context(
                format!("header size {header_size} is smaller than its config ({consumed})"),
                header_offset,
                "validate header_size for TypeBlock",
            ));
        }
        let header_extra = read_bytes(reader, header_size - consumed)
            .add_context(|| "read extra header for TypeBlock")?;
        if !header_extra.is_empty() {
            warn!(
                type_id = id,
                extra = header_extra.len(),
                "type chunk carries unknown header bytes"
            );
        }

        let entries = EntryArray::read(
            reader,
            EntryArrayArgs {
                entry_count,
                encoding: OffsetEncoding::from_flags(flags),
                entries_start: header_offset + entries_start as u64,
            },
        )
        .add_context(|| "read entries for TypeBlock")?;

        reader
            .seek(SeekFrom::Start(header_offset + header.size as u64))
            .stream_context(|| "seek to end of TypeBlock")?;

        trace!(
            type_id = id,
            config = %config,
            entries = entries.len(),
            "read type chunk"
        );

        Ok(Self {
            header,
            id,
            flags,
            reserved,
            config,
            header_extra,
            entries,
            type_name: RefCell::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::stream::to_vec;

    use super::*;

    fn block_with(id: u8, entries: &[(u16, i32)]) -> TypeBlock {
        let mut block = TypeBlock::new(id, ResConfig::default());
        for (entry_id, value) in entries {
            block
                .get_or_create_entry(*entry_id)
                .set_value(ResValue::int(*value));
        }
        block
    }

    #[test]
    fn refresh_then_write_matches_size() {
        let mut block = block_with(2, &[(0, 1), (2, 3)]);
        block.refresh();
        let bytes = to_vec(|w| block.write_chunk(w).map(|_| ())).unwrap();
        assert_eq!(bytes.len(), block.chunk_size() as usize);

        let mut reader = Cursor::new(bytes);
        let header = ChunkHeader::read_no_opts(&mut reader).unwrap();
        let copy = TypeBlock::read(&mut reader, header).unwrap();
        assert_eq!(copy, block);
        assert_eq!(reader.position(), block.chunk_size() as u64);
    }

    #[test]
    fn merge_rejects_other_type_ids() {
        let mut target = block_with(1, &[(0, 1)]);
        let before = target.clone();
        let err = target.merge(&block_with(2, &[(1, 2)])).unwrap_err();
        assert!(matches!(
            err,
            ArscError::TypeIdMismatch {
                expected: 1,
                found: 2
            }
        ));
        assert_eq!(target, before);
    }

    #[test]
    fn merge_named_takes_over_the_type_name() {
        let mut pool = StringPool::default();
        pool.get_or_create("attr");
        pool.get_or_create("integer");
        let mut other_pool = StringPool::default();
        other_pool.get_or_create("attr");
        other_pool.get_or_create("number");

        let mut target = block_with(2, &[(0, 1)]);
        assert_eq!(target.type_name(&pool).as_deref(), Some("integer"));
        target
            .merge_named(&block_with(2, &[(1, 2)]), &mut pool, &other_pool)
            .unwrap();
        assert_eq!(target.type_name(&pool).as_deref(), Some("number"));
        assert_eq!(pool.get(1), Some("number"));
        assert_eq!(target.count_non_null_entries(), 2);

        let err = target.merge_named(&block_with(1, &[(0, 3)]), &mut pool, &other_pool);
        assert!(err.is_err());
        assert_eq!(pool.get(1), Some("number"));
        assert_eq!(pool.get(0), Some("attr"));
    }

    #[test]
    fn type_name_cache_follows_id() {
        let mut pool = StringPool::default();
        pool.get_or_create("attr");
        pool.get_or_create("string");
        let mut block = TypeBlock::new(1, ResConfig::default());
        assert_eq!(block.type_name(&pool).as_deref(), Some("attr"));
        block.set_id(2);
        assert_eq!(block.type_name(&pool).as_deref(), Some("string"));
    }

    #[test]
    fn ordering_is_id_then_config() {
        let mut land = ResConfig::default();
        land.set_orientation(2);
        let a = TypeBlock::new(1, land);
        let b = TypeBlock::new(1, ResConfig::default());
        let c = TypeBlock::new(0, ResConfig::default());
        assert_eq!(b.compare(&a), Ordering::Less);
        assert_eq!(c.compare(&b), Ordering::Less);
    }
}
