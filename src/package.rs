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
    cell::OnceCell,
    collections::BTreeMap,
    io::{Read, Seek, SeekFrom, Write},
};

use tracing::{debug, trace, warn};

use crate::{
    config::ResConfig,
    defs::{Chunk, ChunkHeader, ChunkType, UnknownChunk},
    entry::Entry,
    error::{ArscError, Result},
    group::{EntryGroup, GroupView},
    library::{
        read_utf16_fixed_null_string, write_utf16_fixed_null_string, LibraryChunk, LibraryEntry,
        StagedAliasChunk, StagedAliasEntry,
    },
    spec_type_pair::{SpecTypePair, TypeSpecBlock},
    stream::{
        NewResultCtx, Readable, ReadableNoOptions, ResultCtx, StreamResult, WriteableNoOptions,
    },
    string_pool::StringPool,
    type_block::TypeBlock,
};

/// Package children other than the string pools and the type chunks.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageChunk {
    Library(LibraryChunk),
    StagedAlias(StagedAliasChunk),
    /// Overlayable declarations and anything else, kept byte for byte.
    Unknown(UnknownChunk),
}

impl PackageChunk {
    fn refresh(&mut self) {
        match self {
            Self::Library(chunk) => chunk.refresh(),
            Self::StagedAlias(chunk) => chunk.refresh(),
            Self::Unknown(chunk) => chunk.refresh(),
        }
    }

    fn chunk_size(&self) -> u32 {
        match self {
            Self::Library(chunk) => chunk.chunk_size(),
            Self::StagedAlias(chunk) => chunk.chunk_size(),
            Self::Unknown(chunk) => chunk.chunk_size(),
        }
    }

    fn write_chunk<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<u64> {
        match self {
            Self::Library(chunk) => chunk.write_chunk(writer),
            Self::StagedAlias(chunk) => chunk.write_chunk(writer),
            Self::Unknown(chunk) => chunk.write_chunk(writer),
        }
    }
}

/// A collection of resource data types within a package. Followed by one or more ResTable_type
/// and ResTable_typeSpec structures containing the entry values for each resource type.
#[derive(Debug, Clone)]
pub struct PackageBlock {
    header: ChunkHeader,
    /// If this is a base package, its ID. Package IDs start at 1 (corresponding to the value of
    /// the package bits in a resource identifier). 0 means this is not a base package.
    id: u32,
    /// Actual name of this package, null terminated
    name: String,
    type_strings: StringPool,
    key_strings: StringPool,
    /// Last index into type_strings that is for public use by others.
    pub last_public_type: u32,
    /// Last index into key_strings that is for public use by others.
    pub last_public_key: u32,
    /// Absent in headers written before the field existed.
    pub type_id_offset: Option<u32>,
    pairs: Vec<SpecTypePair>,
    /// Each chunk with the number of pairs written before it.
    chunks: Vec<(usize, PackageChunk)>,
    /// Id to group index. Dropped on any mutable access to the type blocks and rebuilt on the
    /// next lookup.
    groups: OnceCell<BTreeMap<u32, EntryGroup>>,
}

impl PartialEq for PackageBlock {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.type_strings == other.type_strings
            && self.key_strings == other.key_strings
            && self.pairs == other.pairs
            && self.chunks == other.chunks
    }
}

impl PackageBlock {
    const NAME_LENGTH: usize = 128;
    pub const HEADER_SIZE: u16 = 288;
    pub const LEGACY_HEADER_SIZE: u16 = 284;

    pub fn new(id: u8, name: &str) -> Result<Self> {
        check_name(name)?;
        let mut package = Self {
            header: ChunkHeader::new(ChunkType::TablePackage, Self::HEADER_SIZE),
            id: id as u32,
            name: name.to_string(),
            type_strings: StringPool::new(true),
            key_strings: StringPool::new(true),
            last_public_type: 0,
            last_public_key: 0,
            type_id_offset: Some(0),
            pairs: Vec::new(),
            chunks: Vec::new(),
            groups: OnceCell::new(),
        };
        package.refresh();
        Ok(package)
    }

    pub fn id(&self) -> u8 {
        self.id as u8
    }

    /// Changes the package id; every resource id of the package moves with it.
    pub fn set_id(&mut self, id: u8) {
        self.id = id as u32;
        self.rebuild_entry_groups();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        check_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    pub fn type_strings(&self) -> &StringPool {
        &self.type_strings
    }

    pub fn key_strings(&self) -> &StringPool {
        &self.key_strings
    }

    pub fn key_strings_mut(&mut self) -> &mut StringPool {
        &mut self.key_strings
    }

    pub fn resource_id(&self, type_id: u8, entry_id: u16) -> u32 {
        ((self.id & 0xff) << 24) | ((type_id as u32) << 16) | entry_id as u32
    }

    pub fn type_name(&self, type_id: u8) -> Option<&str> {
        self.type_strings.get((type_id as usize).checked_sub(1)?)
    }

    /// Names the type `type_id`, growing the type pool when needed.
    pub fn set_type_name(&mut self, type_id: u8, name: &str) {
        if type_id == 0 || self.type_name(type_id) == Some(name) {
            return;
        }
        match self.pairs.iter_mut().find(|pair| pair.id() == type_id) {
            Some(pair) => {
                for block in &mut pair.types {
                    block.forget_type_name();
                }
                match pair.types.first_mut() {
                    Some(block) => block.set_type_name(name, &mut self.type_strings),
                    None => self.type_strings.set(type_id as usize - 1, name.to_string()),
                }
            }
            None => self.type_strings.set(type_id as usize - 1, name.to_string()),
        }
    }

    pub fn spec_type_pairs(&self) -> &[SpecTypePair] {
        &self.pairs
    }

    pub fn spec_type_pair(&self, type_id: u8) -> Option<&SpecTypePair> {
        self.pairs.iter().find(|pair| pair.id() == type_id)
    }

    fn pair_index(&self, type_id: u8) -> Option<usize> {
        self.pairs.iter().position(|pair| pair.id() == type_id)
    }

    fn pair_index_or_create(&mut self, type_id: u8) -> usize {
        match self.pair_index(type_id) {
            Some(index) => index,
            None => {
                self.pairs.push(SpecTypePair::new(type_id));
                self.pairs.len() - 1
            }
        }
    }

    pub fn get_or_create_spec_type_pair(&mut self, type_id: u8) -> &mut SpecTypePair {
        self.forget_entry_groups();
        let index = self.pair_index_or_create(type_id);
        &mut self.pairs[index]
    }

    pub fn type_block(&self, type_id: u8, config: &ResConfig) -> Option<&TypeBlock> {
        self.spec_type_pair(type_id)?.type_block(config)
    }

    /// Entries may be added or removed through the returned block; the group index is rebuilt
    /// on the next lookup.
    pub fn type_block_mut(&mut self, type_id: u8, config: &ResConfig) -> Option<&mut TypeBlock> {
        self.forget_entry_groups();
        let index = self.pair_index(type_id)?;
        self.pairs[index]
            .types
            .iter_mut()
            .find(|block| block.config() == config)
    }

    pub fn get_or_create_type_block(&mut self, type_id: u8, config: &ResConfig) -> &mut TypeBlock {
        let pair = self.get_or_create_spec_type_pair(type_id);
        let index = pair.get_or_create_type_block(config);
        &mut pair.types[index]
    }

    /// Every type block of the package, in pair order.
    pub fn type_blocks(&self) -> impl Iterator<Item = &TypeBlock> + '_ {
        self.pairs.iter().flat_map(|pair| pair.types.iter())
    }

    /// Returns the resource id of the entry named `name` in the given type and configuration,
    /// creating the entry when needed. A name already used by another configuration keeps its
    /// entry id; a new name gets the next free id of the type.
    pub fn get_or_create_entry(&mut self, type_id: u8, config: &ResConfig, name: &str) -> u32 {
        let pair_index = self.pair_index_or_create(type_id);
        let pair = &mut self.pairs[pair_index];
        let type_index = pair.get_or_create_type_block(config);

        let entry_id = match pair.types[type_index].find_entry_id(name, &self.key_strings) {
            Some(id) => id,
            None => match pair.get_any_entry(name, &self.key_strings) {
                Some(id) => id,
                None => pair.highest_entry_count() as u16,
            },
        };
        let key = self.key_strings.get_or_create(name);
        pair.types[type_index]
            .get_or_create_entry(entry_id)
            .set_spec_reference(key.index);
        self.forget_entry_groups();
        self.resource_id(type_id, entry_id)
    }

    fn groups(&self) -> &BTreeMap<u32, EntryGroup> {
        self.groups.get_or_init(|| self.build_entry_groups())
    }

    pub fn entry_group(&self, resource_id: u32) -> Option<&EntryGroup> {
        self.groups().get(&resource_id)
    }

    pub fn entry_groups(&self) -> impl Iterator<Item = GroupView<'_>> + '_ {
        self.groups().values().map(|group| GroupView::new(self, group))
    }

    /// The group of `resource_id`, or none when no configuration holds an entry for it.
    pub fn group_view(&self, resource_id: u32) -> Option<GroupView<'_>> {
        let view = GroupView::new(self, self.groups().get(&resource_id)?);
        (!view.is_empty()).then_some(view)
    }

    pub fn count_entry_groups(&self) -> usize {
        self.groups().len()
    }

    /// Nulls the entry of `resource_id` in `config` and drops it from its group.
    pub fn remove_entry(&mut self, resource_id: u32, config: &ResConfig) -> Option<Entry> {
        let type_id = (resource_id >> 16) as u8;
        let pair_index = self.pair_index(type_id)?;
        let pair = &mut self.pairs[pair_index];
        let type_index = pair.types.iter().position(|block| block.config() == config)?;
        let removed = pair.types[type_index].remove_entry(resource_id as u16)?;
        self.forget_entry_groups();
        Some(removed)
    }

    /// Nulls every entry of one type block, dropping them from their groups.
    pub fn clean_entries(&mut self, type_id: u8, config: &ResConfig) -> usize {
        let Some(pair_index) = self.pair_index(type_id) else {
            return 0;
        };
        let pair = &mut self.pairs[pair_index];
        let Some(type_index) = pair.types.iter().position(|block| block.config() == config) else {
            return 0;
        };
        let removed = pair.types[type_index].clean_entries().len();
        self.forget_entry_groups();
        removed
    }

    fn forget_entry_groups(&mut self) {
        self.groups.take();
    }

    /// Recomputes the id to group index from the type blocks.
    pub fn rebuild_entry_groups(&mut self) {
        self.groups = OnceCell::from(self.build_entry_groups());
    }

    fn build_entry_groups(&self) -> BTreeMap<u32, EntryGroup> {
        let mut groups: BTreeMap<u32, EntryGroup> = BTreeMap::new();
        for pair in &self.pairs {
            for (type_index, block) in pair.types.iter().enumerate() {
                for (entry_id, _) in block.entries().iter_non_null() {
                    let resource_id = self.resource_id(pair.id(), entry_id as u16);
                    groups
                        .entry(resource_id)
                        .or_insert_with(|| EntryGroup::new(resource_id))
                        .add(type_index);
                }
            }
        }
        groups
    }

    /// Points every entry of the resource at the spec string `name`. Returns whether anything
    /// changed.
    pub fn rename_spec(&mut self, resource_id: u32, name: &str) -> bool {
        let Some(view) = self.group_view(resource_id) else {
            return false;
        };
        if view.is_empty() || (view.is_all_same_spec() && view.spec_name() == Some(name)) {
            return false;
        }
        let index = self.key_strings.get_or_create(name).index;
        self.rename_spec_reference(resource_id, index)
    }

    /// Rewrites the spec reference of every entry of the resource that differs from `index`.
    pub fn rename_spec_reference(&mut self, resource_id: u32, index: u32) -> bool {
        let Some(group) = self.groups().get(&resource_id) else {
            return false;
        };
        let members = group.members().to_vec();
        let entry_id = group.entry_id();
        let type_id = group.type_id();
        let Some(pair_index) = self.pair_index(type_id) else {
            return false;
        };
        let mut changed = false;
        for type_index in members {
            let entry = self.pairs[pair_index]
                .types
                .get_mut(type_index)
                .and_then(|block| block.get_entry_mut(entry_id));
            if let Some(entry) = entry {
                if entry.spec_reference() != index {
                    entry.set_spec_reference(index);
                    changed = true;
                }
            }
        }
        changed
    }

    pub fn library_entries(&self) -> impl Iterator<Item = &LibraryEntry> + '_ {
        self.chunks().flat_map(|chunk| match chunk {
            PackageChunk::Library(library) => library.entries.as_slice(),
            _ => &[],
        })
    }

    pub fn add_library_entry(&mut self, entry: LibraryEntry) {
        if self
            .library_entries()
            .any(|existing| existing.package_id == entry.package_id)
        {
            return;
        }
        let library = self.chunks.iter_mut().find_map(|(_, chunk)| match chunk {
            PackageChunk::Library(library) => Some(library),
            _ => None,
        });
        match library {
            Some(library) => library.entries.push(entry),
            None => self.push_chunk(PackageChunk::Library(LibraryChunk::new(vec![entry]))),
        }
    }

    pub fn staged_aliases(&self) -> impl Iterator<Item = &StagedAliasEntry> + '_ {
        self.chunks().flat_map(|chunk| match chunk {
            PackageChunk::StagedAlias(aliases) => aliases.entries.as_slice(),
            _ => &[],
        })
    }

    pub fn search_by_staged_res_id(&self, staged_res_id: u32) -> Option<&StagedAliasEntry> {
        self.staged_aliases()
            .find(|entry| entry.staged_res_id == staged_res_id)
    }

    pub fn add_staged_alias(&mut self, entry: StagedAliasEntry) {
        if self.search_by_staged_res_id(entry.staged_res_id).is_some() {
            return;
        }
        let aliases = self.chunks.iter_mut().find_map(|(_, chunk)| match chunk {
            PackageChunk::StagedAlias(aliases) => Some(aliases),
            _ => None,
        });
        match aliases {
            Some(aliases) => aliases.entries.push(entry),
            None => self.push_chunk(PackageChunk::StagedAlias(StagedAliasChunk::new(vec![entry]))),
        }
    }

    /// Library, staged alias and unknown chunks in file order.
    pub fn chunks(&self) -> impl Iterator<Item = &PackageChunk> + '_ {
        self.chunks.iter().map(|(_, chunk)| chunk)
    }

    /// New chunks go after every type pair.
    fn push_chunk(&mut self, chunk: PackageChunk) {
        self.chunks.push((usize::MAX, chunk));
    }

    /// Number of entries across every configuration, null slots excluded.
    pub fn count_entries(&self) -> usize {
        self.type_blocks()
            .map(TypeBlock::count_non_null_entries)
            .sum()
    }

    pub fn sort_types(&mut self) {
        self.pairs.sort_by_key(SpecTypePair::id);
        for pair in &mut self.pairs {
            pair.sort_types();
        }
        self.rebuild_entry_groups();
    }

    /// Merges `other`, a type block of `other_package`, into the block of the same type and
    /// configuration, creating it when missing. The type takes over the name it has in
    /// `other_package` and spec names are looked up in (or added to) this package's key pool.
    /// Values are copied as they are; [`crate::TableBlock::merge`] also moves the strings they
    /// point at.
    pub fn merge_type_block(&mut self, other: &TypeBlock, other_package: &PackageBlock) -> Result<()> {
        self.forget_entry_groups();
        let pair_index = self.pair_index_or_create(other.id());
        let key_strings = &mut self.key_strings;
        let pair = &mut self.pairs[pair_index];
        let type_index = pair.get_or_create_type_block(other.config());
        for block in &mut pair.types {
            block.forget_type_name();
        }
        pair.types[type_index].merge_named_with(
            other,
            &mut self.type_strings,
            &other_package.type_strings,
            |entry| {
                let mut entry = entry.clone();
                if let Some(name) = other_package.key_strings.resolve(entry.key) {
                    entry.key = key_strings.get_or_create(name);
                }
                entry
            },
        )
    }

    /// Copies the types and entries of `other` into this package.
    ///
    /// Type names are taken from `other`. Spec names and string values are looked up in (or
    /// added to) this package's key pool and `table_pool`.
    pub fn merge(&mut self, other: &PackageBlock, table_pool: &mut StringPool, other_pool: &StringPool) {
        for other_pair in &other.pairs {
            let type_id = other_pair.id();
            if let Some(name) = other.type_name(type_id) {
                self.set_type_name(type_id, name);
            }

            let pair_index = self.pair_index_or_create(type_id);
            let key_strings = &mut self.key_strings;
            let pair = &mut self.pairs[pair_index];

            for other_block in &other_pair.types {
                let type_index = pair.get_or_create_type_block(other_block.config());
                let merged = pair.types[type_index].merge_named_with(
                    other_block,
                    &mut self.type_strings,
                    &other.type_strings,
                    |entry| {
                        let mut entry = entry.clone();
                        if let Some(name) = other.key_strings.resolve(entry.key) {
                            entry.key = key_strings.get_or_create(name);
                        }
                        entry.remap_strings(|index| {
                            table_pool
                                .import(other_pool, index as usize)
                                .map_or(index, |reference| reference.index)
                        });
                        entry
                    },
                );
                if let Err(err) = merged {
                    warn!(%err, "skipping type block during package merge");
                }
            }

            let flags = &other_pair.spec.flags;
            if pair.spec.flags.len() < flags.len() {
                pair.spec.flags.resize(flags.len(), 0);
            }
            for (id, flag) in flags.iter().enumerate() {
                pair.spec.flags[id] |= *flag;
            }
            if other_pair.has_spec() {
                pair.mark_spec();
            }
        }

        for entry in other.library_entries().cloned().collect::<Vec<_>>() {
            self.add_library_entry(entry);
        }
        for entry in other.staged_aliases().copied().collect::<Vec<_>>() {
            self.add_staged_alias(entry);
        }
        self.rebuild_entry_groups();
        debug!(
            package = self.id,
            entries = self.count_entries(),
            "merged package {}",
            other.name
        );
    }
}

fn check_name(name: &str) -> Result<()> {
    let length = name.encode_utf16().count();
    if length >= PackageBlock::NAME_LENGTH {
        return Err(ArscError::PackageName(length));
    }
    Ok(())
}

impl Chunk for PackageBlock {
    fn header(&self) -> &ChunkHeader {
        &self.header
    }

    fn refresh(&mut self) {
        self.type_strings.refresh();
        self.key_strings.refresh();
        for pair in &mut self.pairs {
            pair.refresh();
        }
        for (_, chunk) in &mut self.chunks {
            chunk.refresh();
        }
        self.header.header_size = match self.type_id_offset {
            Some(_) => Self::HEADER_SIZE,
            None => Self::LEGACY_HEADER_SIZE,
        };
        self.header.size = self.header.header_size as u32
            + self.type_strings.chunk_size()
            + self.key_strings.chunk_size()
            + self.pairs.iter().map(|pair| pair.size() as u32).sum::<u32>()
            + self.chunks().map(PackageChunk::chunk_size).sum::<u32>();
    }

    fn write_chunk<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<u64> {
        let type_strings = self.header.header_size as u32;
        let key_strings = type_strings + self.type_strings.chunk_size();

        self.header
            .write_no_opts(writer)
            .add_context(|| "write header for PackageBlock")?;
        self.id
            .write_no_opts(writer)
            .add_context(|| "write id for PackageBlock")?;
        write_utf16_fixed_null_string(writer, &self.name, Self::NAME_LENGTH)
            .add_context(|| "write name for PackageBlock")?;
        type_strings
            .write_no_opts(writer)
            .add_context(|| "write type_strings for PackageBlock")?;
        self.last_public_type
            .write_no_opts(writer)
            .add_context(|| "write last_public_type for PackageBlock")?;
        key_strings
            .write_no_opts(writer)
            .add_context(|| "write key_strings for PackageBlock")?;
        self.last_public_key
            .write_no_opts(writer)
            .add_context(|| "write last_public_key for PackageBlock")?;
        if let Some(type_id_offset) = self.type_id_offset {
            type_id_offset
                .write_no_opts(writer)
                .add_context(|| "write type_id_offset for PackageBlock")?;
        }

        self.type_strings
            .write_chunk(writer)
            .add_context(|| "write type_strings pool for PackageBlock")?;
        self.key_strings
            .write_chunk(writer)
            .add_context(|| "write key_strings pool for PackageBlock")?;

        let mut chunks = self.chunks.iter().peekable();
        for (index, pair) in self.pairs.iter().enumerate() {
            while let Some((_, chunk)) = chunks.next_if(|(position, _)| *position <= index) {
                chunk
                    .write_chunk(writer)
                    .add_context(|| "write chunk for PackageBlock")?;
            }
            pair.write(writer)
                .add_context(|| "write types for PackageBlock")?;
        }
        for (_, chunk) in chunks {
            chunk
                .write_chunk(writer)
                .add_context(|| "write trailing chunk for PackageBlock")?;
        }
        Ok(self.header.size as u64)
    }
}

impl Readable for PackageBlock {
    type Args = ChunkHeader;
    fn read<R: Read + Seek>(reader: &mut R, header: Self::Args) -> StreamResult<Self> {
        let header_offset = ChunkHeader::get_header_offset(reader.stream_position()?);
        let end = header_offset + header.size as u64;

        let id = u32::read_no_opts(reader).add_context(|| "read id for PackageBlock")?;
        let name = read_utf16_fixed_null_string(reader, Self::NAME_LENGTH)
            .add_context(|| "read name for PackageBlock")?;
        let type_strings_offset =
            u32::read_no_opts(reader).add_context(|| "read type_strings for PackageBlock")?;
        let last_public_type =
            u32::read_no_opts(reader).add_context(|| "read last_public_type for PackageBlock")?;
        let key_strings_offset =
            u32::read_no_opts(reader).add_context(|| "read key_strings for PackageBlock")?;
        let last_public_key =
            u32::read_no_opts(reader).add_context(|| "read last_public_key for PackageBlock")?;
        let type_id_offset = if header.header_size >= Self::HEADER_SIZE {
            Some(
                u32::read_no_opts(reader)
                    .add_context(|| "read type_id_offset for PackageBlock")?,
            )
        } else {
            None
        };

        let mut package = Self {
            header,
            id,
            name,
            type_strings: StringPool::new(true),
            key_strings: StringPool::new(true),
            last_public_type,
            last_public_key,
            type_id_offset,
            pairs: Vec::new(),
            chunks: Vec::new(),
            groups: OnceCell::new(),
        };

        let mut have_type_strings = false;
        let mut have_key_strings = false;
        let mut pos = header_offset + header.header_size as u64;
        while pos + ChunkHeader::SIZE as u64 <= end {
            reader
                .seek(SeekFrom::Start(pos))
                .stream_context(|| "seek to child of PackageBlock")?;
            let child = ChunkHeader::read_no_opts(reader)
                .add_context(|| "read child header for PackageBlock")?;
            child.validate(pos)?;
            trace!(chunk = %child.chunk_type, offset = pos, size = child.size, "package child");
            let relative = (pos - header_offset) as u32;

            match child.chunk_type {
                ChunkType::StringPool
                    if relative == type_strings_offset
                        || (!have_type_strings && relative != key_strings_offset) =>
                {
                    package.type_strings = StringPool::read(reader, child)
                        .add_context(|| "read type_strings for PackageBlock")?;
                    have_type_strings = true;
                }
                ChunkType::StringPool if !have_key_strings => {
                    package.key_strings = StringPool::read(reader, child)
                        .add_context(|| "read key_strings for PackageBlock")?;
                    have_key_strings = true;
                }
                ChunkType::TableTypeSpec => {
                    let spec = TypeSpecBlock::read(reader, child)
                        .add_context(|| "read spec for PackageBlock")?;
                    let spec_id = spec.id;
                    package.get_or_create_spec_type_pair(spec_id).set_spec(spec);
                }
                ChunkType::TableType => {
                    let block = TypeBlock::read(reader, child)
                        .add_context(|| "read type for PackageBlock")?;
                    match package.pair_index(block.id()) {
                        Some(index) => package.pairs[index].types.push(block),
                        None => {
                            warn!(type_id = block.id(), "type chunk without a spec chunk");
                            let mut pair = SpecTypePair::without_spec(block.id());
                            pair.types.push(block);
                            package.pairs.push(pair);
                        }
                    }
                }
                ChunkType::TableLibrary => {
                    let library = LibraryChunk::read(reader, child)
                        .add_context(|| "read library for PackageBlock")?;
                    package
                        .chunks
                        .push((package.pairs.len(), PackageChunk::Library(library)));
                }
                ChunkType::TableStagedAlias => {
                    let aliases = StagedAliasChunk::read(reader, child)
                        .add_context(|| "read staged alias for PackageBlock")?;
                    package
                        .chunks
                        .push((package.pairs.len(), PackageChunk::StagedAlias(aliases)));
                }
                other => {
                    if other == ChunkType::StringPool {
                        warn!(offset = pos, "extra string pool in package kept as is");
                    }
                    let chunk = UnknownChunk::read(reader, child)
                        .add_context(|| "read unknown chunk for PackageBlock")?;
                    package
                        .chunks
                        .push((package.pairs.len(), PackageChunk::Unknown(chunk)));
                }
            }
            pos += child.size as u64;
        }

        reader
            .seek(SeekFrom::Start(end))
            .stream_context(|| "seek to end of PackageBlock")?;
        package.rebuild_entry_groups();
        debug!(
            package = package.id,
            name = %package.name,
            types = package.pairs.len(),
            groups = package.count_entry_groups(),
            "read package"
        );
        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use crate::res_value::ResValue;

    use super::*;

    fn land() -> ResConfig {
        let mut config = ResConfig::default();
        config.set_orientation(2);
        config
    }

    #[test]
    fn same_name_keeps_its_id_across_configs() {
        let mut package = PackageBlock::new(0x7f, "com.example").unwrap();
        package.set_type_name(1, "string");
        let a = package.get_or_create_entry(1, &ResConfig::default(), "app_name");
        let b = package.get_or_create_entry(1, &ResConfig::default(), "title");
        let c = package.get_or_create_entry(1, &land(), "app_name");
        assert_eq!(a, 0x7f010000);
        assert_eq!(b, 0x7f010001);
        assert_eq!(c, a);

        let view = package.group_view(a).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.spec_name(), Some("app_name"));
        assert_eq!(view.type_name().as_deref(), Some("string"));
    }

    #[test]
    fn remove_entry_unregisters_the_group() {
        let mut package = PackageBlock::new(0x7f, "com.example").unwrap();
        let id = package.get_or_create_entry(2, &land(), "icon");
        assert!(package.remove_entry(id, &land()).is_some());
        assert!(package.entry_group(id).is_none());
        assert!(package.remove_entry(id, &land()).is_none());
    }

    #[test]
    fn rename_spec_only_reports_changes() {
        let mut package = PackageBlock::new(0x7f, "com.example").unwrap();
        let id = package.get_or_create_entry(1, &ResConfig::default(), "old");
        package.get_or_create_entry(1, &land(), "old");
        assert!(!package.rename_spec(id, "old"));
        assert!(package.rename_spec(id, "new"));
        assert_eq!(package.group_view(id).unwrap().spec_name(), Some("new"));
        assert!(!package.rename_spec(0x7f01ffff, "new"));
    }

    #[test]
    fn long_names_are_rejected() {
        let name = "a".repeat(128);
        assert!(matches!(
            PackageBlock::new(1, &name),
            Err(ArscError::PackageName(128))
        ));
    }

    #[test]
    fn merge_remaps_keys_and_strings() {
        let mut pool = StringPool::default();
        let mut other_pool = StringPool::default();
        other_pool.get_or_create("unused");
        let hello = other_pool.get_or_create("hello");

        let mut other = PackageBlock::new(0x7f, "com.example").unwrap();
        other.set_type_name(1, "string");
        let id = other.get_or_create_entry(1, &ResConfig::default(), "greeting");
        other
            .type_block_mut(1, &ResConfig::default())
            .and_then(|block| block.get_entry_mut(id as u16))
            .unwrap()
            .set_value(ResValue::string(hello));

        let mut package = PackageBlock::new(0x7f, "com.example").unwrap();
        package.key_strings_mut().get_or_create("filler");
        package.merge(&other, &mut pool, &other_pool);

        let view = package.group_view(id).unwrap();
        assert_eq!(view.spec_name(), Some("greeting"));
        let value = view.pick_one().unwrap().entry.res_value().copied().unwrap();
        assert_eq!(pool.resolve(value.string_ref().unwrap()), Some("hello"));
        assert_eq!(package.type_name(1), Some("string"));
    }
}
