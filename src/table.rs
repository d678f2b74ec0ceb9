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

// Everything here is based off of https://android.googlesource.com/platform/frameworks/base/+/master/libs/androidfw/include/androidfw/ResourceTypes.h

use std::{
    cell::RefCell,
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write},
    path::Path,
    rc::Rc,
};

use tracing::{debug, trace, warn};

use crate::{
    config::ResConfig,
    defs::{Chunk, ChunkHeader, ChunkType, UnknownChunk},
    entry::Entry,
    error::{ArscError, Result},
    framework::FrameworkConfig,
    group::GroupView,
    package::PackageBlock,
    package_array::PackageArray,
    stream::{
        peek_chunk_header, read_bytes, remaining, write_bytes, NewResultCtx, Readable,
        ReadableNoOptions, ResultCtx, StreamResult, WriteableNoOptions,
    },
    string_pool::StringPool,
};

/// A table attached to another as a framework. Frameworks are shared, never owned.
pub type SharedTable = Rc<RefCell<TableBlock>>;

/// The root chunk of a resources.arsc file.
///
/// Holds the global value string pool, the packages and any chunks this library does not model.
/// Unknown chunks remember how many packages preceded them so they are written back in place.
#[derive(Debug, Clone)]
pub struct TableBlock {
    header: ChunkHeader,
    header_extra: Vec<u8>,
    string_pool: StringPool,
    packages: PackageArray,
    unknown_chunks: Vec<(usize, UnknownChunk)>,
    frameworks: Vec<SharedTable>,
}

impl PartialEq for TableBlock {
    fn eq(&self, other: &Self) -> bool {
        self.string_pool == other.string_pool
            && self.packages == other.packages
            && self.unknown_chunks == other.unknown_chunks
    }
}

impl Default for TableBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// An owned copy of a resolved resource, detached from the table it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroup {
    pub resource_id: u32,
    pub package_id: u8,
    pub package_name: String,
    pub type_name: Option<String>,
    pub spec_name: Option<String>,
    pub entries: Vec<(ResConfig, Entry)>,
}

impl ResolvedGroup {
    fn from_view(view: GroupView<'_>) -> Self {
        Self {
            resource_id: view.resource_id(),
            package_id: view.package().id(),
            package_name: view.package().name().to_string(),
            type_name: view.type_name(),
            spec_name: view.spec_name().map(str::to_string),
            entries: view
                .iter()
                .map(|entry| (entry.type_block.config().clone(), entry.entry.clone()))
                .collect(),
        }
    }

    /// The entry of the default configuration, else the first one.
    pub fn pick_one(&self) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|(config, _)| config.is_default())
            .or_else(|| self.entries.first())
            .map(|(_, entry)| entry)
    }
}

impl TableBlock {
    pub const HEADER_SIZE: u16 = ChunkHeader::SIZE + 4;

    pub fn new() -> Self {
        let mut table = Self {
            header: ChunkHeader::new(ChunkType::Table, Self::HEADER_SIZE),
            header_extra: Vec::new(),
            string_pool: StringPool::new(true),
            packages: PackageArray::default(),
            unknown_chunks: Vec::new(),
            frameworks: Vec::new(),
        };
        table.refresh();
        table
    }

    pub fn string_pool(&self) -> &StringPool {
        &self.string_pool
    }

    pub fn string_pool_mut(&mut self) -> &mut StringPool {
        &mut self.string_pool
    }

    pub fn packages(&self) -> &PackageArray {
        &self.packages
    }

    pub fn packages_mut(&mut self) -> &mut PackageArray {
        &mut self.packages
    }

    pub fn package_by_id(&self, id: u8) -> Option<&PackageBlock> {
        self.packages.get_by_id(id)
    }

    pub fn package_by_id_mut(&mut self, id: u8) -> Option<&mut PackageBlock> {
        self.packages.get_by_id_mut(id)
    }

    pub fn unknown_chunks(&self) -> impl Iterator<Item = &UnknownChunk> + '_ {
        self.unknown_chunks.iter().map(|(_, chunk)| chunk)
    }

    /// The main package: the only one, or the one with the most entries.
    pub fn pick_one(&self) -> Option<&PackageBlock> {
        self.packages.pick_one()
    }

    pub fn sort_packages(&mut self) {
        self.packages.sort();
    }

    /// True when there is nothing to write.
    pub fn is_null(&self) -> bool {
        self.packages.is_empty() && self.string_pool.is_empty() && self.unknown_chunks.is_empty()
    }

    /// Renames the spec of `resource_id` in its package. Returns whether anything changed.
    pub fn rename_spec(&mut self, resource_id: u32, name: &str) -> bool {
        match self.packages.get_by_id_mut((resource_id >> 24) as u8) {
            Some(package) => package.rename_spec(resource_id, name),
            None => false,
        }
    }

    /// The finalized id a package declares for the staged id `resource_id`, or 0.
    pub fn search_resource_id_alias(&self, resource_id: u32) -> u32 {
        self.packages
            .iter()
            .find_map(|package| package.search_by_staged_res_id(resource_id))
            .map_or(0, |alias| alias.finalized_res_id)
    }

    /// Looks `resource_id` up in this table only: by id in each package, then by its staged
    /// alias.
    pub fn search_local(&self, resource_id: u32) -> Option<GroupView<'_>> {
        if resource_id == 0 {
            return None;
        }
        let alias_id = self.search_resource_id_alias(resource_id);
        self.packages.iter().find_map(|package| {
            package.group_view(resource_id).or_else(|| match alias_id {
                0 => None,
                alias => package.group_view(alias),
            })
        })
    }

    /// True when `resource_id` resolves here or in an attached framework.
    pub fn contains(&self, resource_id: u32) -> bool {
        if resource_id == 0 {
            return false;
        }
        self.search_local(resource_id).is_some()
            || self.frameworks.iter().any(|framework| {
                framework
                    .try_borrow()
                    .is_ok_and(|framework| framework.contains(resource_id))
            })
    }

    /// Resolves `resource_id` and hands the group to `f`. Local packages are searched first, then
    /// the attached frameworks in attachment order.
    pub fn search_with<T, F>(&self, resource_id: u32, f: F) -> Option<T>
    where
        F: FnOnce(GroupView<'_>) -> T,
    {
        if resource_id == 0 {
            return None;
        }
        if let Some(view) = self.search_local(resource_id) {
            return Some(f(view));
        }
        for framework in &self.frameworks {
            let Ok(framework) = framework.try_borrow() else {
                continue;
            };
            if framework.contains(resource_id) {
                return framework.search_with(resource_id, f);
            }
        }
        None
    }

    pub fn search(&self, resource_id: u32) -> Option<ResolvedGroup> {
        self.search_with(resource_id, ResolvedGroup::from_view)
    }

    pub fn frameworks(&self) -> &[SharedTable] {
        &self.frameworks
    }

    /// Attaches `framework` for fallback lookups. Attaching this table itself, a table that is
    /// already attached, or a table whose frameworks lead back here is refused.
    pub fn add_framework(&mut self, framework: SharedTable) -> bool {
        let this = self as *const TableBlock;
        if std::ptr::eq(framework.as_ptr(), this) {
            warn!("refusing to attach a table as its own framework");
            return false;
        }
        if self
            .frameworks
            .iter()
            .any(|existing| Rc::ptr_eq(existing, &framework))
        {
            warn!("framework is already attached");
            return false;
        }
        if reaches(&framework, this) {
            warn!("refusing to attach a framework that depends on this table");
            return false;
        }
        self.frameworks.push(framework);
        true
    }

    pub fn remove_framework(&mut self, framework: &SharedTable) -> bool {
        let before = self.frameworks.len();
        self.frameworks
            .retain(|existing| !Rc::ptr_eq(existing, framework));
        before != self.frameworks.len()
    }

    /// Merges `other` into this table.
    ///
    /// An empty table first takes over `other`'s string pool so that string indices line up.
    pub fn merge(&mut self, other: &TableBlock) -> Result<()> {
        if self.packages.is_empty() && self.string_pool.is_empty() {
            self.string_pool.merge(&other.string_pool);
        }
        self.packages
            .merge(&other.packages, &mut self.string_pool, &other.string_pool)?;
        self.refresh();
        debug!(
            packages = self.packages.len(),
            strings = self.string_pool.len(),
            "merged table"
        );
        Ok(())
    }

    /// Reads a table from a seekable stream positioned at its header.
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let header = ChunkHeader::read_no_opts(reader).add_context(|| "read header for TableBlock")?;
        if header.chunk_type != ChunkType::Table {
            return Err(ArscError::UnexpectedChunk {
                expected: ChunkType::Table,
                found: header.chunk_type,
            });
        }
        Ok(Self::read(reader, header)?)
    }

    /// Reads a table from any reader by buffering it first.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::try_from(data.as_slice())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let table = Self::read_from(&mut reader)?;
        debug!(path = %path.display(), packages = table.packages.len(), "loaded table");
        Ok(table)
    }

    /// Reads a table and attaches the android framework named by `config`, when there is one.
    pub fn load_with_android_framework<R: Read + Seek>(
        reader: &mut R,
        config: &FrameworkConfig,
    ) -> Result<Self> {
        let mut table = Self::read_from(reader)?;
        if let Some(framework) = config.load()? {
            table.add_framework(framework);
        }
        Ok(table)
    }

    /// Refreshes and writes the table. Returns the number of bytes written.
    pub fn write_to<W: Write + Seek>(&mut self, writer: &mut W) -> Result<u64> {
        self.refresh();
        if self.is_null() {
            return Err(ArscError::NullTable);
        }
        Ok(self.write_chunk(writer)?)
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Writes the table to `path`, creating missing parent directories.
    pub fn write_file<P: AsRef<Path>>(&mut self, path: P) -> Result<u64> {
        let path = path.as_ref();
        self.refresh();
        if self.is_null() {
            return Err(ArscError::NullTable);
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        let written = self.write_chunk(&mut writer)?;
        writer.flush()?;
        debug!(path = %path.display(), bytes = written, "wrote table");
        Ok(written)
    }

    /// True when `header` is tagged as a resource table.
    pub fn is_res_table_header(header: &ChunkHeader) -> bool {
        header.chunk_type == ChunkType::Table
    }

    /// Checks the first bytes of `reader`. Read failures count as "no".
    pub fn is_res_table_reader<R: Read>(mut reader: R) -> bool {
        let mut bytes = [0u8; ChunkHeader::SIZE as usize];
        if reader.read_exact(&mut bytes).is_err() {
            return false;
        }
        ChunkHeader::read_no_opts(&mut Cursor::new(bytes))
            .is_ok_and(|header| Self::is_res_table_header(&header))
    }

    /// Like [`TableBlock::is_res_table_reader`], leaving the stream where it was.
    pub fn is_res_table_stream<R: Read + Seek>(reader: &mut R) -> bool {
        peek_chunk_header(reader).is_ok_and(|header| Self::is_res_table_header(&header))
    }

    pub fn is_res_table_file<P: AsRef<Path>>(path: P) -> bool {
        File::open(path).is_ok_and(Self::is_res_table_reader)
    }
}

/// Depth first walk of the framework graph under `start`, looking for `target`. A table that
/// cannot be borrowed is being edited right now, which can only be `target` itself.
fn reaches(start: &SharedTable, target: *const TableBlock) -> bool {
    let mut stack = vec![start.clone()];
    let mut seen: Vec<*const TableBlock> = Vec::new();
    while let Some(table) = stack.pop() {
        let ptr = table.as_ptr() as *const TableBlock;
        if std::ptr::eq(ptr, target) {
            return true;
        }
        if seen.contains(&ptr) {
            continue;
        }
        seen.push(ptr);
        let Ok(table) = table.try_borrow() else {
            return true;
        };
        stack.extend(table.frameworks.iter().cloned());
    }
    false
}

impl Chunk for TableBlock {
    fn header(&self) -> &ChunkHeader {
        &self.header
    }

    fn refresh(&mut self) {
        self.string_pool.refresh();
        self.packages.refresh();
        for (_, chunk) in &mut self.unknown_chunks {
            chunk.refresh();
        }
        self.header.header_size = Self::HEADER_SIZE + self.header_extra.len() as u16;
        self.header.size = self.header.header_size as u32
            + self.string_pool.chunk_size()
            + self.packages.size()
            + self
                .unknown_chunks
                .iter()
                .map(|(_, chunk)| chunk.chunk_size())
                .sum::<u32>();
    }

    fn write_chunk<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<u64> {
        self.header
            .write_no_opts(writer)
            .add_context(|| "write header for TableBlock")?;
        (self.packages.len() as u32)
            .write_no_opts(writer)
            .add_context(|| "write package_count for TableBlock")?;
        write_bytes(writer, &self.header_extra)
            .add_context(|| "write extra header for TableBlock")?;
        self.string_pool
            .write_chunk(writer)
            .add_context(|| "write string_pool for TableBlock")?;

        let mut unknown = self.unknown_chunks.iter().peekable();
        for index in 0..=self.packages.len() {
            while let Some((_, chunk)) = unknown.next_if(|(position, _)| *position <= index) {
                chunk
                    .write_chunk(writer)
                    .add_context(|| "write unknown chunk for TableBlock")?;
            }
            if let Some(package) = self.packages.get(index) {
                package
                    .write_chunk(writer)
                    .add_context(|| format!("write package {index} for TableBlock"))?;
            }
        }
        for (_, chunk) in unknown {
            chunk
                .write_chunk(writer)
                .add_context(|| "write unknown chunk for TableBlock")?;
        }
        Ok(self.header.size as u64)
    }
}

impl Readable for TableBlock {
    type Args = ChunkHeader;
    fn read<R: Read + Seek>(reader: &mut R, header: Self::Args) -> StreamResult<Self> {
        let header_offset = ChunkHeader::get_header_offset(reader.stream_position()?);
        let package_count =
            u32::read_no_opts(reader).add_context(|| "read package_count for TableBlock")?;
        let header_extra = read_bytes(
            reader,
            (header.header_size as usize).saturating_sub(Self::HEADER_SIZE as usize),
        )
        .add_context(|| "read extra header for TableBlock")?;
        if !header_extra.is_empty() {
            warn!(bytes = header_extra.len(), "table header carries extra bytes");
        }

        let mut table = Self {
            header,
            header_extra,
            string_pool: StringPool::new(true),
            packages: PackageArray::default(),
            unknown_chunks: Vec::new(),
            frameworks: Vec::new(),
        };

        let mut have_string_pool = false;
        let mut pos = header_offset + header.header_size as u64;
        reader
            .seek(SeekFrom::Start(pos))
            .stream_context(|| "seek to children of TableBlock")?;
        let end = pos + remaining(reader)?;
        while pos + ChunkHeader::SIZE as u64 <= end {
            let child = ChunkHeader::read_no_opts(reader)
                .add_context(|| "read child header for TableBlock")?;
            child.validate(pos)?;
            trace!(chunk = %child.chunk_type, offset = pos, size = child.size, "table child");

            match child.chunk_type {
                ChunkType::StringPool if !have_string_pool => {
                    table.string_pool = StringPool::read(reader, child)
                        .add_context(|| "read string_pool for TableBlock")?;
                    have_string_pool = true;
                }
                ChunkType::TablePackage => {
                    let package = PackageBlock::read(reader, child)
                        .add_context(|| "read package for TableBlock")?;
                    table.packages.push(package);
                }
                other => {
                    if other == ChunkType::StringPool {
                        warn!(offset = pos, "extra string pool in table kept as is");
                    }
                    let chunk = UnknownChunk::read(reader, child)
                        .add_context(|| "read unknown chunk for TableBlock")?;
                    table.unknown_chunks.push((table.packages.len(), chunk));
                }
            }
            pos += child.size as u64;
            reader
                .seek(SeekFrom::Start(pos))
                .stream_context(|| "seek to next child of TableBlock")?;
        }

        if table.packages.len() != package_count as usize {
            warn!(
                declared = package_count,
                found = table.packages.len(),
                "package count does not match the header"
            );
        }
        debug!(
            packages = table.packages.len(),
            strings = table.string_pool.len(),
            unknown = table.unknown_chunks.len(),
            "read table"
        );
        Ok(table)
    }
}

impl TryFrom<&[u8]> for TableBlock {
    type Error = ArscError;
    fn try_from(value: &[u8]) -> Result<Self> {
        let mut stream = Cursor::new(value);
        Self::read_from(&mut stream)
    }
}

#[cfg(test)]
mod tests {
    use crate::res_value::ResValue;

    use super::*;

    fn table_with(id: u8, entry: &str) -> TableBlock {
        let mut table = TableBlock::new();
        let package = table.packages_mut().push(PackageBlock::new(id, "pkg").unwrap());
        package.set_type_name(1, "string");
        let resource_id = package.get_or_create_entry(1, &ResConfig::default(), entry);
        package
            .type_block_mut(1, &ResConfig::default())
            .and_then(|block| block.get_entry_mut(resource_id as u16))
            .unwrap()
            .set_value(ResValue::int(1));
        table
    }

    #[test]
    fn root_must_be_a_table() {
        let bytes = b"\x01\x00\x1c\x00\x1c\x00\x00\x00".to_vec();
        assert!(matches!(
            TableBlock::try_from(bytes.as_slice()),
            Err(ArscError::UnexpectedChunk {
                found: ChunkType::StringPool,
                ..
            })
        ));
    }

    #[test]
    fn null_table_is_not_written() {
        let mut table = TableBlock::new();
        assert!(table.is_null());
        assert!(matches!(table.to_bytes(), Err(ArscError::NullTable)));
    }

    #[test]
    fn unknown_chunks_keep_their_place() {
        let mut table = table_with(0x7f, "a");
        table.unknown_chunks.push((
            0,
            UnknownChunk {
                header: ChunkHeader::new(ChunkType::Unknown(0x0999), 8),
                body: vec![1, 2, 3, 4],
            },
        ));
        let bytes = table.to_bytes().unwrap();
        let copy = TableBlock::try_from(bytes.as_slice()).unwrap();
        assert_eq!(copy.unknown_chunks.len(), 1);
        assert_eq!(copy.unknown_chunks[0].0, 0);
        assert_eq!(copy.unknown_chunks[0].1.body, [1, 2, 3, 4]);
        assert_eq!(copy.clone().to_bytes().unwrap(), bytes);
    }

    #[test]
    fn self_attach_is_refused() {
        let table = Rc::new(RefCell::new(table_with(0x7f, "a")));
        let other = Rc::new(RefCell::new(table_with(0x01, "b")));
        assert!(table.borrow_mut().add_framework(other.clone()));
        assert!(!table.borrow_mut().add_framework(other.clone()));
        assert!(!table.borrow_mut().add_framework(table.clone()));
        assert!(!other.borrow_mut().add_framework(table.clone()));
        assert!(table.borrow_mut().remove_framework(&other));
        assert!(table.borrow().frameworks().is_empty());
    }
}
