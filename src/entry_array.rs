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
    align,
    entry::Entry,
    stream::{
        write_padding, NewResultCtx, Readable, ReadableNoOptions, StreamResult, VecReadable,
        VecWritable, Writeable, WriteableNoOptions,
    },
};

/// How the offset table in front of the entries is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetEncoding {
    /// One u32 per entry id, `0xffffffff` for none.
    Dense,
    /// One u16 per entry id holding offset / 4, `0xffff` for none.
    Dense16,
    /// Only the present entries, as (entry id, offset / 4) u16 pairs sorted by id.
    Sparse,
}

impl OffsetEncoding {
    pub const FLAG_SPARSE: u8 = 0x01;
    pub const FLAG_OFFSET16: u8 = 0x02;

    pub fn from_flags(flags: u8) -> Self {
        if flags & Self::FLAG_SPARSE != 0 {
            Self::Sparse
        } else if flags & Self::FLAG_OFFSET16 != 0 {
            Self::Dense16
        } else {
            Self::Dense
        }
    }

    /// `flags` with the encoding bits replaced by this encoding.
    pub fn apply(self, flags: u8) -> u8 {
        let flags = flags & !(Self::FLAG_SPARSE | Self::FLAG_OFFSET16);
        match self {
            Self::Dense => flags,
            Self::Dense16 => flags | Self::FLAG_OFFSET16,
            Self::Sparse => flags | Self::FLAG_SPARSE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SparseTypeEntry {
    idx: u16,
    /// Offset from entries_start divided by 4.
    offset: u16,
}

impl Readable for SparseTypeEntry {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        Ok(Self {
            idx: u16::read_no_opts(reader).add_context(|| "read idx for SparseTypeEntry")?,
            offset: u16::read_no_opts(reader).add_context(|| "read offset for SparseTypeEntry")?,
        })
    }
}

impl Writeable for SparseTypeEntry {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        self.idx
            .write_no_opts(writer)
            .add_context(|| "write idx for SparseTypeEntry")?;
        self.offset
            .write_no_opts(writer)
            .add_context(|| "write offset for SparseTypeEntry")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntryArrayArgs {
    pub entry_count: u32,
    pub encoding: OffsetEncoding,
    /// Absolute position of the first entry.
    pub entries_start: u64,
}

/// The entry slots of one type chunk, addressed by entry id. `None` is a slot without a value
/// in this configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryArray {
    entries: Vec<Option<Entry>>,
}

impl Readable for EntryArray {
    type Args = EntryArrayArgs;
    /// Expects the reader at the start of the offset table.
    fn read<R: Read + Seek>(reader: &mut R, args: Self::Args) -> StreamResult<Self> {
        let count = args.entry_count as usize;
        let offsets: Vec<(usize, u64)> = match args.encoding {
            OffsetEncoding::Dense => <Vec<u32>>::read_vec(reader, count)
                .add_context(|| "read offsets for EntryArray")?
                .into_iter()
                .enumerate()
                .filter(|(_, offset)| *offset != 0xffffffff)
                .map(|(id, offset)| (id, offset as u64))
                .collect(),
            OffsetEncoding::Dense16 => <Vec<u16>>::read_vec(reader, count)
                .add_context(|| "read 16 bit offsets for EntryArray")?
                .into_iter()
                .enumerate()
                .filter(|(_, offset)| *offset != 0xffff)
                .map(|(id, offset)| (id, offset as u64 * 4))
                .collect(),
            OffsetEncoding::Sparse => <Vec<SparseTypeEntry>>::read_vec(reader, count)
                .add_context(|| "read sparse offsets for EntryArray")?
                .into_iter()
                .map(|sparse| (sparse.idx as usize, sparse.offset as u64 * 4))
                .collect(),
        };

        let slots = match args.encoding {
            OffsetEncoding::Sparse => offsets.iter().map(|(id, _)| id + 1).max().unwrap_or(0),
            _ => count,
        };
        let mut entries = vec![None; slots];
        for (id, offset) in offsets {
            reader.seek(SeekFrom::Start(args.entries_start + offset))?;
            entries[id] = Some(
                Entry::read_no_opts(reader)
                    .add_context(|| format!("read entry {id} for EntryArray"))?,
            );
        }

        Ok(Self { entries })
    }
}

impl EntryArray {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resizes the slot array. Retained slots are untouched; new slots are null.
    pub fn set_count(&mut self, count: usize) {
        self.entries.resize(count, None);
    }

    pub fn get(&self, id: usize) -> Option<&Entry> {
        self.entries.get(id)?.as_ref()
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Entry> {
        self.entries.get_mut(id)?.as_mut()
    }

    /// Stores `entry` at `id`, growing the array when needed, and returns the stored entry.
    pub fn set(&mut self, id: usize, entry: Entry) -> &mut Entry {
        if id >= self.entries.len() {
            self.set_count(id + 1);
        }
        self.entries[id].insert(entry)
    }

    pub fn get_or_insert_with<F: FnOnce() -> Entry>(&mut self, id: usize, create: F) -> &mut Entry {
        if id >= self.entries.len() {
            self.set_count(id + 1);
        }
        self.entries[id].get_or_insert_with(create)
    }

    /// Clears the slot at `id`. Returns the entry that was there.
    pub fn set_null(&mut self, id: usize) -> Option<Entry> {
        self.entries.get_mut(id)?.take()
    }

    pub fn count_non_null(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<&Entry>)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(id, entry)| (id, entry.as_ref()))
    }

    pub fn iter_non_null(&self) -> impl Iterator<Item = (usize, &Entry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(id, entry)| Some((id, entry.as_ref()?)))
    }

    pub fn iter_non_null_mut(&mut self) -> impl Iterator<Item = (usize, &mut Entry)> + '_ {
        self.entries
            .iter_mut()
            .enumerate()
            .filter_map(|(id, entry)| Some((id, entry.as_mut()?)))
    }

    /// Copies every non-null entry of `other` over the slot with the same id. Null slots of
    /// `other` never clear anything here.
    pub fn merge_with<F: FnMut(&Entry) -> Entry>(&mut self, other: &EntryArray, mut convert: F) {
        if other.len() > self.len() {
            self.set_count(other.len());
        }
        for (id, entry) in other.iter_non_null() {
            self.entries[id] = Some(convert(entry));
        }
    }

    fn entry_offsets(&self) -> Vec<Option<usize>> {
        let mut pos = 0;
        self.entries
            .iter()
            .map(|entry| {
                entry.as_ref().map(|entry| {
                    let offset = pos;
                    pos += entry.size();
                    offset
                })
            })
            .collect()
    }

    /// Total size of the encoded entries.
    pub fn entries_size(&self) -> usize {
        self.entries.iter().flatten().map(Entry::size).sum()
    }

    /// `preferred` if every offset fits in it, otherwise the dense 32 bit encoding.
    pub fn fit_encoding(&self, preferred: OffsetEncoding) -> OffsetEncoding {
        match preferred {
            OffsetEncoding::Dense => OffsetEncoding::Dense,
            OffsetEncoding::Dense16 | OffsetEncoding::Sparse => {
                let last = self.entry_offsets().into_iter().flatten().last();
                let fits = last.map_or(true, |offset| offset / 4 < 0xffff)
                    && self.entries.len() <= 0x10000;
                match fits {
                    true => preferred,
                    false => OffsetEncoding::Dense,
                }
            }
        }
    }

    /// Number of offset records written for `encoding`, which is the type chunk's entry count.
    pub fn offset_count(&self, encoding: OffsetEncoding) -> usize {
        match encoding {
            OffsetEncoding::Sparse => self.count_non_null(),
            _ => self.entries.len(),
        }
    }

    /// Size of the offset table including the padding that keeps the entries 4 byte aligned.
    pub fn offsets_size(&self, encoding: OffsetEncoding) -> usize {
        let raw = match encoding {
            OffsetEncoding::Dense | OffsetEncoding::Sparse => 4 * self.offset_count(encoding),
            OffsetEncoding::Dense16 => 2 * self.offset_count(encoding),
        };
        align(raw as u64, 4) as usize
    }

    /// Writes the offset table followed by the entries.
    pub fn write<W: Write + Seek>(&self, writer: &mut W, encoding: OffsetEncoding) -> StreamResult<()> {
        let offsets = self.entry_offsets();
        match encoding {
            OffsetEncoding::Dense => offsets
                .iter()
                .map(|offset| offset.map_or(0xffffffff, |o| o as u32))
                .collect::<Vec<u32>>()
                .write_vec(writer)
                .add_context(|| "write offsets for EntryArray")?,
            OffsetEncoding::Dense16 => {
                offsets
                    .iter()
                    .map(|offset| offset.map_or(0xffff, |o| (o / 4) as u16))
                    .collect::<Vec<u16>>()
                    .write_vec(writer)
                    .add_context(|| "write 16 bit offsets for EntryArray")?;
                if offsets.len() % 2 == 1 {
                    write_padding(writer, 2).add_context(|| "pad offsets for EntryArray")?;
                }
            }
            OffsetEncoding::Sparse => offsets
                .iter()
                .enumerate()
                .filter_map(|(id, offset)| {
                    offset.map(|o| SparseTypeEntry {
                        idx: id as u16,
                        offset: (o / 4) as u16,
                    })
                })
                .collect::<Vec<_>>()
                .write_vec(writer)
                .add_context(|| "write sparse offsets for EntryArray")?,
        }

        for (id, entry) in self.iter_non_null() {
            entry
                .write_no_opts(writer)
                .add_context(|| format!("write entry {id} for EntryArray"))?;
        }
        Ok(())
    }
}
