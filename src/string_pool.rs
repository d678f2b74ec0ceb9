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

use std::{
    collections::HashMap,
    io::{Cursor, Read, Seek, SeekFrom, Write},
};

use crate::{
    align,
    defs::{Chunk, ChunkHeader, ChunkType},
    stream::{
        read_bytes, write_bytes, write_padding, NewResultCtx, Readable, ReadableNoOptions,
        ResultCtx, StreamResult, VecReadable, VecWritable, Writeable, WriteableNoOptions,
    },
};

#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash, PartialOrd, Ord)]
pub struct ResStringPoolRef {
    pub index: u32,
}

impl Readable for ResStringPoolRef {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        Ok(Self {
            index: u32::read_no_opts(reader).add_context(|| "read index for ResStringPoolRef")?,
        })
    }
}

impl Writeable for ResStringPoolRef {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        self.index
            .write_no_opts(writer)
            .add_context(|| "write index for ResStringPoolRef")
    }
}

impl ResStringPoolRef {
    pub const NULL_INDEX: u32 = 0xffffffff;

    pub fn resolve(self, strings: &StringPool) -> Option<&str> {
        strings.resolve(self)
    }

    pub fn null() -> ResStringPoolRef {
        ResStringPoolRef {
            index: Self::NULL_INDEX,
        }
    }

    pub fn is_null(self) -> bool {
        self.index == Self::NULL_INDEX
    }
}

#[derive(Debug, PartialEq, Eq, Default, Copy, Clone)]
pub struct StringPoolFlags {
    pub flags: u32,
}

impl Readable for StringPoolFlags {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        Ok(Self {
            flags: u32::read_no_opts(reader).add_context(|| "read flags for StringPoolFlags")?,
        })
    }
}

impl Writeable for StringPoolFlags {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        self.flags
            .write_no_opts(writer)
            .add_context(|| "write flags for StringPoolFlags")
    }
}

impl StringPoolFlags {
    const SORTED: u32 = 1 << 0;
    const UTF8: u32 = 1 << 8;

    /// If set, the string index is sorted by the string values (based on strcmp16()).
    pub fn sorted(&self) -> bool {
        self.flags & Self::SORTED != 0
    }

    /// String pool is encoded in UTF-8.
    pub fn utf8(&self) -> bool {
        self.flags & Self::UTF8 != 0
    }

    /// Create new StringPoolFlags from separate utf8 and sorted boolean flags.
    pub fn new(sorted: bool, utf8: bool) -> Self {
        Self {
            flags: (sorted as u32) | ((utf8 as u32) << 8),
        }
    }
}

/// This structure defines a span of style information associated with a string in the pool.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct ResStringPoolSpan {
    /// This is the name of the span -- that is, the name of the XML tag that defined it. The
    /// special value END (0xffffffff) indicates the end of an array of spans.
    pub name: ResStringPoolRef,
    /// The first character in the string that this span applies to.
    pub first_char: u32,
    /// The last character in the string that this span applies to.
    pub last_char: u32,
}

impl Readable for ResStringPoolSpan {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        Ok(Self {
            name: ResStringPoolRef::read_no_opts(reader)
                .add_context(|| "read name for ResStringPoolSpan")?,
            first_char: u32::read_no_opts(reader)
                .add_context(|| "read first_char for ResStringPoolSpan")?,
            last_char: u32::read_no_opts(reader)
                .add_context(|| "read last_char for ResStringPoolSpan")?,
        })
    }
}

impl Writeable for ResStringPoolSpan {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        self.name
            .write_no_opts(writer)
            .add_context(|| "write name for ResStringPoolSpan")?;
        self.first_char
            .write_no_opts(writer)
            .add_context(|| "write first_char for ResStringPoolSpan")?;
        self.last_char
            .write_no_opts(writer)
            .add_context(|| "write last_char for ResStringPoolSpan")
    }
}

impl ResStringPoolSpan {
    pub const SIZE: usize = 4 + 4 + 4;
}

/// Offsets and sizes derived from the pool contents by [`StringPool::refresh`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PoolLayout {
    strings_start: u32,
    styles_start: u32,
    string_offsets: Vec<u32>,
    style_offsets: Vec<u32>,
    /// Encoded strings, padded to 4 bytes.
    strings_size: u32,
    /// Encoded span arrays plus the trailing END markers.
    styles_size: u32,
}

/// A set of strings that can be referenced by others through a [`ResStringPoolRef`].
///
/// Definition for a pool of strings. The data of this chunk is an array of u32 providing indices
/// into the pool, relative to stringsStart. At stringsStart are all of the UTF-8 or UTF-16 strings
/// concatenated together.
///
/// If styleCount is not zero, then immediately following the array of u32 indices into the string
/// table is another array of indices into a style table starting at stylesStart. Each entry in the
/// style table is an array of [`ResStringPoolSpan`] structures terminated by `0xffffffff`. Style
/// `i` belongs to string `i`.
///
/// A pool that was read and never modified is written back from its original bytes.
#[derive(Debug, Clone)]
pub struct StringPool {
    header: ChunkHeader,
    flags: StringPoolFlags,
    strings: Vec<String>,
    styles: Vec<Vec<ResStringPoolSpan>>,
    lookup: HashMap<String, u32>,
    layout: PoolLayout,
    raw: Option<Vec<u8>>,
}

impl PartialEq for StringPool {
    fn eq(&self, other: &Self) -> bool {
        self.flags == other.flags && self.strings == other.strings && self.styles == other.styles
    }
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StringPool {
    pub const HEADER_SIZE: u16 = 28;
    const STYLE_END: u32 = 0xffffffff;

    pub fn new(utf8: bool) -> Self {
        let mut pool = Self {
            header: ChunkHeader::new(ChunkType::StringPool, Self::HEADER_SIZE),
            flags: StringPoolFlags::new(false, utf8),
            strings: Vec::new(),
            styles: Vec::new(),
            lookup: HashMap::new(),
            layout: PoolLayout::default(),
            raw: None,
        };
        pool.refresh();
        pool
    }

    pub fn flags(&self) -> StringPoolFlags {
        self.flags
    }

    pub fn is_utf8(&self) -> bool {
        self.flags.utf8()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn style_count(&self) -> usize {
        self.styles.len()
    }

    /// True while the pool still matches the bytes it was read from.
    pub fn is_pristine(&self) -> bool {
        self.raw.is_some()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn resolve(&self, reference: ResStringPoolRef) -> Option<&str> {
        if reference.is_null() {
            return None;
        }
        self.get(reference.index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.strings.iter().map(String::as_str)
    }

    /// Span array of the string at `index`; empty for unstyled strings.
    pub fn styles(&self, index: usize) -> &[ResStringPoolSpan] {
        self.styles.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn index_of(&self, string: &str) -> Option<ResStringPoolRef> {
        self.lookup
            .get(string)
            .map(|index| ResStringPoolRef { index: *index })
    }

    /// Returns the index of `string`, appending it first when the pool does not hold it yet.
    pub fn get_or_create(&mut self, string: &str) -> ResStringPoolRef {
        match self.index_of(string) {
            Some(reference) => reference,
            None => self.push(string.to_string()),
        }
    }

    /// Appends `string` even when an equal string already exists.
    pub fn push(&mut self, string: String) -> ResStringPoolRef {
        self.mark_modified();
        let index = self.strings.len() as u32;
        self.lookup.entry(string.clone()).or_insert(index);
        self.strings.push(string);
        ResStringPoolRef { index }
    }

    /// Appends a styled string. Style slots of the strings before it are filled with empty span
    /// arrays, since style `i` always belongs to string `i`.
    pub fn push_styled(&mut self, string: String, spans: Vec<ResStringPoolSpan>) -> ResStringPoolRef {
        let reference = self.push(string);
        self.styles.resize(reference.index as usize, Vec::new());
        self.styles.push(spans);
        reference
    }

    /// Replaces the string at `index`, growing the pool with empty strings when needed.
    pub fn set(&mut self, index: usize, string: String) {
        if self.strings.get(index) == Some(&string) {
            return;
        }
        self.mark_modified();
        if index >= self.strings.len() {
            self.strings.resize(index + 1, String::new());
        }
        self.strings[index] = string;
        self.rebuild_lookup();
    }

    /// Copies every string of `other` that this pool lacks, styled strings keeping their spans.
    pub fn merge(&mut self, other: &StringPool) {
        for index in 0..other.len() {
            self.import(other, index);
        }
    }

    /// Copies string `index` of `other` into this pool and returns where it landed. Plain strings
    /// are deduplicated; styled strings are reused only when an equal string carries the same
    /// spans, with span tags re-pointed at this pool.
    pub fn import(&mut self, other: &StringPool, index: usize) -> Option<ResStringPoolRef> {
        let string = other.get(index)?;
        let spans = other.styles(index);
        if spans.is_empty() {
            return Some(self.get_or_create(string));
        }
        let spans: Vec<ResStringPoolSpan> = spans
            .iter()
            .map(|span| ResStringPoolSpan {
                name: match other.resolve(span.name) {
                    Some(tag) => self.get_or_create(tag),
                    None => span.name,
                },
                ..*span
            })
            .collect();
        if let Some(existing) = self.index_of(string) {
            if self.styles(existing.index as usize) == spans.as_slice() {
                return Some(existing);
            }
        }
        Some(self.push_styled(string.to_string(), spans))
    }

    fn mark_modified(&mut self) {
        if self.raw.take().is_some() {
            // appended strings would break the ordering
            self.flags = StringPoolFlags::new(false, self.flags.utf8());
        }
    }

    fn rebuild_lookup(&mut self) {
        self.lookup.clear();
        for (i, string) in self.strings.iter().enumerate() {
            self.lookup.entry(string.clone()).or_insert(i as u32);
        }
    }

    fn encoded_len(&self, string: &str) -> usize {
        match self.flags.utf8() {
            true => {
                let units = string.encode_utf16().count();
                let bytes = string.len();
                length8_size(units) + length8_size(bytes) + bytes + 1
            }
            false => {
                let units = string.encode_utf16().count();
                (length16_size(units) + units + 1) * 2
            }
        }
    }

    fn compute_layout(&self) -> PoolLayout {
        let mut string_offsets = Vec::with_capacity(self.strings.len());
        let mut current = 0u32;
        for string in &self.strings {
            string_offsets.push(current);
            current += self.encoded_len(string) as u32;
        }
        let strings_size = align(current as u64, 4) as u32;

        let mut style_offsets = Vec::with_capacity(self.styles.len());
        let mut current = 0u32;
        for spans in &self.styles {
            style_offsets.push(current);
            current += (spans.len() * ResStringPoolSpan::SIZE + 4) as u32;
        }
        let styles_size = if self.styles.is_empty() {
            0
        } else {
            current + 8
        };

        let strings_start = Self::HEADER_SIZE as u32
            + 4 * self.strings.len() as u32
            + 4 * self.styles.len() as u32;
        let styles_start = if self.styles.is_empty() {
            0
        } else {
            strings_start + strings_size
        };

        PoolLayout {
            strings_start,
            styles_start,
            string_offsets,
            style_offsets,
            strings_size,
            styles_size,
        }
    }
}

impl Chunk for StringPool {
    fn header(&self) -> &ChunkHeader {
        &self.header
    }

    fn refresh(&mut self) {
        if self.raw.is_some() {
            return;
        }
        self.layout = self.compute_layout();
        self.header.header_size = Self::HEADER_SIZE;
        self.header.size = self.layout.strings_start + self.layout.strings_size + self.layout.styles_size;
    }

    fn write_chunk<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<u64> {
        if let Some(raw) = &self.raw {
            write_bytes(writer, raw).add_context(|| "write original bytes for StringPool")?;
            return Ok(raw.len() as u64);
        }
        let layout = &self.layout;

        self.header
            .write_no_opts(writer)
            .add_context(|| "write header for StringPool")?;
        (self.strings.len() as u32)
            .write_no_opts(writer)
            .add_context(|| "write string_count for StringPool")?;
        (self.styles.len() as u32)
            .write_no_opts(writer)
            .add_context(|| "write style_count for StringPool")?;
        self.flags
            .write_no_opts(writer)
            .add_context(|| "write flags for StringPool")?;
        layout
            .strings_start
            .write_no_opts(writer)
            .add_context(|| "write strings_start for StringPool")?;
        layout
            .styles_start
            .write_no_opts(writer)
            .add_context(|| "write styles_start for StringPool")?;
        layout
            .string_offsets
            .write_vec(writer)
            .add_context(|| "write string_indicies for StringPool")?;
        layout
            .style_offsets
            .write_vec(writer)
            .add_context(|| "write style_indicies for StringPool")?;

        let mut written = 0usize;
        for string in &self.strings {
            written += match self.flags.utf8() {
                true => write_string8(writer, string),
                false => write_string16(writer, string),
            }
            .add_context(|| "write strings for StringPool")?;
        }
        write_padding(writer, layout.strings_size as usize - written)
            .add_context(|| "write string padding for StringPool")?;

        if !self.styles.is_empty() {
            for spans in &self.styles {
                spans
                    .write_vec(writer)
                    .add_context(|| "write spans for StringPool")?;
                Self::STYLE_END
                    .write_no_opts(writer)
                    .add_context(|| "write span end for StringPool")?;
            }
            [Self::STYLE_END, Self::STYLE_END]
                .write_vec(writer)
                .add_context(|| "write style terminator for StringPool")?;
        }

        Ok(self.header.size as u64)
    }
}

impl Readable for StringPool {
    type Args = ChunkHeader;
    fn read<R: Read + Seek>(reader: &mut R, header: Self::Args) -> StreamResult<Self> {
        let header_offset = ChunkHeader::get_header_offset(reader.stream_position()?);
        reader
            .seek(SeekFrom::Start(header_offset))
            .stream_context(|| "seek to header for StringPool")?;
        let raw = read_bytes(reader, header.size as usize)
            .add_context(|| "read chunk bytes for StringPool")?;

        let mut pool = parse_pool(&raw, header).add_context(|| "parse StringPool")?;
        pool.raw = Some(raw);
        Ok(pool)
    }
}

fn parse_pool(raw: &[u8], header: ChunkHeader) -> StreamResult<StringPool> {
    let mut reader = Cursor::new(raw);
    reader.seek(SeekFrom::Start(ChunkHeader::SIZE as u64))?;

    let string_count =
        u32::read_no_opts(&mut reader).add_context(|| "read string_count for StringPool")?;
    let style_count =
        u32::read_no_opts(&mut reader).add_context(|| "read style_count for StringPool")?;
    let flags =
        StringPoolFlags::read_no_opts(&mut reader).add_context(|| "read flags for StringPool")?;
    let strings_start =
        u32::read_no_opts(&mut reader).add_context(|| "read strings_start for StringPool")?;
    let styles_start =
        u32::read_no_opts(&mut reader).add_context(|| "read styles_start for StringPool")?;

    reader.seek(SeekFrom::Start(header.header_size as u64))?;
    let string_offsets = <Vec<u32>>::read_vec(&mut reader, string_count as usize)
        .add_context(|| "read string_indicies for StringPool")?;
    let style_offsets = <Vec<u32>>::read_vec(&mut reader, style_count as usize)
        .add_context(|| "read style_indicies for StringPool")?;

    let mut strings = Vec::with_capacity(string_offsets.len());
    for offset in string_offsets {
        let pos = strings_start as u64 + offset as u64;
        reader
            .seek(SeekFrom::Start(pos))
            .stream_context(|| format!("seek to string at {pos} for StringPool"))?;
        strings.push(match flags.utf8() {
            true => read_string8(&mut reader),
            false => read_string16(&mut reader),
        }?);
    }

    let mut styles = Vec::with_capacity(style_offsets.len());
    for offset in style_offsets {
        let pos = styles_start as u64 + offset as u64;
        reader
            .seek(SeekFrom::Start(pos))
            .stream_context(|| format!("seek to style at {pos} for StringPool"))?;
        let mut spans = Vec::new();
        loop {
            let name = ResStringPoolRef::read_no_opts(&mut reader)
                .add_context(|| "read span name for StringPool")?;
            if name.index == StringPool::STYLE_END {
                break;
            }
            let first_char = u32::read_no_opts(&mut reader)?;
            let last_char = u32::read_no_opts(&mut reader)?;
            spans.push(ResStringPoolSpan {
                name,
                first_char,
                last_char,
            });
        }
        styles.push(spans);
    }

    let mut pool = StringPool {
        header,
        flags,
        strings,
        styles,
        lookup: HashMap::new(),
        layout: PoolLayout::default(),
        raw: None,
    };
    pool.rebuild_lookup();
    Ok(pool)
}

fn length8_size(length: usize) -> usize {
    if length > 0x7f {
        2
    } else {
        1
    }
}

fn length16_size(length: usize) -> usize {
    if length > 0x7fff {
        2
    } else {
        1
    }
}

pub fn calc_length8(length: usize) -> (u8, Option<u8>) {
    match length > 0x7f {
        true => (((length >> 8) | 0x80) as u8, Some((length & 0xff) as u8)),
        false => (length as u8, None),
    }
}

pub fn new_length8(l1: u8, l2: Option<u8>) -> u32 {
    match l2 {
        None => l1 as u32,
        Some(le2) => (((l1 as u32) & 0x7f) << 8) | (le2 as u32),
    }
}

pub fn calc_length16(length: usize) -> (u16, Option<u16>) {
    match length > 0x7fff {
        true => (((length >> 16) | 0x8000) as u16, Some((length & 0xffff) as u16)),
        false => (length as u16, None),
    }
}

pub fn new_length16(l1: u16, l2: Option<u16>) -> u32 {
    match l2 {
        None => l1 as u32,
        Some(le2) => (((l1 as u32) & 0x7fff) << 16) | (le2 as u32),
    }
}

fn read_length8<R: Read + Seek>(reader: &mut R) -> StreamResult<u32> {
    let l1 = u8::read_no_opts(reader)?;
    let l2 = if l1 & 0x80 != 0 {
        Some(u8::read_no_opts(reader)?)
    } else {
        None
    };
    Ok(new_length8(l1, l2))
}

fn write_length8<W: Write + Seek>(writer: &mut W, length: usize) -> StreamResult<()> {
    let (l1, l2) = calc_length8(length);
    l1.write_no_opts(writer)?;
    if let Some(l2) = l2 {
        l2.write_no_opts(writer)?;
    }
    Ok(())
}

/// Strings in UTF-8 format have their length indicated by a length encoded in the stored data. It
/// is either 1 or 2 characters of length data. This allows a maximum length of 0x7fff (32767 bytes).
/// The first length counts UTF-16 units, the second counts bytes.
pub fn read_string8<R: Read + Seek>(reader: &mut R) -> StreamResult<String> {
    let _units = read_length8(reader).add_context(|| "read utf16 length for utf8 string")?;
    let bytes = read_length8(reader).add_context(|| "read byte length for utf8 string")?;
    let data = read_bytes(reader, bytes as usize).add_context(|| "read utf8 string data")?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

pub fn write_string8<W: Write + Seek>(writer: &mut W, string: &str) -> StreamResult<usize> {
    let units = string.encode_utf16().count();
    write_length8(writer, units).add_context(|| "write utf16 length for utf8 string")?;
    write_length8(writer, string.len()).add_context(|| "write byte length for utf8 string")?;
    write_bytes(writer, string.as_bytes()).add_context(|| "write utf8 string data")?;
    0u8.write_no_opts(writer)
        .add_context(|| "write null byte for utf8 string")?;
    Ok(length8_size(units) + length8_size(string.len()) + string.len() + 1)
}

/// Strings in UTF-16 format have length indicated by a length encoded in the stored data. It is
/// either 1 or 2 characters of length data. This allows a maximum length of 0x7fffffff (2147483647
/// bytes).
pub fn read_string16<R: Read + Seek>(reader: &mut R) -> StreamResult<String> {
    let l1 = u16::read_no_opts(reader).add_context(|| "read length1 for utf16 string")?;
    let l2 = if l1 & 0x8000 != 0 {
        Some(u16::read_no_opts(reader).add_context(|| "read length2 for utf16 string")?)
    } else {
        None
    };
    let data = <Vec<u16>>::read_vec(reader, new_length16(l1, l2) as usize)
        .add_context(|| "read utf16 string data")?;
    Ok(String::from_utf16_lossy(&data))
}

pub fn write_string16<W: Write + Seek>(writer: &mut W, string: &str) -> StreamResult<usize> {
    let data: Vec<u16> = string.encode_utf16().collect();
    let (l1, l2) = calc_length16(data.len());
    l1.write_no_opts(writer)
        .add_context(|| "write length1 for utf16 string")?;
    if let Some(l2) = l2 {
        l2.write_no_opts(writer)
            .add_context(|| "write length2 for utf16 string")?;
    }
    data.write_vec(writer)
        .add_context(|| "write utf16 string data")?;
    0u16.write_no_opts(writer)
        .add_context(|| "write null for utf16 string")?;
    Ok((length16_size(data.len()) + data.len() + 1) * 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reparse(pool: &mut StringPool) -> StringPool {
        pool.refresh();
        let bytes = crate::stream::to_vec(|w| pool.write_chunk(w).map(|_| ())).unwrap();
        assert_eq!(bytes.len(), pool.header().size as usize);
        let mut reader = Cursor::new(bytes);
        let header = ChunkHeader::read_no_opts(&mut reader).unwrap();
        StringPool::read(&mut reader, header).unwrap()
    }

    #[test]
    fn get_or_create_deduplicates() {
        let mut pool = StringPool::new(true);
        let a = pool.get_or_create("app_name");
        let b = pool.get_or_create("title");
        assert_eq!(pool.get_or_create("app_name"), a);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn utf16_pool_survives_write() {
        let mut pool = StringPool::new(false);
        pool.get_or_create("héllo");
        pool.get_or_create("\u{1F600} smile");
        let copy = reparse(&mut pool);
        assert_eq!(copy, pool);
        assert!(!copy.is_utf8());
    }

    #[test]
    fn styles_keep_their_string() {
        let mut pool = StringPool::new(true);
        let bold = pool.get_or_create("b");
        pool.push_styled(
            "<b>hi</b>".to_string(),
            vec![ResStringPoolSpan {
                name: bold,
                first_char: 0,
                last_char: 1,
            }],
        );
        let copy = reparse(&mut pool);
        assert_eq!(copy.style_count(), 2);
        assert!(copy.styles(0).is_empty());
        assert_eq!(copy.styles(1)[0].name, bold);
    }

    #[test]
    fn long_utf8_string_uses_two_length_bytes() {
        let long = "x".repeat(300);
        let mut pool = StringPool::new(true);
        pool.get_or_create(&long);
        let copy = reparse(&mut pool);
        assert_eq!(copy.get(0), Some(long.as_str()));
    }

    #[test]
    fn unmodified_pool_is_written_verbatim() {
        let mut pool = StringPool::new(true);
        pool.get_or_create("one");
        let mut copy = reparse(&mut pool);
        assert!(copy.is_pristine());
        copy.get_or_create("one");
        assert!(copy.is_pristine());
        copy.get_or_create("two");
        assert!(!copy.is_pristine());
    }
}
