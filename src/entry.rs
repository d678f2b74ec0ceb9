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
    defs::ResTableRef,
    res_value::{ResValue, ValueType},
    stream::{
        NewResultCtx, Readable, ReadableNoOptions, StreamResult, VecReadable, VecWritable,
        Writeable, WriteableNoOptions,
    },
    string_pool::ResStringPoolRef,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct EntryFlags(pub u16);

impl Readable for EntryFlags {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        Ok(Self(
            u16::read_no_opts(reader).add_context(|| "read flags for EntryFlags")?,
        ))
    }
}

impl Writeable for EntryFlags {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        self.0
            .write_no_opts(writer)
            .add_context(|| "write flags for EntryFlags")
    }
}

impl EntryFlags {
    pub const COMPLEX: u16 = 0x1;
    pub const PUBLIC: u16 = 0x2;
    pub const WEAK: u16 = 0x4;
    pub const COMPACT: u16 = 0x8;

    /// If set, this is a compex entry, holding a set of name/value mappings. It is followed by an
    /// array of ResTableMap structures.
    pub fn complex(&self) -> bool {
        self.0 & Self::COMPLEX != 0
    }

    /// If set, this resource has been declared public, so libraries are allowed to reference it.
    pub fn public(&self) -> bool {
        self.0 & Self::PUBLIC != 0
    }

    /// If set, this is a weak resource and may be overriden by strong resources of the same
    /// name/types. This is only useful during linking with other resource tables.
    pub fn weak(&self) -> bool {
        self.0 & Self::WEAK != 0
    }

    /// If set, this is a compact entry with data type and value directly encoded in the entry.
    pub fn compact(&self) -> bool {
        self.0 & Self::COMPACT != 0
    }

    pub fn set(&mut self, flag: u16, on: bool) {
        match on {
            true => self.0 |= flag,
            false => self.0 &= !flag,
        }
    }
}

/// A single name/value mapping that is part of a complex resource entry.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ResTableMap {
    /// The resource identifier defining this mapping's name. For attribute resources, 'name' can
    /// be one of the following special resource types to supply meta-data about the attribute; for
    /// all other resource types it must be an attribute resource.
    pub name: ResTableRef,

    /// This mapping's value
    pub value: ResValue,
}

impl Readable for ResTableMap {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        Ok(Self {
            name: u32::read_no_opts(reader)
                .add_context(|| "read name for ResTableMap")?
                .into(),
            value: ResValue::read_no_opts(reader).add_context(|| "read value for ResTableMap")?,
        })
    }
}

impl Writeable for ResTableMap {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        self.name
            .id()
            .write_no_opts(writer)
            .add_context(|| "write name for ResTableMap")?;
        self.value
            .write_no_opts(writer)
            .add_context(|| "write value for ResTableMap")
    }
}

impl ResTableMap {
    pub const SIZE: usize = 4 + ResValue::SIZE;
}

/// Body of a complex entry: an optional parent style and its name/value mappings.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct BagValue {
    /// Resource identifier of the parent mapping, or 0 if there is none.
    pub parent: ResTableRef,
    pub items: Vec<ResTableMap>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum EntryValue {
    Simple(ResValue),
    Bag(BagValue),
}

impl EntryValue {
    /// Every value carried by this payload, bag items included.
    pub fn values(&self) -> Vec<&ResValue> {
        match self {
            Self::Simple(value) => vec![value],
            Self::Bag(bag) => bag.items.iter().map(|item| &item.value).collect(),
        }
    }

    pub fn values_mut(&mut self) -> Vec<&mut ResValue> {
        match self {
            Self::Simple(value) => vec![value],
            Self::Bag(bag) => bag.items.iter_mut().map(|item| &mut item.value).collect(),
        }
    }
}

/// This is the beginning of information about an entry in the resource table. It holds the
/// reference to the name of this entry, and is immediately followed by one of:
///
/// - A ResValue structure, if FLAG_COMPLEX is -not- set.
/// - An array of ResTableMap structures, if FLAG_COMPLEX is set.
/// - If FLAG_COMPACT is set, this entry is a compact entry for simple values only
///
/// Compact entries are decoded into the simple form and written compact again as long as their
/// key still fits in 16 bits.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Entry {
    pub flags: EntryFlags,
    /// Reference into ResTable_package::key_strings identifying this entry.
    pub key: ResStringPoolRef,
    pub value: EntryValue,
}

impl Readable for Entry {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        let start = reader.stream_position()?;
        let size = u16::read_no_opts(reader).add_context(|| "read size for Entry")?;
        let flags = EntryFlags::read_no_opts(reader).add_context(|| "read flags for Entry")?;

        if flags.compact() {
            let data = u32::read_no_opts(reader).add_context(|| "read data for compact Entry")?;
            return Ok(Self {
                flags: EntryFlags(flags.0 & 0xff),
                key: ResStringPoolRef { index: size as u32 },
                value: EntryValue::Simple(ResValue::new(ValueType((flags.0 >> 8) as u8), data)),
            });
        }

        let key = ResStringPoolRef::read_no_opts(reader).add_context(|| "read key for Entry")?;
        let value = if flags.complex() {
            let parent = u32::read_no_opts(reader).add_context(|| "read parent for Entry")?;
            let count = u32::read_no_opts(reader).add_context(|| "read count for Entry")?;
            reader.seek(SeekFrom::Start(start + size as u64))?;
            let items = <Vec<ResTableMap>>::read_vec(reader, count as usize)
                .add_context(|| "read map for Entry")?;
            EntryValue::Bag(BagValue {
                parent: parent.into(),
                items,
            })
        } else {
            reader.seek(SeekFrom::Start(start + size as u64))?;
            EntryValue::Simple(ResValue::read_no_opts(reader).add_context(|| "read value for Entry")?)
        };

        Ok(Self { flags, key, value })
    }
}

impl Writeable for Entry {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        if let Some(value) = self.compact_value() {
            (self.key.index as u16)
                .write_no_opts(writer)
                .add_context(|| "write key for compact Entry")?;
            ((self.flags.0 & 0xff) | ((value.data_type.0 as u16) << 8))
                .write_no_opts(writer)
                .add_context(|| "write flags for compact Entry")?;
            return value
                .data
                .write_no_opts(writer)
                .add_context(|| "write data for compact Entry");
        }

        let mut flags = self.flags;
        flags.set(EntryFlags::COMPACT, false);
        flags.set(EntryFlags::COMPLEX, matches!(self.value, EntryValue::Bag(_)));

        self.header_size()
            .write_no_opts(writer)
            .add_context(|| "write size for Entry")?;
        flags
            .write_no_opts(writer)
            .add_context(|| "write flags for Entry")?;
        self.key
            .write_no_opts(writer)
            .add_context(|| "write key for Entry")?;
        match &self.value {
            EntryValue::Simple(value) => value
                .write_no_opts(writer)
                .add_context(|| "write value for Entry"),
            EntryValue::Bag(bag) => {
                bag.parent
                    .id()
                    .write_no_opts(writer)
                    .add_context(|| "write parent for Entry")?;
                (bag.items.len() as u32)
                    .write_no_opts(writer)
                    .add_context(|| "write count for Entry")?;
                bag.items
                    .write_vec(writer)
                    .add_context(|| "write map for Entry")
            }
        }
    }
}

impl Entry {
    pub fn new(key: ResStringPoolRef, value: ResValue) -> Self {
        Self {
            flags: EntryFlags::default(),
            key,
            value: EntryValue::Simple(value),
        }
    }

    pub fn new_bag(key: ResStringPoolRef, parent: ResTableRef, items: Vec<ResTableMap>) -> Self {
        Self {
            flags: EntryFlags(EntryFlags::COMPLEX),
            key,
            value: EntryValue::Bag(BagValue { parent, items }),
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.value, EntryValue::Bag(_))
    }

    /// The simple value, when this is not a bag.
    pub fn res_value(&self) -> Option<&ResValue> {
        match &self.value {
            EntryValue::Simple(value) => Some(value),
            EntryValue::Bag(_) => None,
        }
    }

    pub fn set_value(&mut self, value: ResValue) {
        self.value = EntryValue::Simple(value);
        self.flags.set(EntryFlags::COMPLEX, false);
    }

    pub fn spec_reference(&self) -> u32 {
        self.key.index
    }

    pub fn set_spec_reference(&mut self, index: u32) {
        self.key = ResStringPoolRef { index };
    }

    fn compact_value(&self) -> Option<&ResValue> {
        match &self.value {
            EntryValue::Simple(value) if self.flags.compact() && self.key.index <= 0xffff => {
                Some(value)
            }
            _ => None,
        }
    }

    fn header_size(&self) -> u16 {
        match self.value {
            EntryValue::Simple(_) => 8,
            EntryValue::Bag(_) => 16,
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        if self.compact_value().is_some() {
            return 8;
        }
        match &self.value {
            EntryValue::Simple(_) => 8 + ResValue::SIZE,
            EntryValue::Bag(bag) => 16 + bag.items.len() * ResTableMap::SIZE,
        }
    }

    /// Applies `map` to every string pool index this entry's values point at.
    pub fn remap_strings<F: FnMut(u32) -> u32>(&mut self, mut map: F) {
        for value in self.value.values_mut() {
            if value.data_type == ValueType::STRING {
                value.data = map(value.data);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::stream::to_vec;

    use super::*;

    #[test]
    fn compact_entry_decodes_to_simple_value() {
        // key 5, flags compact with type int_dec, data 42
        let bytes = b"\x05\x00\x08\x10\x2a\x00\x00\x00".to_vec();
        let entry = Entry::read_no_opts(&mut Cursor::new(bytes.clone())).unwrap();
        assert_eq!(entry.key.index, 5);
        assert_eq!(entry.res_value(), Some(&ResValue::int(42)));
        assert_eq!(entry.size(), 8);
        assert_eq!(to_vec(|w| entry.write_no_opts(w)).unwrap(), bytes);
    }

    #[test]
    fn bag_entry_size_and_layout() {
        let entry = Entry::new_bag(
            ResStringPoolRef { index: 1 },
            ResTableRef::from(0x7f0f0000),
            vec![
                ResTableMap {
                    name: ResTableRef::from(0x01010000),
                    value: ResValue::int(1),
                },
                ResTableMap {
                    name: ResTableRef::from(0x01010001),
                    value: ResValue::boolean(true),
                },
            ],
        );
        assert_eq!(entry.size(), 16 + 2 * 12);
        let bytes = to_vec(|w| entry.write_no_opts(w)).unwrap();
        assert_eq!(bytes.len(), entry.size());
        assert_eq!(&bytes[..4], b"\x10\x00\x01\x00");
        assert_eq!(Entry::read_no_opts(&mut Cursor::new(bytes)).unwrap(), entry);
    }

    #[test]
    fn compact_entry_with_wide_key_is_expanded() {
        let mut entry = Entry::new(ResStringPoolRef { index: 0x10000 }, ResValue::int(7));
        entry.flags.set(EntryFlags::COMPACT, true);
        assert_eq!(entry.size(), 16);
        let bytes = to_vec(|w| entry.write_no_opts(w)).unwrap();
        assert_eq!(&bytes[..4], b"\x08\x00\x00\x00");
    }
}
