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
    fmt::Display,
    io::{Read, Seek, Write},
    str::FromStr,
};

use binrw::{binrw, BinRead, BinWrite};

use crate::{
    defs::ResTableRef,
    stream::{read_binrw, write_binrw, NewResultCtx, Readable, StreamResult, Writeable},
    string_pool::{ResStringPoolRef, StringPool},
};

/// The type tag of a [`ResValue`]. Unlisted tags are legal and carried through as is.
#[derive(Debug, BinRead, BinWrite, PartialEq, Eq, Hash, Clone, Copy, Default, PartialOrd, Ord)]
#[brw(little)]
pub struct ValueType(pub u8);

impl ValueType {
    /// The 'data' is either 0 or 1, specifying this resource is either undefined or empty,
    /// respectively.
    pub const NULL: Self = Self(0x00);
    /// The 'data' holds a ResTable_ref, a reference to another resource table entry.
    pub const REFERENCE: Self = Self(0x01);
    /// The 'data' holds an attribute resource identifier.
    pub const ATTRIBUTE: Self = Self(0x02);
    /// The 'data' holds an index into the containing resource table's global value string pool.
    pub const STRING: Self = Self(0x03);
    /// The 'data' holds a single-precision floating point number.
    pub const FLOAT: Self = Self(0x04);
    /// The 'data' holds a complex number encoding a dimension value, such as "100in".
    pub const DIMENSION: Self = Self(0x05);
    /// The 'data' holds a complex number encoding a fraction of a container.
    pub const FRACTION: Self = Self(0x06);
    /// The 'data' holds a dynamic ResTable_ref which needs to be resolved before it can be used
    /// like a TYPE_REFERENCE.
    pub const DYNAMIC_REFERENCE: Self = Self(0x07);
    /// The 'data' holds an attribute resource identifier, which needs to be resolved before it can
    /// be used like a TYPE_ATTRIBUTE.
    pub const DYNAMIC_ATTRIBUTE: Self = Self(0x08);
    /// The 'data' is a raw integer value of the form n..n.
    pub const INT_DEC: Self = Self(0x10);
    /// The 'data' is a raw integer value of the form 0xn..n.
    pub const INT_HEX: Self = Self(0x11);
    /// The 'data' is either 0 or 1, for input "false" or "true" respectively.
    pub const INT_BOOLEAN: Self = Self(0x12);
    /// The 'data' is a raw integer value of the form #aarrggbb.
    pub const INT_COLOR_ARGB8: Self = Self(0x1c);
    /// The 'data' is a raw integer value of the form #rrggbb.
    pub const INT_COLOR_RGB8: Self = Self(0x1d);
    /// The 'data' is a raw integer value of the form #argb.
    pub const INT_COLOR_ARGB4: Self = Self(0x1e);
    /// The 'data' is a raw integer value of the form #rgb.
    pub const INT_COLOR_RGB4: Self = Self(0x1f);

    const NAMES: [(ValueType, &'static str); 16] = [
        (Self::NULL, "null"),
        (Self::REFERENCE, "reference"),
        (Self::ATTRIBUTE, "attribute"),
        (Self::STRING, "string"),
        (Self::FLOAT, "float"),
        (Self::DIMENSION, "dimension"),
        (Self::FRACTION, "fraction"),
        (Self::DYNAMIC_REFERENCE, "dynamic_reference"),
        (Self::DYNAMIC_ATTRIBUTE, "dynamic_attribute"),
        (Self::INT_DEC, "int_dec"),
        (Self::INT_HEX, "int_hex"),
        (Self::INT_BOOLEAN, "int_boolean"),
        (Self::INT_COLOR_ARGB8, "int_color_argb8"),
        (Self::INT_COLOR_RGB8, "int_color_rgb8"),
        (Self::INT_COLOR_ARGB4, "int_color_argb4"),
        (Self::INT_COLOR_RGB4, "int_color_rgb4"),
    ];

    pub fn name(self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(value_type, _)| *value_type == self)
            .map(|(_, name)| *name)
    }

    pub fn is_color(self) -> bool {
        (Self::INT_COLOR_ARGB8.0..=Self::INT_COLOR_RGB4.0).contains(&self.0)
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}

impl FromStr for ValueType {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((value_type, _)) = Self::NAMES.iter().find(|(_, name)| *name == s) {
            return Ok(*value_type);
        }
        let digits = s.strip_prefix("0x").unwrap_or(s);
        u8::from_str_radix(digits, 16).map(Self)
    }
}

/// Representation of a value in a resource, supplying type information.
#[binrw]
#[brw(little)]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct ResValue {
    /// Number of bytes in this structure.
    #[br(temp)]
    #[bw(calc = 8)]
    #[br(assert(size == 8))]
    size: u16,

    /// Always set to 0.
    #[br(temp)]
    #[bw(calc = 0)]
    res0: u8,

    pub data_type: ValueType,

    /// The data for this item, as interpreted according to dataType.
    pub data: u32,
}

impl Readable for ResValue {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        read_binrw(reader).add_context(|| "read ResValue")
    }
}

impl Writeable for ResValue {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        write_binrw(self, writer).add_context(|| "write ResValue")
    }
}

impl Default for ResValue {
    fn default() -> Self {
        Self::null()
    }
}

impl ResValue {
    pub const SIZE: usize = 8;

    pub fn new(data_type: ValueType, data: u32) -> Self {
        Self { data_type, data }
    }

    /// An undefined value, used for freshly created entries.
    pub fn null() -> Self {
        Self::new(ValueType::NULL, 0)
    }

    pub fn reference(id: u32) -> Self {
        Self::new(ValueType::REFERENCE, id)
    }

    pub fn int(value: i32) -> Self {
        Self::new(ValueType::INT_DEC, value as u32)
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ValueType::INT_BOOLEAN, if value { 0xffffffff } else { 0 })
    }

    pub fn string(reference: ResStringPoolRef) -> Self {
        Self::new(ValueType::STRING, reference.index)
    }

    /// Stores `string` in `pool` (reusing an existing copy) and points this value at it.
    pub fn write_string(&mut self, string: &str, pool: &mut StringPool) {
        *self = Self::string(pool.get_or_create(string));
    }

    pub fn string_ref(&self) -> Option<ResStringPoolRef> {
        (self.data_type == ValueType::STRING).then_some(ResStringPoolRef { index: self.data })
    }

    pub fn is_null(&self) -> bool {
        self.data_type == ValueType::NULL
    }

    pub fn decode(&self) -> ResValueData {
        match self.data_type {
            ValueType::NULL if self.data == 1 => ResValueData::Empty,
            ValueType::NULL => ResValueData::Undefined,
            ValueType::REFERENCE => ResValueData::Reference(self.data.into()),
            ValueType::ATTRIBUTE => ResValueData::Attribute(self.data.into()),
            ValueType::STRING => ResValueData::String(ResStringPoolRef { index: self.data }),
            ValueType::FLOAT => ResValueData::Float(f32::from_bits(self.data)),
            ValueType::DIMENSION => ResValueData::Dimension(self.data),
            ValueType::FRACTION => ResValueData::Fraction(self.data),
            ValueType::DYNAMIC_REFERENCE => ResValueData::DynamicReference(self.data.into()),
            ValueType::DYNAMIC_ATTRIBUTE => ResValueData::DynamicAttribute(self.data.into()),
            ValueType::INT_DEC => ResValueData::IntDec(self.data as i32),
            ValueType::INT_HEX => ResValueData::IntHex(self.data),
            ValueType::INT_BOOLEAN => ResValueData::IntBoolean(self.data != 0),
            t if t.is_color() => ResValueData::Color(t, self.data),
            t => ResValueData::Other(t, self.data),
        }
    }
}

/// A [`ResValue`] interpreted according to its type tag.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ResValueData {
    Undefined,
    Empty,
    Reference(ResTableRef),
    Attribute(ResTableRef),
    String(ResStringPoolRef),
    Float(f32),
    Dimension(u32),
    Fraction(u32),
    DynamicReference(ResTableRef),
    DynamicAttribute(ResTableRef),
    IntDec(i32),
    IntHex(u32),
    IntBoolean(bool),
    Color(ValueType, u32),
    Other(ValueType, u32),
}

impl Display for ResValueData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => write!(f, "@null"),
            Self::Empty => write!(f, "@empty"),
            Self::Reference(r) | Self::DynamicReference(r) => write!(f, "{r}"),
            Self::Attribute(r) | Self::DynamicAttribute(r) => write!(f, "?0x{:08x}", r.id()),
            Self::String(r) => write!(f, "string#{}", r.index),
            Self::Float(v) => write!(f, "{v}"),
            Self::Dimension(v) | Self::Fraction(v) => write!(f, "0x{v:08x}"),
            Self::IntDec(v) => write!(f, "{v}"),
            Self::IntHex(v) => write!(f, "0x{v:x}"),
            Self::IntBoolean(v) => write!(f, "{v}"),
            Self::Color(t, v) if *t == ValueType::INT_COLOR_RGB8 => write!(f, "#{:06x}", v & 0xffffff),
            Self::Color(t, v) if *t == ValueType::INT_COLOR_ARGB4 => write!(f, "#{:04x}", v & 0xffff),
            Self::Color(t, v) if *t == ValueType::INT_COLOR_RGB4 => write!(f, "#{:03x}", v & 0xfff),
            Self::Color(_, v) => write!(f, "#{v:08x}"),
            Self::Other(t, v) => write!(f, "{t}:0x{v:08x}"),
        }
    }
}
