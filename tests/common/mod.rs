#![allow(dead_code)]

//! Hand assembled little-endian resource tables.

use restable::{PackageBlock, ResConfig, ResValue, TableBlock};

pub const PACKAGE_ID: u8 = 0x7f;
pub const APP_NAME: u32 = 0x7f010000;
pub const TITLE: u32 = 0x7f010001;
pub const STAGED_TITLE: u32 = 0x7f010005;

#[derive(Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn u8(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.0.extend(value.to_le_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.0.extend(value.to_le_bytes());
        self
    }

    pub fn bytes(mut self, value: &[u8]) -> Self {
        self.0.extend_from_slice(value);
        self
    }
}

/// A chunk with the header triple in front of `header` and `body`.
pub fn chunk(chunk_type: u16, header: &[u8], body: &[u8]) -> Vec<u8> {
    let header_size = 8 + header.len();
    Bytes::default()
        .u16(chunk_type)
        .u16(header_size as u16)
        .u32((header_size + body.len()) as u32)
        .bytes(header)
        .bytes(body)
        .0
}

/// An unsorted UTF-8 string pool of short strings.
pub fn utf8_pool(strings: &[&str]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut offsets = Bytes::default();
    for string in strings {
        offsets = offsets.u32(data.len() as u32);
        data.push(string.encode_utf16().count() as u8);
        data.push(string.len() as u8);
        data.extend_from_slice(string.as_bytes());
        data.push(0);
    }
    while data.len() % 4 != 0 {
        data.push(0);
    }
    let header = Bytes::default()
        .u32(strings.len() as u32)
        .u32(0)
        .u32(0x100)
        .u32(28 + 4 * strings.len() as u32)
        .u32(0);
    chunk(0x0001, &header.0, &[offsets.0, data].concat())
}

/// A 64 byte configuration, `size` included, with only the orientation set.
pub fn config(orientation: u8) -> Vec<u8> {
    let mut raw = vec![0u8; 60];
    raw[8] = orientation;
    Bytes::default().u32(64).bytes(&raw).0
}

/// A simple 16 byte entry.
pub fn simple_entry(key: u32, data_type: u8, data: u32) -> Vec<u8> {
    Bytes::default()
        .u16(8)
        .u16(0)
        .u32(key)
        .u16(8)
        .u8(0)
        .u8(data_type)
        .u32(data)
        .0
}

/// A type chunk with dense 32 bit offsets.
pub fn type_chunk(id: u8, config: &[u8], entries: &[Option<Vec<u8>>]) -> Vec<u8> {
    type_chunk_with(id, 0, config, entries)
}

/// A type chunk whose offset table follows `flags`: 0x01 for sparse (id, offset / 4) pairs,
/// 0x02 for 16 bit offsets / 4, anything else for dense 32 bit offsets.
pub fn type_chunk_with(id: u8, flags: u8, config: &[u8], entries: &[Option<Vec<u8>>]) -> Vec<u8> {
    let mut offsets = Bytes::default();
    let mut data = Vec::new();
    let mut count = 0;
    for (index, entry) in entries.iter().enumerate() {
        match (entry, flags) {
            (Some(entry), 0x01) => {
                offsets = offsets.u16(index as u16).u16((data.len() / 4) as u16);
                data.extend_from_slice(entry);
                count += 1;
            }
            (None, 0x01) => {}
            (Some(entry), 0x02) => {
                offsets = offsets.u16((data.len() / 4) as u16);
                data.extend_from_slice(entry);
                count += 1;
            }
            (None, 0x02) => offsets = offsets.u16(0xffff),
            (Some(entry), _) => {
                offsets = offsets.u32(data.len() as u32);
                data.extend_from_slice(entry);
            }
            (None, _) => offsets = offsets.u32(0xffffffff),
        }
    }
    let entry_count = match flags {
        0x01 => count,
        _ => entries.len(),
    };
    while offsets.0.len() % 4 != 0 {
        offsets = offsets.u8(0);
    }
    let entries_start = 8 + 12 + config.len() + offsets.0.len();
    let header = Bytes::default()
        .u8(id)
        .u8(flags)
        .u16(0)
        .u32(entry_count as u32)
        .u32(entries_start as u32)
        .bytes(config);
    chunk(0x0201, &header.0, &[offsets.0, data].concat())
}

pub fn spec_chunk(id: u8, flags: &[u32]) -> Vec<u8> {
    let header = Bytes::default().u8(id).u8(0).u16(0).u32(flags.len() as u32);
    let body = flags.iter().fold(Bytes::default(), |b, flag| b.u32(*flag));
    chunk(0x0202, &header.0, &body.0)
}

pub fn package_chunk(id: u32, name: &str, children: &[Vec<u8>]) -> Vec<u8> {
    package_chunk_sized(id, name, 288, children)
}

/// A package whose header is `header_size` bytes long: 288, or 284 for headers written before
/// `type_id_offset` existed. `children` starts with the type and key string pools.
pub fn package_chunk_sized(id: u32, name: &str, header_size: u32, children: &[Vec<u8>]) -> Vec<u8> {
    let type_strings = &children[0];
    let mut name_units: Vec<u16> = name.encode_utf16().collect();
    name_units.resize(128, 0);
    let mut header = name_units
        .iter()
        .fold(Bytes::default().u32(id), |b, unit| b.u16(*unit))
        .u32(header_size)
        .u32(0)
        .u32(header_size + type_strings.len() as u32)
        .u32(0);
    if header_size >= 288 {
        header = header.u32(0);
    }
    chunk(0x0200, &header.0, &children.concat())
}

/// An unsorted UTF-16 string pool.
pub fn utf16_pool(strings: &[&str]) -> Vec<u8> {
    let mut data = Bytes::default();
    let mut offsets = Bytes::default();
    for string in strings {
        offsets = offsets.u32(data.0.len() as u32);
        let units: Vec<u16> = string.encode_utf16().collect();
        data = units
            .iter()
            .fold(data.u16(units.len() as u16), |b, unit| b.u16(*unit))
            .u16(0);
    }
    while data.0.len() % 4 != 0 {
        data = data.u8(0);
    }
    let header = Bytes::default()
        .u32(strings.len() as u32)
        .u32(0)
        .u32(0)
        .u32(28 + 4 * strings.len() as u32)
        .u32(0);
    chunk(0x0001, &header.0, &[offsets.0, data.0].concat())
}

/// A library chunk mapping each build time package id to a package name.
pub fn library_chunk(libraries: &[(u32, &str)]) -> Vec<u8> {
    let body = libraries.iter().fold(Bytes::default(), |b, (id, name)| {
        let mut units: Vec<u16> = name.encode_utf16().collect();
        units.resize(128, 0);
        units.iter().fold(b.u32(*id), |b, unit| b.u16(*unit))
    });
    chunk(0x0203, &Bytes::default().u32(libraries.len() as u32).0, &body.0)
}

/// One package `com.example` (0x7f) holding the string type with `app_name` (a string value,
/// default configuration only) and `title` (an int in the default and landscape configurations),
/// plus a staged alias from 0x7f010005 to `title`.
pub fn sample_table() -> Vec<u8> {
    let package = package_chunk(
        PACKAGE_ID as u32,
        "com.example",
        &[
            utf8_pool(&["string"]),
            utf8_pool(&["app_name", "title"]),
            spec_chunk(1, &[0, 0x40000000]),
            type_chunk(
                1,
                &config(0),
                &[
                    Some(simple_entry(0, 0x03, 0)),
                    Some(simple_entry(1, 0x10, 7)),
                ],
            ),
            type_chunk(1, &config(2), &[None, Some(simple_entry(1, 0x10, 8))]),
            chunk(
                0x0206,
                &Bytes::default().u32(1).0,
                &Bytes::default().u32(STAGED_TITLE).u32(TITLE).0,
            ),
        ],
    );
    let body = [utf8_pool(&["Hello"]), package].concat();
    chunk(0x0002, &Bytes::default().u32(1).0, &body)
}

/// A table with one package holding one int per name in the default configuration.
pub fn int_table(package_id: u8, type_id: u8, entries: &[(&str, i32)]) -> TableBlock {
    let mut table = TableBlock::new();
    let package = table
        .packages_mut()
        .push(PackageBlock::new(package_id, "com.example").unwrap());
    package.set_type_name(type_id, "integer");
    for (name, value) in entries {
        let id = package.get_or_create_entry(type_id, &ResConfig::default(), name);
        package
            .type_block_mut(type_id, &ResConfig::default())
            .and_then(|block| block.get_entry_mut(id as u16))
            .unwrap()
            .set_value(ResValue::int(*value));
    }
    table
}

/// Package `com.layout` (0x7f) exercising the less common layouts: a library chunk ahead of the
/// types, type 1 (`dimen`) with 16 bit offsets and a null slot, an overlayable chunk between
/// the two types, and type 2 (`id`) with sparse offsets for entries 1 and 3.
pub fn layout_table() -> Vec<u8> {
    let package = package_chunk(
        PACKAGE_ID as u32,
        "com.layout",
        &[
            utf8_pool(&["dimen", "id"]),
            utf8_pool(&["small", "unused", "large", "first", "second"]),
            library_chunk(&[(0x02, "com.shared")]),
            spec_chunk(1, &[0, 0, 0x40000000]),
            type_chunk_with(
                1,
                0x02,
                &config(0),
                &[
                    Some(simple_entry(0, 0x10, 4)),
                    None,
                    Some(simple_entry(2, 0x10, 16)),
                ],
            ),
            chunk(
                0x0204,
                &Bytes::default().u32(0).0,
                &Bytes::default().u32(0x11).u32(0x22).0,
            ),
            spec_chunk(2, &[0, 0, 0, 0]),
            type_chunk_with(
                2,
                0x01,
                &config(0),
                &[
                    None,
                    Some(simple_entry(3, 0x12, 1)),
                    None,
                    Some(simple_entry(4, 0x12, 0)),
                ],
            ),
        ],
    );
    let body = [utf8_pool(&[]), package].concat();
    chunk(0x0002, &Bytes::default().u32(1).0, &body)
}

pub fn land() -> ResConfig {
    let mut config = ResConfig::default();
    config.set_orientation(2);
    config
}
