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

use std::io::Cursor;

use restable::{
    defs::{Chunk, ChunkHeader},
    stream::{to_vec, Readable, ReadableNoOptions, WriteableNoOptions},
    string_pool::{
        read_string16, read_string8, write_string16, write_string8, ResStringPoolRef,
        ResStringPoolSpan, StringPool, StringPoolFlags,
    },
};

fn read_pool(bytes: &[u8]) -> StringPool {
    let mut reader = Cursor::new(bytes);
    let header = ChunkHeader::read_no_opts(&mut reader).unwrap();
    StringPool::read(&mut reader, header).unwrap()
}

fn write_pool(pool: &mut StringPool) -> Vec<u8> {
    pool.refresh();
    to_vec(|w| pool.write_chunk(w).map(|_| ())).unwrap()
}

/// A UTF-8 pool holding "ab" and "c", unsorted.
const SMALL_UTF8_POOL: &[u8] = b"\x01\x00\x1c\x00\x30\x00\x00\x00\
\x02\x00\x00\x00\x00\x00\x00\x00\x00\x01\x00\x00\x24\x00\x00\x00\x00\x00\x00\x00\
\x00\x00\x00\x00\x05\x00\x00\x00\
\x02\x02ab\x00\x01\x01c\x00\x00\x00";

#[test]
fn test_read_res_string_pool_ref() {
    let mut reader = Cursor::new(b"\x10\xef\xcd\xab");
    let rspr = ResStringPoolRef::read_no_opts(&mut reader).unwrap();

    assert_eq!(rspr.index, 0xabcdef10)
}

#[test]
fn test_write_res_string_pool_ref() {
    let bytes = to_vec(|w| ResStringPoolRef { index: 0x00120950 }.write_no_opts(w)).unwrap();

    assert_eq!(bytes, b"\x50\x09\x12\x00")
}

#[test]
fn test_string_pool_flags_from_int() {
    let value = StringPoolFlags { flags: 0 };
    assert!(!value.sorted());
    assert!(!value.utf8());

    let value = StringPoolFlags { flags: 1 };
    assert!(value.sorted());
    assert!(!value.utf8());

    let value = StringPoolFlags { flags: 0x101 };
    assert!(value.sorted());
    assert!(value.utf8());
}

#[test]
fn test_string_pool_flags_to_int() {
    assert_eq!(StringPoolFlags::new(false, false).flags, 0x0);
    assert_eq!(StringPoolFlags::new(true, false).flags, 0x1);
    assert_eq!(StringPoolFlags::new(false, true).flags, 0x100);
    assert_eq!(StringPoolFlags::new(true, true).flags, 0x101);
}

#[test]
fn test_read_res_string_pool_span() {
    let mut reader = Cursor::new(b"\x01\x00\x00\x50\x05\x00\x00\x00\x00\x05\x00\x00");
    let value = ResStringPoolSpan::read_no_opts(&mut reader).unwrap();

    assert_eq!(value.name, ResStringPoolRef { index: 0x50000001 });
    assert_eq!(value.first_char, 0x5);
    assert_eq!(value.last_char, 0x500);
}

#[test]
fn test_read_string8_normal() {
    let mut reader = Cursor::new(b"\x0d\x0dHello, World!\x00");
    assert_eq!(read_string8(&mut reader).unwrap(), "Hello, World!");
}

#[test]
fn test_read_string8_very_long() {
    let mut test_input = b"\x85\x01\x85\x01".to_vec();
    let test_str = "A".repeat(0x0501);
    test_input.extend(test_str.as_bytes());
    test_input.push(0);
    let mut reader = Cursor::new(test_input);

    assert_eq!(read_string8(&mut reader).unwrap(), test_str);
}

#[test]
fn test_write_string8_max_length() {
    let test_str = "A".repeat(0x7fff);
    let bytes = to_vec(|w| write_string8(w, &test_str).map(|_| ())).unwrap();

    let mut expected = b"\xff\xff\xff\xff".to_vec();
    expected.extend(test_str.as_bytes());
    expected.push(0);
    assert_eq!(bytes, expected);
}

#[test]
fn test_write_string8_counts_utf16_units() {
    // "é" is one UTF-16 unit and two UTF-8 bytes
    let bytes = to_vec(|w| write_string8(w, "é").map(|_| ())).unwrap();
    assert_eq!(bytes, b"\x01\x02\xc3\xa9\x00");
}

#[test]
fn test_read_string16_normal() {
    let mut reader = Cursor::new(
        b"\x0d\x00H\x00e\x00l\x00l\x00o\x00,\x00 \x00W\x00o\x00r\x00l\x00d\x00!\x00\x00\x00",
    );
    assert_eq!(read_string16(&mut reader).unwrap(), "Hello, World!");
}

#[test]
fn test_string16_very_long() {
    let test_str = "A".repeat(0x10001);
    let bytes = to_vec(|w| write_string16(w, &test_str).map(|_| ())).unwrap();
    assert_eq!(&bytes[..4], b"\x01\x80\x01\x00");
    assert_eq!(bytes.len(), 4 + 0x10001 * 2 + 2);

    let mut reader = Cursor::new(bytes);
    assert_eq!(read_string16(&mut reader).unwrap(), test_str);
}

#[test]
fn test_read_small_pool() {
    let pool = read_pool(SMALL_UTF8_POOL);

    assert!(pool.is_utf8());
    assert!(!pool.flags().sorted());
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.get(0), Some("ab"));
    assert_eq!(pool.get(1), Some("c"));
    assert_eq!(pool.get(2), None);
    assert_eq!(pool.index_of("c"), Some(ResStringPoolRef { index: 1 }));
}

#[test]
fn test_unmodified_pool_round_trips() {
    let mut pool = read_pool(SMALL_UTF8_POOL);
    assert!(pool.is_pristine());
    assert_eq!(write_pool(&mut pool), SMALL_UTF8_POOL);
}

#[test]
fn test_modified_pool_is_rebuilt() {
    let mut pool = read_pool(SMALL_UTF8_POOL);
    let added = pool.get_or_create("new");
    assert_eq!(added.index, 2);
    assert!(!pool.is_pristine());

    let bytes = write_pool(&mut pool);
    assert_eq!(bytes.len() % 4, 0);
    let copy = read_pool(&bytes);
    assert_eq!(copy.iter().collect::<Vec<_>>(), ["ab", "c", "new"]);
}

#[test]
fn test_merge_moves_span_tags() {
    let mut source = StringPool::new(false);
    let tag = source.get_or_create("b");
    let styled = source.push_styled(
        "bold".to_string(),
        vec![ResStringPoolSpan {
            name: tag,
            first_char: 0,
            last_char: 3,
        }],
    );

    let mut target = StringPool::new(true);
    target.get_or_create("unrelated");
    target.merge(&source);

    let copied = target.index_of("bold").unwrap();
    let spans = target.styles(copied.index as usize);
    assert_eq!(spans.len(), 1);
    assert_eq!(target.resolve(spans[0].name), Some("b"));
    assert_eq!(source.styles(styled.index as usize).len(), 1);

    // a second merge finds the styled copy again
    let before = target.len();
    target.merge(&source);
    assert_eq!(target.len(), before);
}
