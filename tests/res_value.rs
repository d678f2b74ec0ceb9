use std::io::Cursor;

use binrw::{BinReaderExt, BinWriterExt};
use restable::{
    defs::ResTableRef,
    res_value::{ResValue, ResValueData, ValueType},
    string_pool::{ResStringPoolRef, StringPool},
};

#[test]
fn res_value_read_null_undefined() {
    let mut reader = Cursor::new(b"\x08\x00\x00\x00\x00\x00\x00\x00");
    let value: ResValue = reader.read_le().unwrap();

    assert!(value.is_null());
    assert_eq!(value.decode(), ResValueData::Undefined);
}

#[test]
fn res_value_write_null_undefined() {
    let mut writer = Cursor::new(Vec::new());
    writer.write_le(&ResValue::null()).unwrap();

    assert_eq!(writer.into_inner(), b"\x08\x00\x00\x00\x00\x00\x00\x00");
}

#[test]
fn res_value_read_null_empty() {
    let mut reader = Cursor::new(b"\x08\x00\x00\x00\x01\x00\x00\x00");
    let value: ResValue = reader.read_le().unwrap();

    assert_eq!(value.decode(), ResValueData::Empty);
}

#[test]
fn res_value_rejects_bad_size() {
    let mut reader = Cursor::new(b"\x10\x00\x00\x10\x01\x00\x00\x00");
    assert!(reader.read_le::<ResValue>().is_err());
}

#[test]
fn res_value_reference_to_int() {
    let reference = ResTableRef {
        package_index: 0x01,
        type_index: 0x76,
        entry_index: 0xff81,
    };

    assert_eq!(<ResTableRef as Into<u32>>::into(reference), 0x0176ff81)
}

#[test]
fn res_value_int_to_reference() {
    let value = 0xff127690;
    assert_eq!(
        <u32 as Into<ResTableRef>>::into(value),
        ResTableRef {
            package_index: 0xff,
            type_index: 0x12,
            entry_index: 0x7690
        }
    );
}

#[test]
fn res_value_reference_from_str() {
    assert_eq!(
        "@0x7f010002".parse::<ResTableRef>().unwrap().id(),
        0x7f010002
    );
    assert!("0x7f010002".parse::<ResTableRef>().is_err());
    assert_eq!(ResTableRef::from(0x7f010002).to_string(), "@0x7f010002");
}

#[test]
fn res_value_read_int_dec() {
    let mut reader = Cursor::new(b"\x08\x00\x00\x10\xff\xff\xff\xff");
    let value: ResValue = reader.read_le().unwrap();

    assert_eq!(value, ResValue::int(-1));
    assert_eq!(value.decode(), ResValueData::IntDec(-1));
    assert_eq!(value.decode().to_string(), "-1");
}

#[test]
fn res_value_write_boolean() {
    let mut writer = Cursor::new(Vec::new());
    writer.write_le(&ResValue::boolean(true)).unwrap();

    assert_eq!(writer.into_inner(), b"\x08\x00\x00\x12\xff\xff\xff\xff");
}

#[test]
fn res_value_colors() {
    let value = ResValue::new(ValueType::INT_COLOR_RGB8, 0xff336699);
    assert_eq!(value.decode().to_string(), "#336699");

    let value = ResValue::new(ValueType::INT_COLOR_ARGB8, 0x80336699);
    assert_eq!(value.decode().to_string(), "#80336699");
}

#[test]
fn res_value_type_names() {
    assert_eq!(ValueType::STRING.to_string(), "string");
    assert_eq!("int_hex".parse::<ValueType>().unwrap(), ValueType::INT_HEX);
    assert_eq!("0x42".parse::<ValueType>().unwrap(), ValueType(0x42));
    assert_eq!(ValueType(0x42).to_string(), "0x42");
}

#[test]
fn res_value_write_string() {
    let mut pool = StringPool::new(true);
    pool.get_or_create("first");

    let mut value = ResValue::null();
    value.write_string("second", &mut pool);
    assert_eq!(value.string_ref(), Some(ResStringPoolRef { index: 1 }));

    let mut again = ResValue::null();
    again.write_string("second", &mut pool);
    assert_eq!(again, value);
    assert_eq!(pool.len(), 2);
    assert_eq!(ResValue::int(3).string_ref(), None);
}
