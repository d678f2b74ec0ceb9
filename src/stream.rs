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
    any::type_name,
    fmt::Display,
    io::{Read, Seek, SeekFrom, Write},
};

use binrw::{BinRead, BinWrite};

use crate::defs::ChunkHeader;

#[derive(Debug)]
pub struct StreamError {
    pub error: std::io::Error,
    pub pos: u64,
    pub context: Vec<String>,
}

impl StreamError {
    pub fn new_context(error: std::io::Error, pos: u64, context: Vec<String>) -> Self {
        Self {
            error,
            pos,
            context,
        }
    }

    pub fn new(error: std::io::Error, pos: u64) -> Self {
        Self {
            error,
            pos,
            context: Vec::new(),
        }
    }

    pub fn add_context<C: ToString>(mut self, new_context: C) -> Self {
        self.context.push(new_context.to_string());
        self
    }

    pub fn new_string_context<E: ToString, C: ToString>(error: E, pos: u64, context: C) -> Self {
        Self {
            error: std::io::Error::other(error.to_string()),
            pos,
            context: vec![context.to_string()],
        }
    }

    /// True when the underlying failure is running out of input.
    pub fn is_eof(&self) -> bool {
        self.error.kind() == std::io::ErrorKind::UnexpectedEof
    }
}

impl Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error: {} at {} with context:", self.error, self.pos)?;
        for ctx in &self.context {
            write!(f, "\n{ctx}")?;
        }
        Ok(())
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type StreamResult<T> = Result<T, StreamError>;

pub trait NewResultCtx {
    fn add_context<C: ToString, F: FnOnce() -> C>(self, context: F) -> Self;
}

impl<T> NewResultCtx for StreamResult<T> {
    fn add_context<C: ToString, F: FnOnce() -> C>(self, context: F) -> Self {
        self.map_err(|e| e.add_context(context()))
    }
}

pub trait Readable: Sized {
    type Args;
    fn read<R: Read + Seek>(reader: &mut R, args: Self::Args) -> StreamResult<Self>;
}

pub trait Writeable {
    type Args;
    fn write<W: Write + Seek>(&self, writer: &mut W, args: Self::Args) -> StreamResult<()>;
}

pub trait ResultCtx: Sized {
    type OkT;
    fn with_context<C: ToString, F: FnOnce() -> C>(
        self,
        pos: u64,
        context: F,
    ) -> StreamResult<Self::OkT>;
    fn stream_context<C: ToString, F: FnOnce() -> C>(self, context: F) -> StreamResult<Self::OkT>;
}

impl From<std::io::Error> for StreamError {
    fn from(value: std::io::Error) -> Self {
        Self::new(value, u64::MAX)
    }
}

impl<T> ResultCtx for Result<T, std::io::Error> {
    type OkT = T;
    fn with_context<C: ToString, F: FnOnce() -> C>(
        self,
        pos: u64,
        context: F,
    ) -> StreamResult<T> {
        self.map_err(|e| StreamError::new_context(e, pos, vec![context().to_string()]))
    }
    fn stream_context<C: ToString, F: FnOnce() -> C>(self, context: F) -> StreamResult<T> {
        self.with_context(u64::MAX, context)
    }
}

fn read_data<R: Read + Seek, const N: usize>(reader: &mut R) -> StreamResult<[u8; N]> {
    let mut buf = [0; N];
    let pos = reader.stream_position()?;
    reader
        .read_exact(&mut buf)
        .with_context(pos, || format!("read_data<{N}>"))?;
    Ok(buf)
}

fn write_data<W: Write + Seek>(data: &[u8], writer: &mut W) -> StreamResult<()> {
    let pos = writer.stream_position()?;
    writer.write_all(data).with_context(pos, || "write_data")
}

pub trait ReadableNoOptions: Sized {
    fn read_no_opts<R: Read + Seek>(reader: &mut R) -> StreamResult<Self>;
}

pub trait WriteableNoOptions {
    fn write_no_opts<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<()>;
}

impl<T: Readable<Args = ()>> ReadableNoOptions for T {
    fn read_no_opts<R: Read + Seek>(reader: &mut R) -> StreamResult<Self> {
        T::read(reader, ())
    }
}

impl<T: Writeable<Args = ()>> WriteableNoOptions for T {
    fn write_no_opts<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<()> {
        self.write(writer, ())
    }
}

macro_rules! impl_le_primitive {
    ($($ty:ty),*) => {
        $(
            impl Readable for $ty {
                type Args = ();
                fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
                    Ok(Self::from_le_bytes(
                        read_data(reader).add_context(|| concat!("read ", stringify!($ty)))?,
                    ))
                }
            }

            impl Writeable for $ty {
                type Args = ();
                fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
                    write_data(&self.to_le_bytes(), writer)
                        .add_context(|| concat!("write ", stringify!($ty)))
                }
            }
        )*
    };
}

impl_le_primitive!(u8, u16, u32, u64);

pub trait VecReadable: Sized {
    fn read_vec<R: Read + Seek>(reader: &mut R, count: usize) -> StreamResult<Self>;
}

pub trait VecWritable {
    fn write_vec<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<()>;
}

impl<T: ReadableNoOptions> VecReadable for Vec<T> {
    fn read_vec<R: Read + Seek>(reader: &mut R, count: usize) -> StreamResult<Self> {
        let mut data = Vec::with_capacity(count.min(0x10000));

        for i in 0..count {
            data.push(T::read_no_opts(reader).add_context(|| {
                format!("reading item {} of vec of type {}", i, type_name::<T>())
            })?);
        }

        Ok(data)
    }
}

impl<T: WriteableNoOptions> VecWritable for [T] {
    fn write_vec<W: Write + Seek>(&self, writer: &mut W) -> StreamResult<()> {
        for (i, val) in self.iter().enumerate() {
            val.write_no_opts(writer).add_context(|| {
                format!("writing item {} of vec of type {}", i, type_name::<T>())
            })?;
        }

        Ok(())
    }
}

/// Read a raw run of bytes.
pub fn read_bytes<R: Read + Seek>(reader: &mut R, count: usize) -> StreamResult<Vec<u8>> {
    let pos = reader.stream_position()?;
    let mut data = vec![0u8; count];
    reader
        .read_exact(&mut data)
        .with_context(pos, || format!("read_bytes({count})"))?;
    Ok(data)
}

pub fn write_bytes<W: Write + Seek>(writer: &mut W, data: &[u8]) -> StreamResult<()> {
    write_data(data, writer).add_context(|| "write_bytes")
}

/// Write `count` zero bytes.
pub fn write_padding<W: Write + Seek>(writer: &mut W, count: usize) -> StreamResult<()> {
    if count == 0 {
        return Ok(());
    }
    write_data(&vec![0u8; count], writer).add_context(|| format!("write {count} padding bytes"))
}

/// Read a little-endian value through its binrw definition.
pub fn read_binrw<T, R>(reader: &mut R) -> StreamResult<T>
where
    T: for<'a> BinRead<Args<'a> = ()>,
    R: Read + Seek,
{
    let pos = reader.stream_position()?;
    T::read_le(reader).map_err(|e| match e {
        binrw::Error::Io(io) => StreamError::new_context(io, pos, vec![format!(
            "read {}",
            type_name::<T>()
        )]),
        other => StreamError::new_string_context(other, pos, format!("read {}", type_name::<T>())),
    })
}

pub fn write_binrw<T, W>(value: &T, writer: &mut W) -> StreamResult<()>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
    W: Write + Seek,
{
    let pos = writer.stream_position()?;
    value
        .write_le(writer)
        .map_err(|e| StreamError::new_string_context(e, pos, format!("write {}", type_name::<T>())))
}

/// Number of bytes left between the current position and the end of the stream.
pub fn remaining<R: Seek>(reader: &mut R) -> StreamResult<u64> {
    let pos = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(pos))?;
    Ok(end.saturating_sub(pos))
}

/// Read a value without consuming it.
pub fn peek<T: ReadableNoOptions, R: Read + Seek>(reader: &mut R) -> StreamResult<T> {
    let pos = reader.stream_position()?;
    let value = T::read_no_opts(reader);
    reader.seek(SeekFrom::Start(pos))?;
    value
}

/// The header of the chunk at the current position, leaving the position where it was.
pub fn peek_chunk_header<R: Read + Seek>(reader: &mut R) -> StreamResult<ChunkHeader> {
    peek::<ChunkHeader, _>(reader).add_context(|| "peek ChunkHeader")
}

/// Write into an in-memory cursor and hand back the bytes.
pub fn to_vec<F>(write: F) -> StreamResult<Vec<u8>>
where
    F: FnOnce(&mut std::io::Cursor<Vec<u8>>) -> StreamResult<()>,
{
    let mut cursor = std::io::Cursor::new(Vec::new());
    write(&mut cursor)?;
    Ok(cursor.into_inner())
}
