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

use thiserror::Error;

use crate::{defs::ChunkType, stream::StreamError};

#[derive(Debug, Error)]
pub enum ArscError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("not a resource table: expected {expected} chunk, found {found}")]
    UnexpectedChunk {
        expected: ChunkType,
        found: ChunkType,
    },

    #[error("type id mismatch: expected 0x{expected:02x}, found 0x{found:02x}")]
    TypeIdMismatch { expected: u8, found: u8 },

    #[error("refusing to write a table without packages or strings")]
    NullTable,

    #[error("package name is {0} UTF-16 units long, at most 127 fit")]
    PackageName(usize),

    #[error("no package id left after 0xff")]
    PackageIdsExhausted,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid document: {0}")]
    Document(String),
}

pub type Result<T> = std::result::Result<T, ArscError>;
