//! Read, edit, merge and write Android compiled resource tables (`resources.arsc`).

pub mod config;
pub mod defs;
pub mod entry;
pub mod entry_array;
pub mod error;
pub mod framework;
pub mod group;
pub mod json;
pub mod library;
pub mod package;
pub mod package_array;
pub mod res_value;
pub mod spec_type_pair;
pub mod stream;
pub mod string_pool;
pub mod table;
pub mod type_block;

pub use config::ResConfig;
pub use defs::Chunk;
pub use entry::Entry;
pub use error::{ArscError, Result};
pub use framework::FrameworkConfig;
pub use group::{EntryGroup, GroupView};
pub use package::PackageBlock;
pub use res_value::ResValue;
pub use string_pool::StringPool;
pub use table::{ResolvedGroup, SharedTable, TableBlock};
pub use type_block::TypeBlock;

/// Align an offset to a certain boundary
///
/// # Arguments
///
/// * `pos` - position to align
/// * `alignment` - number of bytes to align the position to
///
/// # Returns
///
/// The next position which is aligned to the specified boundary
pub fn align(pos: u64, alignment: u64) -> u64 {
    let remainder = pos % alignment;
    if remainder == 0 {
        return pos;
    }

    pos + (alignment - remainder)
}
