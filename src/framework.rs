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
    cell::RefCell,
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use tracing::{debug, warn};

use crate::{
    error::Result,
    table::{SharedTable, TableBlock},
};

thread_local! {
    static FRAMEWORKS: RefCell<HashMap<PathBuf, SharedTable>> = RefCell::new(HashMap::new());
}

/// Where to find the android framework resource table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameworkConfig {
    pub android_framework: Option<PathBuf>,
}

impl FrameworkConfig {
    pub const ENV_VAR: &'static str = "RESTABLE_ANDROID_FRAMEWORK";

    pub fn new<P: Into<PathBuf>>(android_framework: P) -> Self {
        Self {
            android_framework: Some(android_framework.into()),
        }
    }

    /// Reads the framework path from `RESTABLE_ANDROID_FRAMEWORK`. An unset or empty variable
    /// means no framework.
    pub fn from_env() -> Self {
        Self {
            android_framework: std::env::var_os(Self::ENV_VAR)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Loads the configured framework through the per-thread cache. A configured path that does
    /// not exist is skipped with a warning.
    pub fn load(&self) -> Result<Option<SharedTable>> {
        let Some(path) = &self.android_framework else {
            return Ok(None);
        };
        if !path.is_file() {
            warn!(path = %path.display(), "android framework table not found");
            return Ok(None);
        }
        load_framework(path).map(Some)
    }
}

/// Loads the table at `path`, or returns the copy this thread already loaded.
pub fn load_framework<P: AsRef<Path>>(path: P) -> Result<SharedTable> {
    let path = path.as_ref();
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if let Some(table) = FRAMEWORKS.with(|cache| cache.borrow().get(&key).cloned()) {
        debug!(path = %key.display(), "framework cache hit");
        return Ok(table);
    }
    let table = Rc::new(RefCell::new(TableBlock::load(&key)?));
    FRAMEWORKS.with(|cache| cache.borrow_mut().insert(key, table.clone()));
    Ok(table)
}

/// Forgets every framework loaded on this thread.
pub fn clear_framework_cache() {
    FRAMEWORKS.with(|cache| cache.borrow_mut().clear());
}
