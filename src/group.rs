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

use crate::{entry::Entry, package::PackageBlock, type_block::TypeBlock};

/// All configurations of one resource id inside a package.
///
/// Members are indices into the type blocks of the package's pair for the resource's type id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryGroup {
    resource_id: u32,
    members: Vec<usize>,
}

impl EntryGroup {
    pub fn new(resource_id: u32) -> Self {
        Self {
            resource_id,
            members: Vec::new(),
        }
    }

    pub fn resource_id(&self) -> u32 {
        self.resource_id
    }

    pub fn type_id(&self) -> u8 {
        (self.resource_id >> 16) as u8
    }

    pub fn entry_id(&self) -> u16 {
        self.resource_id as u16
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn add(&mut self, type_index: usize) {
        if !self.members.contains(&type_index) {
            self.members.push(type_index);
        }
    }
}

/// One configuration of a resource.
#[derive(Debug, Clone, Copy)]
pub struct EntryRef<'a> {
    pub type_block: &'a TypeBlock,
    pub entry_id: u16,
    pub entry: &'a Entry,
}

impl EntryRef<'_> {
    pub fn is_default(&self) -> bool {
        self.type_block.is_default()
    }
}

/// An [`EntryGroup`] resolved against its package.
#[derive(Debug, Clone, Copy)]
pub struct GroupView<'a> {
    package: &'a PackageBlock,
    group: &'a EntryGroup,
}

impl<'a> GroupView<'a> {
    pub(crate) fn new(package: &'a PackageBlock, group: &'a EntryGroup) -> Self {
        Self { package, group }
    }

    pub fn package(&self) -> &'a PackageBlock {
        self.package
    }

    pub fn group(&self) -> &'a EntryGroup {
        self.group
    }

    pub fn resource_id(&self) -> u32 {
        self.group.resource_id
    }

    /// Member entries in registration order, null slots skipped.
    pub fn iter(&self) -> impl Iterator<Item = EntryRef<'a>> + 'a {
        let entry_id = self.group.entry_id();
        let pair = self.package.spec_type_pair(self.group.type_id());
        self.group.members.iter().filter_map(move |index| {
            let type_block = pair?.types.get(*index)?;
            Some(EntryRef {
                type_block,
                entry_id,
                entry: type_block.get_entry(entry_id)?,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// The representative entry: the first one in a default configuration, else the first one.
    pub fn pick_one(&self) -> Option<EntryRef<'a>> {
        let mut first = None;
        for entry in self.iter() {
            if entry.is_default() {
                return Some(entry);
            }
            first.get_or_insert(entry);
        }
        first
    }

    pub fn get_default(&self) -> Option<EntryRef<'a>> {
        self.iter().find(EntryRef::is_default)
    }

    pub fn spec_name(&self) -> Option<&'a str> {
        let entry = self.pick_one()?;
        self.package.key_strings().resolve(entry.entry.key)
    }

    pub fn type_name(&self) -> Option<String> {
        let entry = self.pick_one()?;
        entry.type_block.type_name(self.package.type_strings())
    }

    /// True when every member points at the same spec string.
    pub fn is_all_same_spec(&self) -> bool {
        let mut keys = self.iter().map(|entry| entry.entry.key);
        match keys.next() {
            Some(first) => keys.all(|key| key == first),
            None => true,
        }
    }
}
