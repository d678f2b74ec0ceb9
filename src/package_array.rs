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

use crate::{
    defs::Chunk,
    error::{ArscError, Result},
    package::PackageBlock,
    string_pool::StringPool,
};

/// The packages of a table, in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackageArray {
    packages: Vec<PackageBlock>,
}

impl PackageArray {
    /// Id given to the first package of an empty table.
    pub const APP_PACKAGE_ID: u8 = 0x7f;

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PackageBlock> {
        self.packages.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PackageBlock> {
        self.packages.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&PackageBlock> {
        self.packages.get(index)
    }

    pub fn get_by_id(&self, id: u8) -> Option<&PackageBlock> {
        self.packages.iter().find(|package| package.id() == id)
    }

    pub fn get_by_id_mut(&mut self, id: u8) -> Option<&mut PackageBlock> {
        self.packages.iter_mut().find(|package| package.id() == id)
    }

    pub fn push(&mut self, package: PackageBlock) -> &mut PackageBlock {
        self.packages.push(package);
        let last = self.packages.len() - 1;
        &mut self.packages[last]
    }

    /// Appends an empty package whose id follows the highest one present.
    pub fn create_next(&mut self, name: &str) -> Result<&mut PackageBlock> {
        let id = match self.packages.iter().map(PackageBlock::id).max() {
            None => Self::APP_PACKAGE_ID,
            Some(last) => last
                .checked_add(1)
                .ok_or(ArscError::PackageIdsExhausted)?,
        };
        Ok(self.push(PackageBlock::new(id, name)?))
    }

    pub fn remove(&mut self, id: u8) -> Option<PackageBlock> {
        let index = self.packages.iter().position(|package| package.id() == id)?;
        Some(self.packages.remove(index))
    }

    pub fn sort(&mut self) {
        self.packages.sort_by_key(PackageBlock::id);
    }

    /// The only package, or the one holding the most entries.
    pub fn pick_one(&self) -> Option<&PackageBlock> {
        if self.packages.len() == 1 {
            return self.packages.first();
        }
        self.packages
            .iter()
            .rev()
            .max_by_key(|package| package.count_entries())
    }

    /// Merges every package of `other` into the package with the same id, appending the ones
    /// without a counterpart.
    pub fn merge(
        &mut self,
        other: &PackageArray,
        table_pool: &mut StringPool,
        other_pool: &StringPool,
    ) -> Result<()> {
        for package in &other.packages {
            let target = match self.packages.iter().position(|p| p.id() == package.id()) {
                Some(index) => &mut self.packages[index],
                None => {
                    let mut created = PackageBlock::new(package.id(), package.name())?;
                    created.last_public_type = package.last_public_type;
                    created.last_public_key = package.last_public_key;
                    created.type_id_offset = package.type_id_offset;
                    self.push(created)
                }
            };
            target.merge(package, table_pool, other_pool);
        }
        Ok(())
    }

    pub fn refresh(&mut self) {
        for package in &mut self.packages {
            package.refresh();
        }
    }

    pub fn size(&self) -> u32 {
        self.packages.iter().map(PackageBlock::chunk_size).sum()
    }
}

impl<'a> IntoIterator for &'a PackageArray {
    type Item = &'a PackageBlock;
    type IntoIter = std::slice::Iter<'a, PackageBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ResConfig;

    use super::*;

    #[test]
    fn create_next_follows_highest_id() {
        let mut packages = PackageArray::default();
        assert_eq!(packages.create_next("app").unwrap().id(), 0x7f);
        packages.push(PackageBlock::new(0x02, "lib").unwrap());
        assert_eq!(packages.create_next("next").unwrap().id(), 0x80);
        packages.sort();
        let ids: Vec<u8> = packages.iter().map(PackageBlock::id).collect();
        assert_eq!(ids, [0x02, 0x7f, 0x80]);
    }

    #[test]
    fn create_next_stops_after_0xff() {
        let mut packages = PackageArray::default();
        packages.push(PackageBlock::new(0xff, "last").unwrap());
        assert!(matches!(
            packages.create_next("wrapped"),
            Err(ArscError::PackageIdsExhausted)
        ));
        assert_eq!(packages.len(), 1);
        assert!(packages.get_by_id(0).is_none());
    }

    #[test]
    fn pick_one_prefers_the_fullest_package() {
        let mut packages = PackageArray::default();
        packages.push(PackageBlock::new(0x01, "small").unwrap());
        let big = packages.push(PackageBlock::new(0x7f, "big").unwrap());
        big.get_or_create_entry(1, &ResConfig::default(), "a");
        big.get_or_create_entry(1, &ResConfig::default(), "b");
        assert_eq!(packages.pick_one().map(PackageBlock::name), Some("big"));
    }

    #[test]
    fn merge_appends_unmatched_packages() {
        let mut pool = StringPool::default();
        let other_pool = StringPool::default();
        let mut other = PackageArray::default();
        other
            .push(PackageBlock::new(0x7f, "app").unwrap())
            .get_or_create_entry(1, &ResConfig::default(), "name");
        other.push(PackageBlock::new(0x02, "lib").unwrap());

        let mut packages = PackageArray::default();
        packages.push(PackageBlock::new(0x7f, "app").unwrap());
        packages.merge(&other, &mut pool, &other_pool).unwrap();

        assert_eq!(packages.len(), 2);
        assert_eq!(packages.get_by_id(0x7f).unwrap().count_entries(), 1);
        assert_eq!(packages.get_by_id(0x02).unwrap().name(), "lib");
    }
}
