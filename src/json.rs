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

//! A serde document model of a table, meant for diffing and hand editing.

use serde::{Deserialize, Serialize};

use crate::{
    config::ResConfig,
    defs::{Chunk, ResTableRef},
    entry::{Entry, EntryFlags, EntryValue, ResTableMap},
    error::{ArscError, Result},
    library::StagedAliasEntry,
    package::PackageBlock,
    res_value::{ResValue, ValueType},
    string_pool::{ResStringPoolSpan, StringPool},
    table::TableBlock,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDocument {
    pub packages: Vec<PackageDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styled_strings: Vec<StyledStringDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledStringDocument {
    pub text: String,
    pub spans: Vec<SpanDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanDocument {
    pub tag: String,
    pub first: u32,
    pub last: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDocument {
    pub id: u8,
    pub name: String,
    pub types: Vec<TypeDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub staged_aliases: Vec<StagedAliasDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedAliasDocument {
    pub staged: u32,
    pub finalized: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDocument {
    pub id: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub config: ConfigDocument,
    pub entries: Vec<EntryDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Informational; `raw` is what gets read back.
    pub qualifiers: String,
    #[serde(with = "hex")]
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDocument {
    pub id: u16,
    pub name: String,
    #[serde(default)]
    pub flags: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bag: Option<BagDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagDocument {
    pub parent: u32,
    pub items: Vec<BagItemDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagItemDocument {
    pub name: u32,
    pub value: ValueDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDocument {
    #[serde(rename = "type")]
    pub value_type: String,
    pub data: u32,
    /// Text of string values. Takes precedence over `data` when read back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
}

impl ValueDocument {
    fn new(value: &ResValue, pool: &StringPool) -> Self {
        Self {
            value_type: value.data_type.to_string(),
            data: value.data,
            string: match value.string_ref() {
                Some(reference) => pool.resolve(reference).map(str::to_string),
                None => None,
            },
        }
    }

    fn to_value(&self, pool: &mut StringPool) -> Result<ResValue> {
        let data_type: ValueType = self.value_type.parse().map_err(|_| {
            ArscError::Document(format!("unknown value type {:?}", self.value_type))
        })?;
        let data = match &self.string {
            Some(text) if data_type == ValueType::STRING => pool.get_or_create(text).index,
            _ => self.data,
        };
        Ok(ResValue::new(data_type, data))
    }
}

impl EntryDocument {
    fn new(id: u16, entry: &Entry, package: &PackageBlock, pool: &StringPool) -> Self {
        let (value, bag) = match &entry.value {
            EntryValue::Simple(value) => (Some(ValueDocument::new(value, pool)), None),
            EntryValue::Bag(bag) => (
                None,
                Some(BagDocument {
                    parent: bag.parent.id(),
                    items: bag
                        .items
                        .iter()
                        .map(|item| BagItemDocument {
                            name: item.name.id(),
                            value: ValueDocument::new(&item.value, pool),
                        })
                        .collect(),
                }),
            ),
        };
        Self {
            id,
            name: package
                .key_strings()
                .resolve(entry.key)
                .unwrap_or_default()
                .to_string(),
            flags: entry.flags.0,
            value,
            bag,
        }
    }

    fn to_entry(&self, package: &mut PackageBlock, pool: &mut StringPool) -> Result<Entry> {
        let key = package.key_strings_mut().get_or_create(&self.name);
        let mut entry = match (&self.value, &self.bag) {
            (_, Some(bag)) => Entry::new_bag(
                key,
                ResTableRef::from(bag.parent),
                bag.items
                    .iter()
                    .map(|item| -> Result<ResTableMap> {
                        Ok(ResTableMap {
                            name: ResTableRef::from(item.name),
                            value: item.value.to_value(pool)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            (Some(value), None) => Entry::new(key, value.to_value(pool)?),
            (None, None) => {
                return Err(ArscError::Document(format!(
                    "entry {:?} has neither a value nor a bag",
                    self.name
                )))
            }
        };
        let complex = entry.is_complex();
        entry.flags = EntryFlags(self.flags);
        entry.flags.set(EntryFlags::COMPLEX, complex);
        Ok(entry)
    }
}

impl TableBlock {
    pub fn to_document(&self) -> TableDocument {
        let pool = self.string_pool();
        let styled_strings = (0..pool.len())
            .filter(|index| !pool.styles(*index).is_empty())
            .filter_map(|index| {
                Some(StyledStringDocument {
                    text: pool.get(index)?.to_string(),
                    spans: pool
                        .styles(index)
                        .iter()
                        .map(|span| SpanDocument {
                            tag: pool.resolve(span.name).unwrap_or_default().to_string(),
                            first: span.first_char,
                            last: span.last_char,
                        })
                        .collect(),
                })
            })
            .collect();

        let packages = self
            .packages()
            .iter()
            .map(|package| PackageDocument {
                id: package.id(),
                name: package.name().to_string(),
                types: package
                    .type_blocks()
                    .map(|block| TypeDocument {
                        id: block.id(),
                        name: package.type_name(block.id()).map(str::to_string),
                        config: ConfigDocument {
                            qualifiers: block.config().to_string(),
                            raw: block.config().raw().to_vec(),
                        },
                        entries: block
                            .entries()
                            .iter_non_null()
                            .map(|(id, entry)| EntryDocument::new(id as u16, entry, package, pool))
                            .collect(),
                    })
                    .collect(),
                staged_aliases: package
                    .staged_aliases()
                    .map(|alias| StagedAliasDocument {
                        staged: alias.staged_res_id,
                        finalized: alias.finalized_res_id,
                    })
                    .collect(),
            })
            .collect();

        TableDocument {
            packages,
            styled_strings,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Builds a table from a document through the editing API, then refreshes it.
    pub fn from_document(document: &TableDocument) -> Result<Self> {
        let mut table = TableBlock::new();
        let mut pool = StringPool::new(true);
        for styled in &document.styled_strings {
            let spans = styled
                .spans
                .iter()
                .map(|span| ResStringPoolSpan {
                    name: pool.get_or_create(&span.tag),
                    first_char: span.first,
                    last_char: span.last,
                })
                .collect();
            pool.push_styled(styled.text.clone(), spans);
        }

        for package_doc in &document.packages {
            let mut package = PackageBlock::new(package_doc.id, &package_doc.name)?;
            for type_doc in &package_doc.types {
                if let Some(name) = &type_doc.name {
                    package.set_type_name(type_doc.id, name);
                }
                let config = ResConfig::from_raw(type_doc.config.raw.clone());
                package.get_or_create_type_block(type_doc.id, &config);
                for entry_doc in &type_doc.entries {
                    let entry = entry_doc.to_entry(&mut package, &mut pool)?;
                    package
                        .get_or_create_type_block(type_doc.id, &config)
                        .entries_mut()
                        .set(entry_doc.id as usize, entry);
                }
            }
            for alias in &package_doc.staged_aliases {
                package.add_staged_alias(StagedAliasEntry {
                    staged_res_id: alias.staged,
                    finalized_res_id: alias.finalized,
                });
            }
            package.rebuild_entry_groups();
            table.packages_mut().push(package);
        }

        *table.string_pool_mut() = pool;
        table.refresh();
        Ok(table)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: TableDocument = serde_json::from_str(json)?;
        Self::from_document(&document)
    }
}
