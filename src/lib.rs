//! Rule-based stacking of photo/video assets.
//!
//! `assetstack` takes a flat list of asset records plus a criteria
//! configuration, clusters the assets that are variants of the same capture
//! (RAW + JPEG pairs, burst frames, edited copies...) into [`Stack`]s, and orders
//! every stack so that element 0 is the preferred cover.
//!
//! ```
//! use assetstack::{Asset, stack};
//!
//! let assets = vec![
//!     Asset::new("a1", "IMG_2482.jpg").taken_at("2023-06-01T10:00:00.000Z"),
//!     Asset::new("a2", "IMG_2482.cr2").taken_at("2023-06-01T10:00:00.000Z"),
//!     Asset::new("a3", "IMG_2483.jpg").taken_at("2023-06-01T10:05:00.000Z"),
//! ];
//!
//! let stacks = stack(&assets, "", "", "").unwrap();
//! assert_eq!(stacks.len(), 1);
//! assert_eq!(stacks[0].primary().original_file_name, "IMG_2482.jpg");
//! ```
//!
//! The engine performs no I/O. See [`api`](crate::stack_with) for the entry
//! points and `engine.rs` for how the stages fit together.

extern crate self as assetstack;

#[macro_use]
mod macros;
mod api;
mod criteria;
mod engine;
mod error;


pub use api::{Options, RunDetails, StackRun, Stacker, stack, stack_verbose_with, stack_with};
pub use criteria::{
    CriteriaConfig, CriteriaGroup, Criterion, DEFAULT_CRITERIA, Delta, Expression, FieldKey, GroupOperator, RegexSpec,
    Split,
};
pub use engine::{CriteriaFeatures, Evaluator, PromoteList, PromoteTokens, RegexPromotions, StackSorter, extract};
pub use error::{Error, Result};

use serde::{Deserialize, Deserializer, Serialize};

// --- Assets -------------------------------------------------------------------

/// One media item, as projected from the library inventory.
///
/// Field names follow the inventory JSON (`camelCase`); missing fields default
/// to empty strings / `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Asset {
    pub id: String,
    pub original_file_name: String,
    pub original_path: String,
    pub local_date_time: String,
    pub file_created_at: String,
    pub file_modified_at: String,
    pub updated_at: String,
    pub is_archived: bool,
    pub is_favorite: bool,
    pub is_offline: bool,
    pub is_trashed: bool,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub owner_id: String,
    pub device_id: String,
    pub device_asset_id: String,
    #[serde(deserialize_with = "nullable")]
    pub library_id: String,
    #[serde(deserialize_with = "nullable")]
    pub original_mime_type: String,
    pub checksum: String,
    #[serde(deserialize_with = "nullable")]
    pub duration: String,
}

/// Raw value of an asset field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Flag(bool),
}

impl Asset {
    /// Build an asset with an id and filename; the path defaults to the filename.
    pub fn new(id: &str, original_file_name: &str) -> Self {
        Asset {
            id: id.to_string(),
            original_file_name: original_file_name.to_string(),
            original_path: original_file_name.to_string(),
            asset_type: "IMAGE".to_string(),
            ..Asset::default()
        }
    }

    pub fn taken_at(mut self, local_date_time: &str) -> Self {
        self.local_date_time = local_date_time.to_string();
        self
    }

    pub fn at_path(mut self, original_path: &str) -> Self {
        self.original_path = original_path.to_string();
        self
    }

    /// Read a field by key.
    pub fn field(&self, key: FieldKey) -> FieldValue<'_> {
        match key {
            FieldKey::Id => FieldValue::Text(&self.id),
            FieldKey::OriginalFileName => FieldValue::Text(&self.original_file_name),
            FieldKey::OriginalPath => FieldValue::Text(&self.original_path),
            FieldKey::LocalDateTime => FieldValue::Text(&self.local_date_time),
            FieldKey::FileCreatedAt => FieldValue::Text(&self.file_created_at),
            FieldKey::FileModifiedAt => FieldValue::Text(&self.file_modified_at),
            FieldKey::UpdatedAt => FieldValue::Text(&self.updated_at),
            FieldKey::IsArchived => FieldValue::Flag(self.is_archived),
            FieldKey::IsFavorite => FieldValue::Flag(self.is_favorite),
            FieldKey::IsOffline => FieldValue::Flag(self.is_offline),
            FieldKey::IsTrashed => FieldValue::Flag(self.is_trashed),
            FieldKey::Type => FieldValue::Text(&self.asset_type),
            FieldKey::OwnerId => FieldValue::Text(&self.owner_id),
            FieldKey::DeviceId => FieldValue::Text(&self.device_id),
            FieldKey::DeviceAssetId => FieldValue::Text(&self.device_asset_id),
            FieldKey::LibraryId => FieldValue::Text(&self.library_id),
            FieldKey::OriginalMimeType => FieldValue::Text(&self.original_mime_type),
            FieldKey::Checksum => FieldValue::Text(&self.checksum),
            FieldKey::Duration => FieldValue::Text(&self.duration),
        }
    }

    /// The filename with any directory part removed.
    pub fn bare_file_name(&self) -> &str {
        let name = self.original_file_name.as_str();
        match name.rfind(['/', '\\']) {
            Some(pos) => &name[pos + 1..],
            None => name,
        }
    }
}

fn nullable<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// --- Stacks -------------------------------------------------------------------

/// Two or more assets recognized as one capture. Element 0 is the primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stack {
    pub assets: Vec<Asset>,
}

impl Stack {
    pub(crate) fn new(assets: Vec<Asset>) -> Self {
        debug_assert!(assets.len() >= 2, "a stack holds at least two assets");
        Stack { assets }
    }

    pub fn primary(&self) -> &Asset {
        &self.assets[0]
    }

    /// Every asset except the primary, in order.
    pub fn children(&self) -> &[Asset] {
        &self.assets[1..]
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.assets.iter().map(|a| a.id.as_str()).collect()
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.assets.iter().map(|a| a.original_file_name.as_str()).collect()
    }
}
