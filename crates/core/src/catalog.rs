//! Garment catalog.
//!
//! The catalog merges the built-in garments (a static JSON resource) with
//! the garments a user uploaded earlier (kept in local storage). User
//! garments always come first. Only user garments are ever written back.

use crate::codec::ImageCodec;
use crate::error::{AppError, Result};
use crate::fetch::ResourceFetcher;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Storage key holding the JSON array of user garments.
pub const USER_GARMENTS_KEY: &str = "user_garments";

/// Group label for garments without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Where a garment's image comes from.
///
/// On the wire this is a single `src` string; the `data:` prefix of the
/// encoded form is only inspected when parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GarmentSource {
    /// A static resource shipped with the catalog.
    BuiltIn { url: String },
    /// A self-contained data URL produced from a user upload.
    UserUploaded { encoded: String },
}

impl GarmentSource {
    pub fn is_user_uploaded(&self) -> bool {
        matches!(self, Self::UserUploaded { .. })
    }
}

impl From<String> for GarmentSource {
    fn from(src: String) -> Self {
        if ImageCodec::is_encoded(&src) {
            Self::UserUploaded { encoded: src }
        } else {
            Self::BuiltIn { url: src }
        }
    }
}

impl From<GarmentSource> for String {
    fn from(source: GarmentSource) -> Self {
        match source {
            GarmentSource::BuiltIn { url } => url,
            GarmentSource::UserUploaded { encoded } => encoded,
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Garment {
    /// Fixed for built-ins, creation time in epoch milliseconds for uploads.
    pub id: i64,
    pub name: String,
    pub src: GarmentSource,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Garment {
    /// The grouping label, with an empty category folded into [`UNCATEGORIZED`].
    pub fn category_label(&self) -> &str {
        if self.category.is_empty() { UNCATEGORIZED } else { &self.category }
    }

    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.category.to_lowercase().contains(needle)
    }
}

/// The ordered garment collection plus the storage it persists to.
pub struct GarmentCatalog<S: KeyValueStore> {
    garments: Vec<Garment>,
    storage: S,
}

impl<S: KeyValueStore> GarmentCatalog<S> {
    pub fn new(storage: S) -> Self {
        Self {
            garments: Vec::new(),
            storage,
        }
    }

    /// Loads built-in garments from `location` and merges persisted user
    /// garments in front of them.
    ///
    /// Persisted garments that are missing or unreadable count as none.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::CatalogLoad`] if the built-in catalog cannot be
    /// fetched or parsed. The collection then holds the user garments only.
    pub async fn load<F: ResourceFetcher>(&mut self, fetcher: &F, location: &str) -> Result<()> {
        let mut merged = self.read_user_garments();

        let built_in = match Self::fetch_built_in(fetcher, location).await {
            Ok(garments) => garments,
            Err(e) => {
                self.garments = merged;
                return Err(e);
            }
        };

        tracing::debug!(
            user = merged.len(),
            built_in = built_in.len(),
            "catalog loaded"
        );
        merged.extend(built_in);
        self.garments = merged;
        Ok(())
    }

    async fn fetch_built_in<F: ResourceFetcher>(fetcher: &F, location: &str) -> Result<Vec<Garment>> {
        let resource = fetcher
            .fetch(location)
            .await
            .map_err(|e| AppError::catalog(e.to_string()))?;

        serde_json::from_slice(&resource.bytes)
            .map_err(|e| AppError::catalog(format!("Invalid catalog document: {}", e)))
    }

    fn read_user_garments(&self) -> Vec<Garment> {
        let saved = match self.storage.get(USER_GARMENTS_KEY) {
            Ok(Some(saved)) => saved,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read saved garments: {}", e);
                return Vec::new();
            }
        };

        serde_json::from_str(&saved).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable saved garments: {}", e);
            Vec::new()
        })
    }

    /// Prepends a garment and persists the user subset.
    pub fn add(&mut self, garment: Garment) {
        // Ids share one space with built-ins; a clash is reported, not resolved.
        if self.get(garment.id).is_some() {
            tracing::warn!(id = garment.id, "garment id already present in catalog");
        }
        self.garments.insert(0, garment);
        self.persist();
    }

    /// Writes the user-uploaded garments to storage, in catalog order.
    ///
    /// Nothing is written while there are no user garments. Storage
    /// failures are logged and otherwise ignored.
    pub fn persist(&mut self) {
        if let Err(e) = self.try_persist() {
            tracing::warn!("Failed to save user garments: {}", e);
        }
    }

    fn try_persist(&mut self) -> Result<()> {
        let user: Vec<&Garment> = self.user_garments().collect();
        if user.is_empty() {
            return Ok(());
        }
        let json = serde_json::to_string(&user).map_err(|e| AppError::storage(e.to_string()))?;
        self.storage
            .set(USER_GARMENTS_KEY, &json)
            .map_err(|e| match e {
                AppError::StoragePersist(_) => e,
                other => AppError::storage(other.to_string()),
            })
    }

    pub fn garments(&self) -> &[Garment] {
        &self.garments
    }

    pub fn get(&self, id: i64) -> Option<&Garment> {
        self.garments.iter().find(|g| g.id == id)
    }

    pub fn user_garments(&self) -> impl Iterator<Item = &Garment> {
        self.garments.iter().filter(|g| g.src.is_user_uploaded())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Case-insensitive substring match on name or category.
    ///
    /// An empty term matches everything.
    pub fn search(&self, term: &str) -> Vec<&Garment> {
        let needle = term.to_lowercase();
        if needle.is_empty() {
            return self.garments.iter().collect();
        }
        self.garments.iter().filter(|g| g.matches(&needle)).collect()
    }

    /// Search results grouped by category label, keys in sorted order.
    pub fn grouped(&self, term: &str) -> BTreeMap<String, Vec<&Garment>> {
        let mut groups: BTreeMap<String, Vec<&Garment>> = BTreeMap::new();
        for garment in self.search(term) {
            groups
                .entry(garment.category_label().to_string())
                .or_default()
                .push(garment);
        }
        groups
    }
}
