//! Category repository.
//!
//! Categories are read on every menu tap, so reads go through a short-lived
//! cache. Settings writes are a single `$set` of one platform sub-document;
//! two concurrent writers to the same category can lose an update.

use anyhow::{Context, Result};
use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{Document, doc};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use tracing::debug;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::Database;
use crate::database::models::{
    Category, Platform, PlatformImageSettings, SelectorField, SettingsPatch,
};

/// Repository for categories and their settings blob.
pub struct CategoryRepository {
    collection: Collection<Category>,
    counters: Collection<Document>,
    cache: TypedCache<i64, Category>,
}

impl CategoryRepository {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            collection: db.collection("categories"),
            counters: db.collection("counters"),
            cache: cache.get_or_create("categories", CacheConfig::categories()),
        }
    }

    /// Allocate the next sequential category id.
    async fn next_id(&self) -> Result<i64> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters
            .find_one_and_update(doc! { "_id": "category_id" }, doc! { "$inc": { "seq": 1_i64 } })
            .with_options(options)
            .await?
            .context("category counter upsert returned no document")?;

        Ok(counter.get_i64("seq")?)
    }

    /// Create a category owned by `owner_id`.
    pub async fn create(&self, owner_id: i64, name: &str) -> Result<Category> {
        let category_id = self.next_id().await?;
        let mut category = Category::new(category_id, owner_id, name);

        let result = self.collection.insert_one(&category).await?;
        category.id = result.inserted_id.as_object_id();

        self.cache.insert(category_id, category.clone());
        debug!("Created category {} for owner {}", category_id, owner_id);
        Ok(category)
    }

    /// Get a category by id (cache first).
    pub async fn get(&self, category_id: i64) -> Result<Option<Category>> {
        if let Some(category) = self.cache.get(&category_id) {
            return Ok(Some(category));
        }

        let category = self.get_from_db(category_id).await?;
        if let Some(c) = &category {
            self.cache.insert(category_id, c.clone());
        }
        Ok(category)
    }

    async fn get_from_db(&self, category_id: i64) -> Result<Option<Category>> {
        let filter = doc! { "category_id": category_id };
        Ok(self.collection.find_one(filter).await?)
    }

    /// All categories of an owner, oldest first.
    pub async fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Category>> {
        let filter = doc! { "owner_id": owner_id };
        let mut categories: Vec<Category> = self.collection.find(filter).await?.try_collect().await?;
        categories.sort_by_key(|c| c.category_id);
        Ok(categories)
    }

    /// Platform settings with defaults applied. Never writes.
    pub async fn get_platform_settings(
        &self,
        category_id: i64,
        platform: Platform,
    ) -> Result<Option<PlatformImageSettings>> {
        Ok(self
            .get(category_id)
            .await?
            .map(|c| c.platform_settings(platform)))
    }

    /// Read-modify-write the fields present in `patch`.
    ///
    /// Returns the stored settings, or `None` if the category does not exist.
    pub async fn save_platform_settings(
        &self,
        category_id: i64,
        platform: Platform,
        patch: SettingsPatch,
    ) -> Result<Option<PlatformImageSettings>> {
        if patch.is_empty() {
            return self.get_platform_settings(category_id, platform).await;
        }
        self.modify(category_id, platform, |settings| settings.apply(patch))
            .await
    }

    /// Toggle one preset code in a selector field.
    pub async fn toggle_selector(
        &self,
        category_id: i64,
        platform: Platform,
        field: SelectorField,
        code: &str,
    ) -> Result<Option<PlatformImageSettings>> {
        self.modify(category_id, platform, |settings| {
            settings.toggle(field, code);
        })
        .await
    }

    /// Reset a selector to "random" (formats to the recommended one).
    pub async fn clear_selector(
        &self,
        category_id: i64,
        platform: Platform,
        field: SelectorField,
    ) -> Result<Option<PlatformImageSettings>> {
        self.save_platform_settings(category_id, platform, SettingsPatch::selector(field, Vec::new()))
            .await
    }

    async fn modify<F>(
        &self,
        category_id: i64,
        platform: Platform,
        f: F,
    ) -> Result<Option<PlatformImageSettings>>
    where
        F: FnOnce(&mut PlatformImageSettings),
    {
        // Fresh read: the cached copy may predate another writer.
        let Some(mut category) = self.get_from_db(category_id).await? else {
            self.cache.invalidate(&category_id);
            return Ok(None);
        };

        let mut settings = category.platform_settings(platform);
        f(&mut settings);

        let key = format!("settings.{}", platform.settings_key());
        self.collection
            .update_one(
                doc! { "category_id": category_id },
                doc! { "$set": { key: settings.to_document() } },
            )
            .await?;

        category.set_platform_settings(&settings);
        self.cache.insert(category_id, category);
        debug!("Saved {} image settings for category {}", platform.key(), category_id);

        Ok(Some(settings))
    }
}
