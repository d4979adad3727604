//! Item catalog use case.

use crate::asset::AssetUrlBuilder;
use crate::model::item::CatalogItem;
use crate::repo::item_repo::ItemRepository;
use crate::repo::point_repo::RepoResult;

pub struct ItemCatalogService<R: ItemRepository> {
    repo: R,
    urls: AssetUrlBuilder,
}

impl<R: ItemRepository> ItemCatalogService<R> {
    pub fn new(repo: R, urls: AssetUrlBuilder) -> Self {
        Self { repo, urls }
    }

    /// Lists the catalog with item images rewritten to URLs.
    pub fn list_items(&self) -> RepoResult<Vec<CatalogItem>> {
        let items = self.repo.list_items()?;
        Ok(items
            .into_iter()
            .map(|item| CatalogItem {
                image_url: self.urls.url_for(&item.image),
                id: item.id,
                title: item.title,
            })
            .collect())
    }
}
