use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::path::Path;
use tokio::fs;

use super::{
    source::{add_chapter, ChapterList, MangaEntry, Source},
    Chapter, Page,
};
use crate::{
    chapter_range::ChapterNumber,
    library::{encode, Library},
};

/// The chapters already downloaded into a library, used offline.
pub struct Local {
    library: Library,
}

/// A folder matches a title when their encoded forms are equal or one contains the other.
fn titles_match(title: &str, folder: &str) -> bool {
    let title = encode(title.trim()).to_uppercase();
    let folder = encode(folder.trim()).to_uppercase();
    !title.is_empty() && (title.contains(&folder) || folder.contains(&title))
}

impl Local {
    pub fn new(library: Library) -> Self {
        Self { library }
    }
}

#[async_trait]
impl Source for Local {
    fn name(&self) -> &'static str {
        "Local"
    }

    async fn search(&self, title: &str) -> Result<Vec<MangaEntry>> {
        Ok(Library::folders(self.library.root())
            .await?
            .into_iter()
            .filter(|(name, _)| titles_match(title, name))
            .map(|(name, _)| MangaEntry {
                id: name.clone(),
                title: name,
            })
            .collect())
    }

    async fn chapters(&self, manga: &MangaEntry) -> Result<ChapterList> {
        let mut chapters = ChapterList::new();
        for (name, path) in Library::folders(&self.library.manga_dir(&manga.id)).await? {
            match name.parse::<ChapterNumber>() {
                Ok(number) => {
                    add_chapter(&mut chapters, Chapter::new(number, path.to_string_lossy()))
                }
                Err(err) => debug!("Skipping folder {:?}: {}", path, err),
            }
        }
        Ok(chapters)
    }

    async fn pages(&self, chapter: &Chapter) -> Result<Vec<Page>> {
        Ok(Library::pages(Path::new(&chapter.id))
            .await?
            .into_iter()
            .map(|(number, path)| Page::new(number, path.to_string_lossy()))
            .collect())
    }

    async fn fetch_page(&self, page: &Page) -> Result<Vec<u8>> {
        fs::read(&page.location)
            .await
            .with_context(|| format!("Reading {}", page.location))
    }
}
