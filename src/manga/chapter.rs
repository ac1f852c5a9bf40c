use anyhow::{Context, Result};
use colored::Colorize;
use futures::{stream, StreamExt};
use indicatif::ProgressBar;
use mangadex_api_schema_rust::{v5::ChapterAttributes, ApiObject};

use super::Source;
use crate::{
    chapter_range::ChapterNumber,
    console::plural,
    library::{extension_of, Library},
};

/// Pages of a chapter downloaded at the same time.
const CONCURRENT_PAGES: usize = 5;

#[derive(Debug, Clone)]
pub struct Chapter {
    pub number: ChapterNumber,
    /// What the source needs to find the chapter again: an id, a url or a folder.
    pub id: String,
    pub title: Option<String>,
}

/// A page of a chapter, `location` is a url or a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub location: String,
    pub extension: String,
}

impl Page {
    pub fn new(number: usize, location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            number,
            extension: extension_of(&location),
            location,
        }
    }
}

impl<T> TryFrom<ApiObject<ChapterAttributes, T>> for Chapter {
    type Error = anyhow::Error;

    fn try_from(value: ApiObject<ChapterAttributes, T>) -> Result<Self, Self::Error> {
        let number: ChapterNumber = match value.attributes.chapter {
            Some(ch) => ch.parse().with_context(|| {
                format!(
                    "Unable to parse {:?} as a chapter number for chapter {}.",
                    ch, &value.id
                )
            })?,
            None => anyhow::bail!("No Chapter number for {}", &value.id),
        };

        Ok(Chapter {
            number,
            id: value.id.to_string(),
            title: Some(value.attributes.title).filter(|title| !title.is_empty()),
        })
    }
}

impl Chapter {
    pub fn new(number: ChapterNumber, id: impl Into<String>) -> Self {
        Self {
            number,
            id: id.into(),
            title: None,
        }
    }

    /// Downloads the pages of the chapter into the library, skipping the
    /// pages already there.
    pub async fn download(
        &self,
        source: &dyn Source,
        library: &Library,
        manga_title: &str,
        bar: &ProgressBar,
    ) -> Result<()> {
        let pages = source
            .pages(self)
            .await
            .with_context(|| format!("Listing the pages of chapter {}", self.number))?;
        bar.set_length(pages.len() as u64);

        let results = stream::iter(pages)
            .map(|page| async move {
                let path = library.page_path(manga_title, self.number, page.number, &page.extension);
                if Library::exists(&path).await? {
                    bar.inc(1);
                    return anyhow::Ok(false);
                }
                let data = source.fetch_page(&page).await.with_context(|| {
                    format!("Downloading page {} of chapter {}", page.number, self.number)
                })?;
                Library::write(&path, &data).await?;
                bar.inc(1);
                anyhow::Ok(true)
            })
            .buffer_unordered(CONCURRENT_PAGES)
            .collect::<Vec<Result<bool>>>()
            .await;

        let downloaded = results.into_iter().collect::<Result<Vec<bool>>>()?;
        let existing = downloaded.iter().filter(|downloaded| !**downloaded).count();
        if existing > 0 {
            bar.println(
                format!("{} page{} already existed", existing, plural(existing))
                    .yellow()
                    .to_string(),
            );
        }
        Ok(())
    }
}
