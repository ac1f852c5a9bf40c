use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;
use mangadex_api_types_rust::Language;
use std::collections::BTreeMap;

use super::{chapter::Chapter, inmanga::InManga, mangadex::MangaDex, Page};
use crate::{chapter_range::ChapterNumber, console::Abort, library::encode};

/// Chapters of a manga by number. One entry per number, the first chapter a
/// source lists for a number is kept.
pub type ChapterList = BTreeMap<ChapterNumber, Chapter>;

/// A search result of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MangaEntry {
    pub id: String,
    pub title: String,
}

/// Somewhere manga can be found and read from.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, title: &str) -> Result<Vec<MangaEntry>>;

    async fn chapters(&self, manga: &MangaEntry) -> Result<ChapterList>;

    /// The pages of a chapter in reading order.
    async fn pages(&self, chapter: &Chapter) -> Result<Vec<Page>>;

    async fn fetch_page(&self, page: &Page) -> Result<Vec<u8>>;
}

/// Adds a chapter unless one with the same number was already listed.
pub fn add_chapter(chapters: &mut ChapterList, chapter: Chapter) {
    chapters.entry(chapter.number).or_insert(chapter);
}

/// The online sources, in the order they are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Mangadex,
    Inmanga,
}

impl SourceKind {
    pub fn build(self, translated_language: Language) -> Result<Box<dyn Source>> {
        Ok(match self {
            SourceKind::Mangadex => Box::new(MangaDex::new(translated_language)?),
            SourceKind::Inmanga => Box::new(InManga::new()?),
        })
    }
}

fn same_title(a: &str, b: &str) -> bool {
    encode(a.trim()).to_uppercase() == encode(b.trim()).to_uppercase()
}

/// Picks the search result the user meant: an exact title match, or the only
/// result there is.
pub fn pick_match(title: &str, mut results: Vec<MangaEntry>) -> Result<MangaEntry> {
    if let Some(index) = results.iter().position(|result| same_title(&result.title, title)) {
        return Ok(results.swap_remove(index));
    }
    match results.len() {
        0 => Err(Abort::new(format!("Manga '{}' not found", title)).into()),
        1 => Ok(results.remove(0)),
        _ => {
            let titles: Vec<String> = results
                .iter()
                .map(|result| result.title.to_uppercase())
                .collect();
            Err(Abort::new(format!(
                "There are several results, please select one of these:\n{}",
                titles.join("\n")
            ))
            .into())
        }
    }
}
