use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use crate::{chapter_range::ChapterNumber, library::Library};

mod chapter;
pub mod get;
mod inmanga;
mod local;
mod mangadex;
mod source;

pub use chapter::{Chapter, Page};
pub use local::Local;
pub use source::{pick_match, ChapterList, MangaEntry, Source, SourceKind};

/// A manga found in a source, with every chapter the source has.
pub struct Manga {
    source: Box<dyn Source>,
    entry: MangaEntry,
    chapters: ChapterList,
}

impl Manga {
    pub async fn fetch(source: Box<dyn Source>, entry: MangaEntry) -> Result<Self> {
        let chapters = source
            .chapters(&entry)
            .await
            .with_context(|| format!("Fetching the chapters of {} from {}", entry.title, source.name()))?;
        debug!("{} lists {} chapters", source.name(), chapters.len());
        Ok(Self {
            source,
            entry,
            chapters,
        })
    }

    pub fn title(&self) -> &str {
        &self.entry.title
    }

    /// Every chapter number the source has, sorted and without duplicates.
    pub fn available(&self) -> Vec<ChapterNumber> {
        self.chapters.keys().copied().collect()
    }

    /// Downloads the given chapters in order into the library.
    pub async fn download(&self, chapters: &[ChapterNumber], library: &Library) -> Result<()> {
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        )?;

        for number in chapters {
            let chapter = self
                .chapters
                .get(number)
                .with_context(|| format!("Chapter {} is not available", number))?;
            let heading = match &chapter.title {
                Some(chapter_title) => format!("Downloading {} {} - {}", self.title(), number, chapter_title),
                None => format!("Downloading {} {}", self.title(), number),
            };
            println!("{}", heading.yellow().bold());

            let bar = ProgressBar::new(0)
                .with_message("Downloading Pages")
                .with_style(style.clone());
            chapter
                .download(self.source.as_ref(), library, self.title(), &bar)
                .await
                .with_context(|| {
                    format!(
                        "Attempting to download chapter {}, with an ID of {}",
                        number, chapter.id
                    )
                })?;
            bar.finish_with_message("Downloaded Pages");
        }
        Ok(())
    }
}
