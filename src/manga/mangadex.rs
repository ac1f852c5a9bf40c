use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use mangadex_api::{
    utils::download::chapter::{AtHomePreDownloadImageData, DownloadMode},
    MangaDexClient,
};
use mangadex_api_types_rust::{Language, MangaFeedSortOrder, OrderDirection};
use std::{collections::HashMap, str::FromStr, sync::Mutex};
use uuid::Uuid;

use super::{
    source::{add_chapter, ChapterList, MangaEntry, Source},
    Chapter, Page,
};

const CHAPTER_LIMIT: u32 = 500; // Max that the mangadex api allows

pub struct MangaDex {
    client: MangaDexClient,
    translated_language: Language,
    /// MangaDex@Home images of the listed pages, by page url.
    images: Mutex<HashMap<String, AtHomePreDownloadImageData>>,
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::from_str(id).with_context(|| format!("{:?} is not a MangaDex id", id))
}

impl MangaDex {
    pub fn new(translated_language: Language) -> Result<Self> {
        Ok(Self {
            client: MangaDexClient::default(),
            translated_language,
            images: Mutex::new(HashMap::new()),
        })
    }

    fn image(&self, page: &Page) -> Result<AtHomePreDownloadImageData> {
        self.images
            .lock()
            .map_err(|_| anyhow!("The MangaDex page list is poisoned"))?
            .get(&page.location)
            .cloned()
            .with_context(|| format!("Page {} was not listed by MangaDex", page.location))
    }
}

#[async_trait]
impl Source for MangaDex {
    fn name(&self) -> &'static str {
        "MangaDex"
    }

    async fn search(&self, title: &str) -> Result<Vec<MangaEntry>> {
        let search_data = self
            .client
            .search()
            .manga()
            .title(title)
            .available_translated_language(vec![self.translated_language])
            .build()?
            .send()
            .await?;

        Ok(search_data
            .data
            .into_iter()
            .map(|manga| {
                let title = manga
                    .attributes
                    .title
                    .get(&Language::English)
                    .or_else(|| manga.attributes.title.get(&Language::JapaneseRomanized))
                    .cloned()
                    .unwrap_or_else(|| manga.id.to_string());
                MangaEntry {
                    id: manga.id.to_string(),
                    title,
                }
            })
            .collect())
    }

    async fn chapters(&self, manga: &MangaEntry) -> Result<ChapterList> {
        let id = parse_id(&manga.id)?;
        let mut offset = 0;
        let mut chapters = ChapterList::new();
        loop {
            let chapters_data = self
                .client
                .manga()
                .feed()
                .manga_id(id)
                .add_translated_language(self.translated_language)
                .offset(offset)
                .limit(CHAPTER_LIMIT)
                .order(MangaFeedSortOrder::Chapter(OrderDirection::Ascending))
                .build()?
                .send()
                .await??;

            for chapter in chapters_data.data {
                if chapter.attributes.pages == 0 {
                    // Hosted on an external site
                    debug!("Skipping chapter {} without pages", chapter.id);
                    continue;
                }
                match Chapter::try_from(chapter) {
                    Ok(chapter) => add_chapter(&mut chapters, chapter),
                    Err(err) => debug!("Skipping chapter: {:#}", err),
                }
            }

            if chapters_data.limit + chapters_data.offset > chapters_data.total {
                // We do not need to paginate so
                break;
            }

            // Update the offset and paginate
            offset += CHAPTER_LIMIT;
        }
        debug!("MangaDex has {} chapters of {}", chapters.len(), manga.title);
        Ok(chapters)
    }

    async fn pages(&self, chapter: &Chapter) -> Result<Vec<Page>> {
        let file_names = self
            .client
            .download()
            .chapter(parse_id(&chapter.id)?)
            .mode(DownloadMode::Normal)
            .report(true)
            .build()?
            .build_at_home_urls()
            .await?;

        let mut pages = Vec::with_capacity(file_names.len());
        let mut images = self
            .images
            .lock()
            .map_err(|_| anyhow!("The MangaDex page list is poisoned"))?;
        for (index, image) in file_names.into_iter().enumerate() {
            let page = Page::new(index + 1, image.build_page_url()?.to_string());
            images.insert(page.location.clone(), image);
            pages.push(page);
        }
        Ok(pages)
    }

    async fn fetch_page(&self, page: &Page) -> Result<Vec<u8>> {
        let image = self.image(page)?;
        let (filename, data) = image.download().await.with_context(|| {
            format!("Attempting to download page {} ({})", page.number, page.location)
        })?;
        let data = data.with_context(|| format!("MangaDex sent no data for {}", filename))?;
        Ok(data.to_vec())
    }
}
