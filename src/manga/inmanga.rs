use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use scraper::{Html, Selector};
use serde::Deserialize;

use super::{
    source::{add_chapter, ChapterList, MangaEntry, Source},
    Chapter, Page,
};
use crate::chapter_range::ChapterNumber;

const PROVIDER_WEBSITE: &str = "https://inmanga.com";
const SEARCH_URL: &str = "https://inmanga.com/manga/getMangasConsultResult";
const CONSULT_URL: &str = "https://inmanga.com/manga/consult?suggestion=";
const CHAPTERS_URL: &str = "https://inmanga.com/chapter/getall?mangaIdentification=";
const CHAPTER_PAGES_URL: &str = "https://inmanga.com/chapter/chapterIndexControls?identification=";
const IMAGE_URL: &str = "https://inmanga.com/page/getPageImage/?identification=";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10_1) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/39.0.2171.95 Safari/537.36";

const RESULT_SELECTOR: &str = "a[href]";
const RESULT_TITLE_SELECTOR: &str = "h4";
const PAGE_LIST_SELECTOR: &str = "#PageList > *";

pub struct InManga {
    http: reqwest::Client,
}

/// The chapter list is a JSON string inside the `data` field.
#[derive(Debug, Deserialize)]
struct ChaptersEnvelope {
    data: String,
}

#[derive(Debug, Deserialize)]
struct ChaptersResult {
    result: Vec<InMangaChapter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InMangaChapter {
    number: f64,
    identification: String,
}

fn selector(selector: &'static str) -> Result<Selector> {
    Selector::parse(selector).map_err(|_| anyhow!("Invalid selector {:?}", selector))
}

fn parse_search_results(html: &str) -> Result<Vec<MangaEntry>> {
    let document = Html::parse_fragment(html);
    let title_selector = selector(RESULT_TITLE_SELECTOR)?;
    Ok(document
        .select(&selector(RESULT_SELECTOR)?)
        .filter_map(|result| {
            let href = result.value().attr("href")?;
            let id = href.trim_end_matches('/').rsplit('/').next()?;
            let title = result.select(&title_selector).next()?;
            Some(MangaEntry {
                id: id.to_string(),
                title: title.text().collect::<String>().trim().to_string(),
            })
        })
        .collect())
}

fn parse_chapters(json: &str) -> Result<ChapterList> {
    let envelope: ChaptersEnvelope = serde_json::from_str(json)?;
    let chapters: ChaptersResult = serde_json::from_str(&envelope.data)?;
    let mut list = ChapterList::new();
    for chapter in chapters.result {
        match ChapterNumber::try_from(chapter.number) {
            Ok(number) => add_chapter(&mut list, Chapter::new(number, chapter.identification)),
            Err(err) => debug!("Skipping InManga chapter {}: {}", chapter.identification, err),
        }
    }
    Ok(list)
}

fn parse_pages(html: &str) -> Result<Vec<Page>> {
    let document = Html::parse_document(html);
    let mut pages: Vec<Page> = document
        .select(&selector(PAGE_LIST_SELECTOR)?)
        .filter_map(|option| {
            let id = option.value().attr("value")?;
            let number = option.text().collect::<String>().trim().parse().ok()?;
            Some(Page::new(number, format!("{}{}", IMAGE_URL, id)))
        })
        .collect();
    pages.sort_by_key(|page| page.number);
    Ok(pages)
}

impl InManga {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_static(PROVIDER_WEBSITE));
        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .default_headers(headers)
                .build()?,
        })
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        Ok(self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

#[async_trait]
impl Source for InManga {
    fn name(&self) -> &'static str {
        "InManga"
    }

    async fn search(&self, title: &str) -> Result<Vec<MangaEntry>> {
        let form = [
            ("filter[generes][]", "-1"),
            ("filter[queryString]", title),
            ("filter[skip]", "0"),
            ("filter[take]", "10"),
            ("filter[sortby]", "1"),
            ("filter[broadcastStatus]", "0"),
            ("filter[onlyFavorites]", "false"),
        ];
        let html = self
            .http
            .post(SEARCH_URL)
            .header(REFERER, format!("{}{}", CONSULT_URL, title))
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_search_results(&html)
    }

    async fn chapters(&self, manga: &MangaEntry) -> Result<ChapterList> {
        let json = self.get_text(&format!("{}{}", CHAPTERS_URL, manga.id)).await?;
        parse_chapters(&json).with_context(|| format!("Reading the chapters of {}", manga.title))
    }

    async fn pages(&self, chapter: &Chapter) -> Result<Vec<Page>> {
        let html = self
            .get_text(&format!("{}{}", CHAPTER_PAGES_URL, chapter.id))
            .await?;
        parse_pages(&html)
    }

    async fn fetch_page(&self, page: &Page) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(&page.location)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
