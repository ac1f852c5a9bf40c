use super::{pick_match, Local, Manga, MangaEntry, Source, SourceKind};
use crate::{
    chapter_range::{
        format_intervals, group_contiguous, parse_selection, resolve, ChapterNumber,
        IntervalFormat, Resolution, CHAPTERS_FORMAT,
    },
    console::{self, plural, Abort},
    convert::{self, Format, Options, PROFILES},
    library::{Library, DEFAULT_ROOT},
    version,
};
use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use log::warn;
use mangadex_api_types_rust::Language;
use std::path::PathBuf;

/// Download manga chapters and convert them for your e-reader
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct GetManga {
    /// The title of the manga to download
    #[arg(required = true)]
    pub manga: Vec<String>,

    /// Chapters to download, all of them by default
    #[arg(long, visible_alias = "chapter", num_args = 1.., long_help = CHAPTERS_FORMAT)]
    pub chapters: Option<Vec<String>>,

    /// Where chapters and converted files are saved
    #[arg(short, long, default_value = DEFAULT_ROOT)]
    pub directory: PathBuf,

    /// Merge every chapter into a single file
    #[arg(short, long)]
    pub single: bool,

    /// Rotate double pages instead of splitting them
    #[arg(short, long)]
    pub rotate: bool,

    /// The device profile used when converting
    #[arg(short, long, default_value = convert::DEFAULT_PROFILE, value_parser = PROFILES)]
    pub profile: String,

    /// The format of the converted file
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = Format::Mobi)]
    pub format: Format,

    /// Do not stretch images to the screen size
    #[arg(long)]
    pub fullsize: bool,

    /// Use the chapters already downloaded instead of searching online
    #[arg(long)]
    pub cache: bool,

    /// Remove the alpha channel of images before making a PDF
    #[arg(long)]
    pub remove_alpha: bool,

    /// Only search this source
    #[arg(long, value_enum, ignore_case = true)]
    pub source: Option<SourceKind>,

    /// The language we get the manga translated into
    #[arg(long, default_value = "en")]
    pub translated_language: Language,

    /// Do not check for a newer version
    #[arg(long)]
    pub no_update_check: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

/// Matches the selection, or every chapter when there is none, against the
/// chapters available.
pub fn plan(available: &[ChapterNumber], chapters: Option<&[String]>) -> Result<Resolution> {
    let last = available.last().copied().unwrap_or(ChapterNumber::ZERO);
    let requested = match chapters {
        Some(selection) => {
            parse_selection(&selection.join(" "), last, &IntervalFormat::SELECTION)?
        }
        None => group_contiguous(available),
    };
    Ok(resolve(available, &requested))
}

impl GetManga {
    pub fn title(&self) -> String {
        self.manga.join(" ").trim().to_string()
    }

    fn options(&self) -> Options {
        Options {
            format: self.format,
            profile: self.profile.clone(),
            single: self.single,
            rotate: self.rotate,
            fullsize: self.fullsize,
            remove_alpha: self.remove_alpha,
        }
    }

    fn sources(&self) -> Vec<SourceKind> {
        match self.source {
            Some(source) => vec![source],
            None => vec![SourceKind::Mangadex, SourceKind::Inmanga],
        }
    }

    pub async fn run(&self) -> Result<()> {
        if !self.cache && !self.no_update_check {
            version::check().await;
        }

        let library = Library::new(&self.directory);
        let title = self.title();
        let place = if self.cache {
            format!("in {}", self.directory.display())
        } else {
            "online".to_string()
        };
        println!("{}", format!("Searching '{}' {}...", title, place).dimmed());

        let manga = self.find(&library, &title).await?;
        println!("{}", manga.title().blue().bold());

        let available = manga.available();
        if available.is_empty() {
            return Err(Abort::new(format!(
                "There are no chapters of '{}' available {}",
                manga.title(),
                place
            ))
            .into());
        }

        let Resolution { found, missing } = plan(&available, self.chapters.as_deref())?;

        if self.cache {
            if let Some(last) = available.last() {
                println!("Last downloaded chapter: {}", last);
            }
        } else {
            println!(
                "{} chapter{} will be downloaded - Cancel with Ctrl+C",
                found.len(),
                plural(found.len())
            );
        }

        if !missing.is_empty() {
            let reason = if self.cache {
                "are not downloaded"
            } else {
                "could not be found"
            };
            println!(
                "{}",
                format!(
                    "The following chapters {}: {}",
                    reason,
                    format_intervals(&missing, &IntervalFormat::REPORT)
                )
                .red()
            );
            if self.cache {
                return Err(Abort::new("Please download those chapters first.")
                    .with_tip("Try again this command without --cache")
                    .into());
            }
            console::confirm("🖐️  Press enter to continue without those chapters or Ctrl+C to abort...")
                .await?;
        }

        if found.is_empty() {
            return Err(Abort::new("No chapters found").into());
        }

        if !self.cache {
            manga.download(&found, &library).await?;
        }
        convert::convert(&library, manga.title(), &found, &self.options()).await
    }

    /// The manga in the library when offline, otherwise in the first source
    /// that has it.
    async fn find(&self, library: &Library, title: &str) -> Result<Manga> {
        if self.cache {
            let local: Box<dyn Source> = Box::new(Local::new(library.clone()));
            let entry = pick_match(title, local.search(title).await?)?;
            return Manga::fetch(local, entry).await;
        }

        let mut last_error = None;
        for kind in self.sources() {
            match self.search(kind, title).await {
                Ok(Some((source, entry))) => return Manga::fetch(source, entry).await,
                Ok(None) => {}
                Err(err) => {
                    warn!("{:?} failed: {:#}", kind, err);
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| Abort::new(format!("Manga '{}' not found", title)).into()))
    }

    async fn search(
        &self,
        kind: SourceKind,
        title: &str,
    ) -> Result<Option<(Box<dyn Source>, MangaEntry)>> {
        let source = kind.build(self.translated_language)?;
        let results = source.search(title).await?;
        if results.is_empty() {
            return Ok(None);
        }
        let entry = pick_match(title, results)?;
        Ok(Some((source, entry)))
    }
}
