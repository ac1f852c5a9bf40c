//! Turns downloaded chapters into e-reader files with external tools:
//! `img2pdf` for PDF and KindleComicConverter (`kcc-c2e`) for MOBI, EPUB and CBZ.

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use image::{Rgb, RgbImage, RgbaImage};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{fs, process::Command};

use crate::{
    chapter_range::{format_chapters, format_intervals, group_contiguous, ChapterNumber, IntervalFormat},
    console::Abort,
    library::Library,
};

const IMG2PDF: &str = "img2pdf";
const IMG2PDF_TIP: &str = "Install it with: pip install img2pdf";
const KCC: &str = "kcc-c2e";
const KCC_TIP: &str = "Install KindleComicConverter with: pip install KindleComicConverter";

/// Device profiles KindleComicConverter knows.
pub const PROFILES: [&str; 15] = [
    "K1", "K2", "K34", "K578", "KDX", "KPW", "KV", "KO", "KoMT", "KoG", "KoGHD", "KoA", "KoAHD",
    "KoAH2O", "KoAO",
];
pub const DEFAULT_PROFILE: &str = "KPW";

lazy_static! {
    /// What KindleComicConverter prints when it cannot read an image.
    static ref CORRUPTED_IMAGE: Regex = Regex::new(r"Image file (.*?) is corrupted").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Keep the downloaded images, no conversion
    Png,
    Pdf,
    Mobi,
    Epub,
    Cbz,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Png => "png",
            Format::Pdf => "pdf",
            Format::Mobi => "mobi",
            Format::Epub => "epub",
            Format::Cbz => "cbz",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Png => "PNG",
            Format::Pdf => "PDF",
            Format::Mobi => "MOBI",
            Format::Epub => "EPUB",
            Format::Cbz => "CBZ",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub format: Format,
    pub profile: String,
    /// One file for every chapter instead of one per chapter.
    pub single: bool,
    pub rotate: bool,
    pub fullsize: bool,
    pub remove_alpha: bool,
}

#[cfg(test)]
impl Default for Options {
    fn default() -> Self {
        Self {
            format: Format::Mobi,
            profile: DEFAULT_PROFILE.to_string(),
            single: false,
            rotate: false,
            fullsize: false,
            remove_alpha: false,
        }
    }
}

pub async fn convert(
    library: &Library,
    title: &str,
    chapters: &[ChapterNumber],
    options: &Options,
) -> Result<()> {
    match options.format {
        Format::Png => report_folders(library, title, chapters).await,
        Format::Pdf => to_pdf(library, title, chapters, options).await,
        Format::Mobi | Format::Epub | Format::Cbz => with_kcc(library, title, chapters, options).await,
    }
}

async fn done(path: &Path, info: &str) {
    let path = fs::canonicalize(path).await.unwrap_or_else(|_| path.to_path_buf());
    println!("{}", format!("DONE: {}{}", path.display(), info).green().bold());
}

async fn report_folders(library: &Library, title: &str, chapters: &[ChapterNumber]) -> Result<()> {
    match chapters {
        [chapter] => done(&library.chapter_dir(title, *chapter), "").await,
        _ => {
            let runs = format_intervals(&group_contiguous(chapters), &IntervalFormat::REPORT);
            done(&library.manga_dir(title), &format!(" ({})", runs)).await
        }
    }
    Ok(())
}

async fn chapter_pages(library: &Library, title: &str, chapter: ChapterNumber) -> Result<Vec<PathBuf>> {
    Ok(Library::pages(&library.chapter_dir(title, chapter))
        .await?
        .into_iter()
        .map(|(_, path)| path)
        .collect())
}

async fn to_pdf(
    library: &Library,
    title: &str,
    chapters: &[ChapterNumber],
    options: &Options,
) -> Result<()> {
    println!("{}", "Converting to PDF...".blue().bold());
    let mut all_pages = Vec::new();
    for &chapter in chapters {
        let pages = chapter_pages(library, title, chapter).await?;
        if options.single {
            all_pages.extend(pages);
        } else {
            let output = library.output_path(title, &chapter.to_string(), Format::Pdf.extension());
            write_pdf(&output, &pages, options.remove_alpha).await?;
        }
    }
    if options.single {
        let chapters = format_chapters(chapters, &IntervalFormat::FILE_NAME);
        let output = library.output_path(title, &chapters, Format::Pdf.extension());
        write_pdf(&output, &all_pages, options.remove_alpha).await?;
    }
    Ok(())
}

async fn write_pdf(output: &Path, pages: &[PathBuf], remove_alpha: bool) -> Result<()> {
    if Library::exists(output).await? {
        println!("{}", format!("{} - Already exists", output.display()).yellow());
        return Ok(());
    }
    if remove_alpha {
        println!(
            "{}",
            format!("Removing alpha channel from images for {}", output.display()).dimmed()
        );
        for page in pages {
            remove_alpha_channel(page.clone()).await?;
        }
    }
    let mut command = Command::new(IMG2PDF);
    command.arg("-o").arg(output).args(pages);
    run_tool(command, IMG2PDF_TIP).await?;
    done(output, "").await;
    Ok(())
}

/// Puts a transparent image over a white background.
pub fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

async fn remove_alpha_channel(path: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let image = image::open(&path).with_context(|| format!("Opening {:?}", path))?;
        if !image.color().has_alpha() {
            return Ok(());
        }
        debug!("Removing the alpha channel of {:?}", path);
        flatten_on_white(&image.to_rgba8())
            .save(&path)
            .with_context(|| format!("Saving {:?}", path))
    })
    .await?
}

/// Arguments for `kcc-c2e` shared by every conversion.
pub fn kcc_arguments(output_dir: &Path, options: &Options) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--output".into(),
        output_dir.to_string_lossy().into_owned(),
        "-p".into(),
        options.profile.clone(),
        "--manga-style".into(),
        "--hq".into(),
        "-f".into(),
        options.format.name().into(),
        "--batchsplit".into(),
        if options.single { "0" } else { "2" }.into(),
        "-u".into(),
        "-r".into(),
        if options.rotate { "1" } else { "0" }.into(),
    ];
    if !options.fullsize {
        args.push("-s".into());
    }
    args
}

async fn with_kcc(
    library: &Library,
    title: &str,
    chapters: &[ChapterNumber],
    options: &Options,
) -> Result<()> {
    let extension = options.format.extension();
    println!("{}", format!("Converting to {}...", options.format.name()).blue().bold());
    let args = kcc_arguments(library.root(), options);

    if options.single {
        let chapters_name = format_chapters(chapters, &IntervalFormat::FILE_NAME);
        let temp = tempfile::tempdir()?;
        for &chapter in chapters {
            Library::copy_chapter(
                &library.chapter_dir(title, chapter),
                &temp.path().join(chapter.to_string()),
            )
            .await?;
        }
        let book_title = format!("{} {}", title, chapters_name);
        println!("{}", book_title.blue());
        run_kcc(&args, &book_title, temp.path(), &library.manga_dir(title)).await?;

        let temp_name = temp
            .path()
            .file_name()
            .context("The temporary directory has no name")?
            .to_string_lossy()
            .into_owned();
        let output = library.output_path(title, &chapters_name, extension);
        move_output(&library.root().join(format!("{}.{}", temp_name, extension)), &output).await?;
        done(&output, "").await;
    } else {
        for &chapter in chapters {
            let book_title = format!("{} {}", title, chapter);
            println!("{}", book_title.blue());
            let chapter_dir = library.chapter_dir(title, chapter);
            run_kcc(&args, &book_title, &chapter_dir, &chapter_dir).await?;

            let output = library.output_path(title, &chapter.to_string(), extension);
            move_output(&library.root().join(format!("{}.{}", chapter, extension)), &output).await?;
            done(&output, "").await;
        }
    }
    Ok(())
}

async fn move_output(produced: &Path, output: &Path) -> Result<()> {
    fs::rename(produced, output)
        .await
        .with_context(|| format!("Moving {:?} to {:?}", produced, output))
}

/// Runs the converter, removing the images it reports as corrupted until it succeeds
/// or fails for another reason. `input` holds a copy of `library_dir` or is
/// `library_dir` itself, corrupted images are removed from both.
async fn run_kcc(args: &[String], title: &str, input: &Path, library_dir: &Path) -> Result<()> {
    loop {
        let mut command = Command::new(KCC);
        command.args(args).arg("--title").arg(title).arg(input);
        let err = match run_tool(command, KCC_TIP).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        let Some(corrupted) = corrupted_file(&format!("{:#}", err)) else {
            return Err(err);
        };
        println!(
            "{}",
            format!(
                "{} is corrupted, removing and trying again... (Cancel with Ctrl+C)",
                corrupted.display()
            )
            .red()
        );
        fs::remove_file(&corrupted)
            .await
            .with_context(|| format!("Removing {:?}", corrupted))?;
        if let Some(original) = library_original(&corrupted, input, library_dir) {
            if Library::exists(&original).await? {
                debug!("Removing {:?} from the library", original);
                fs::remove_file(&original)
                    .await
                    .with_context(|| format!("Removing {:?}", original))?;
            }
        }
    }
}

/// The image KindleComicConverter complained about, if any.
pub fn corrupted_file(output: &str) -> Option<PathBuf> {
    CORRUPTED_IMAGE
        .captures(output)
        .and_then(|captures| captures.get(1))
        .map(|path| PathBuf::from(path.as_str()))
}

/// The library file a file of the converted copy came from, `None` when the
/// library itself was converted or the file is not part of the copy.
pub fn library_original(copied: &Path, input: &Path, library_dir: &Path) -> Option<PathBuf> {
    let original = library_dir.join(copied.strip_prefix(input).ok()?);
    (original != copied).then_some(original)
}

async fn run_tool(mut command: Command, tip: &str) -> Result<()> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    debug!("Running {:?}", command.as_std());
    let output = match command.output().await {
        Ok(output) => output,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(Abort::new(format!("{} was not found", program))
                .with_tip(tip)
                .into())
        }
        Err(err) => return Err(err).with_context(|| format!("Running {}", program)),
    };
    if output.status.success() {
        return Ok(());
    }
    anyhow::bail!(
        "{} failed ({}): {} {}",
        program,
        output.status,
        String::from_utf8_lossy(&output.stdout).trim(),
        String::from_utf8_lossy(&output.stderr).trim()
    )
}
