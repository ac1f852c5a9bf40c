//! Where chapters live on disk.
//!
//! ```text
//! <root>/<manga title>/<chapter>/<page>.<ext>
//! ```

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::chapter_range::ChapterNumber;

pub const DEFAULT_ROOT: &str = "./manga";
pub const DEFAULT_EXTENSION: &str = "png";

const FILENAME_KEEP: &[char] = &['_', '-', ' ', '.'];
const OUTPUT_KEEP: &[char] = &['_', '-', ' ', '.', ','];
const EXTENSION_KEEP: &[char] = &['.'];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").unwrap();
}

/// Keeps alphanumerics and the given characters, so titles can be used as
/// folder names.
pub fn strip_path(name: &str, keep: &[char]) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || keep.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Turns every run of non-word characters into a single `-`.
pub fn encode(title: &str) -> String {
    NON_WORD.replace_all(title, "-").into_owned()
}

/// The extension of the file a URL or path points at, `png` when it has none.
pub fn extension_of(location: &str) -> String {
    let file = location
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default()
        .rsplit('/')
        .next()
        .unwrap_or_default();
    match file.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            strip_path(extension, EXTENSION_KEEP).to_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
}

impl Library {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manga_dir(&self, title: &str) -> PathBuf {
        self.root.join(strip_path(title, FILENAME_KEEP))
    }

    pub fn chapter_dir(&self, title: &str, chapter: ChapterNumber) -> PathBuf {
        self.manga_dir(title).join(chapter.to_string())
    }

    pub fn page_path(
        &self,
        title: &str,
        chapter: ChapterNumber,
        page: usize,
        extension: &str,
    ) -> PathBuf {
        let extension = match strip_path(extension, EXTENSION_KEEP) {
            ext if ext.is_empty() => DEFAULT_EXTENSION.to_string(),
            ext => ext,
        };
        self.chapter_dir(title, chapter)
            .join(format!("{}.{}", page, extension))
    }

    /// The file a converted manga is saved as, e.g. `<root>/Berserk 1-3.pdf`.
    pub fn output_path(&self, title: &str, chapters: &str, extension: &str) -> PathBuf {
        self.root.join(format!(
            "{}.{}",
            strip_path(&format!("{} {}", title, chapters), OUTPUT_KEEP),
            strip_path(extension, EXTENSION_KEEP)
        ))
    }

    pub async fn exists(path: &Path) -> Result<bool> {
        fs::try_exists(path)
            .await
            .with_context(|| format!("Checking {:?}", path))
    }

    pub async fn write(path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Creating {:?}", parent))?;
        }
        fs::write(path, data)
            .await
            .with_context(|| format!("Writing {:?}", path))
    }

    /// Sub folders of `dir` with their names, sorted by name.
    pub async fn folders(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("{} does not exist!", dir.display()))?;
        let mut folders = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                folders.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
            }
        }
        folders.sort();
        Ok(folders)
    }

    /// Image files of a chapter folder with their page numbers, in page order.
    /// Files whose name is not a page number are skipped.
    pub async fn pages(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("{} does not exist!", dir.display()))?;
        let mut pages = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
            if !is_image || !entry.file_type().await?.is_file() {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()).map(str::parse::<usize>) {
                Some(Ok(number)) => pages.push((number, path)),
                _ => debug!("Skipping {:?}, it is not a page", path),
            }
        }
        pages.sort();
        Ok(pages)
    }

    /// Copies the files of a chapter folder into `to`.
    pub async fn copy_chapter(from: &Path, to: &Path) -> Result<()> {
        fs::create_dir_all(to).await?;
        for (_, page) in Self::pages(from).await? {
            if let Some(name) = page.file_name() {
                fs::copy(&page, to.join(name))
                    .await
                    .with_context(|| format!("Copying {:?}", page))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_and_encode_titles() {
        assert_eq!(strip_path(" Kimetsu: no Yaiba! ", FILENAME_KEEP), "Kimetsu no Yaiba");
        assert_eq!(encode("Kimetsu: no Yaiba!"), "Kimetsu-no-Yaiba-");
        assert_eq!(encode("Shingeki_no  Kyojin (2009)"), "Shingeki_no-Kyojin-2009-");
        assert_eq!(encode("Jūjutsu Kaisen"), "Jūjutsu-Kaisen");
    }

    #[test]
    fn extensions_from_urls() {
        assert_eq!(extension_of("https://cdn.test/data/abc/x1-f00.JPG"), "jpg");
        assert_eq!(extension_of("https://cdn.test/p.webp?token=1"), "webp");
        assert_eq!(extension_of("https://inmanga.com/page/getPageImage/?identification=1"), "png");
        assert_eq!(extension_of("/tmp/manga/1/.hidden"), "png");
    }

    #[test]
    fn layout() {
        let library = Library::new("/data");
        let half = ChapterNumber::from_thousandths(10_500);
        assert_eq!(library.manga_dir("Dr. Stone?"), PathBuf::from("/data/Dr. Stone"));
        assert_eq!(library.chapter_dir("Dr. Stone", half), PathBuf::from("/data/Dr. Stone/10.5"));
        assert_eq!(
            library.page_path("Dr. Stone", ChapterNumber::whole(3), 12, "jpg"),
            PathBuf::from("/data/Dr. Stone/3/12.jpg")
        );
        assert_eq!(
            library.page_path("Dr. Stone", ChapterNumber::whole(3), 1, ""),
            PathBuf::from("/data/Dr. Stone/3/1.png")
        );
        assert_eq!(
            library.output_path("Dr. Stone", "1-3,5", "pdf"),
            PathBuf::from("/data/Dr. Stone 1-3,5.pdf")
        );
    }

    #[tokio::test]
    async fn write_then_list() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let library = Library::new(dir.path());
        let chapter = ChapterNumber::whole(1);
        for page in [10, 2, 1] {
            let path = library.page_path("Test", chapter, page, "png");
            Library::write(&path, b"page").await?;
            assert!(Library::exists(&path).await?);
        }
        Library::write(&library.chapter_dir("Test", chapter).join("notes.txt"), b"x").await?;
        Library::write(&library.chapter_dir("Test", chapter).join("cover.png"), b"x").await?;

        let pages: Vec<usize> = Library::pages(&library.chapter_dir("Test", chapter))
            .await?
            .into_iter()
            .map(|(number, _)| number)
            .collect();
        assert_eq!(pages, vec![1, 2, 10]);

        let folders = Library::folders(&library.manga_dir("Test")).await?;
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].0, "1");

        let copy = dir.path().join("copy");
        Library::copy_chapter(&library.chapter_dir("Test", chapter), &copy).await?;
        assert_eq!(Library::pages(&copy).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn missing_files_do_not_exist() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let library = Library::new(dir.path());
        let path = library.page_path("Test", ChapterNumber::whole(1), 1, "png");
        assert!(!Library::exists(&path).await?);
        Library::write(&path, b"page").await?;
        assert!(Library::exists(&path).await?);
        Ok(())
    }

    #[tokio::test]
    async fn listing_a_missing_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Library::folders(&dir.path().join("nope")).await.is_err());
    }
}
