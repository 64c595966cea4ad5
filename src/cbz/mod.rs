//! CBZ writer. Packs ordered page images plus a `ComicInfo.xml` record into a zip archive.

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const COMIC_INFO_NAME: &str = "ComicInfo.xml";

/// Errors from the CBZ writer.
#[derive(Debug, Error)]
pub enum CbzError {
    #[error("Cannot write CBZ: no pages.")]
    NoPages,

    #[error("Cannot read page image {path}: {source}")]
    ReadPage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create CBZ file: {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CBZ archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<std::io::Error> for CbzError {
    fn from(e: std::io::Error) -> Self {
        CbzError::Zip(zip::result::ZipError::Io(e))
    }
}

/// Role of a page in `ComicInfo.xml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    FrontCover,
    Story,
}

impl PageType {
    fn as_str(self) -> &'static str {
        match self {
            PageType::FrontCover => "FrontCover",
            PageType::Story => "Story",
        }
    }

    /// First page is the front cover, the rest are story pages.
    pub fn for_index(index: usize) -> Self {
        if index == 0 {
            PageType::FrontCover
        } else {
            PageType::Story
        }
    }
}

/// Archive-wide settings that do not vary per article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicSettings {
    /// ISO language code, e.g. `zh`.
    pub language_iso: String,
    /// `Format` value, e.g. `Web Comic`.
    pub format: String,
    pub black_and_white: bool,
    pub manga: bool,
    /// `AgeRating` value, e.g. `Rating Pending`.
    pub age_rating: String,
}

impl Default for ComicSettings {
    fn default() -> Self {
        Self {
            language_iso: "zh".to_string(),
            format: "Web Comic".to_string(),
            black_and_white: false,
            manga: true,
            age_rating: "Rating Pending".to_string(),
        }
    }
}

/// Metadata for one archive.
#[derive(Debug, Clone)]
pub struct ComicInfo {
    pub title: String,
    pub series: String,
    pub settings: ComicSettings,
}

/// Page as written into the archive.
#[derive(Debug)]
struct PackedPage {
    name: String,
    kind: PageType,
    size: usize,
}

/// Write `pages` (in order) and `info` to a CBZ file at `path`.
///
/// Page 0 is tagged as the front cover. A partially written file is removed on error.
pub fn write_cbz(pages: &[PathBuf], info: &ComicInfo, path: &Path) -> Result<(), CbzError> {
    if pages.is_empty() {
        return Err(CbzError::NoPages);
    }
    let result = write_archive(pages, info, path);
    if result.is_err() {
        let _ = std::fs::remove_file(path);
    }
    result
}

fn write_archive(pages: &[PathBuf], info: &ComicInfo, path: &Path) -> Result<(), CbzError> {
    let file = std::fs::File::create(path).map_err(|e| CbzError::CreateFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);

    let options_stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let options_deflate = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut packed = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        let data = std::fs::read(page).map_err(|e| CbzError::ReadPage {
            path: page.clone(),
            source: e,
        })?;
        let name = format!("page-{:03}.{}", i, image_extension(&data));
        // Images are already compressed.
        zip.start_file(name.as_str(), options_stored)?;
        zip.write_all(&data)?;
        packed.push(PackedPage {
            name,
            kind: PageType::for_index(i),
            size: data.len(),
        });
    }

    zip.start_file(COMIC_INFO_NAME, options_deflate)?;
    zip.write_all(comic_info_xml(info, &packed).as_bytes())?;

    zip.finish()?;
    Ok(())
}

/// Extension from magic bytes; `jpg` when unknown.
fn image_extension(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        "png"
    } else if data.starts_with(b"GIF8") {
        "gif"
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        "webp"
    } else {
        "jpg"
    }
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "Yes"
    } else {
        "No"
    }
}

fn comic_info_xml(info: &ComicInfo, pages: &[PackedPage]) -> String {
    let s = &info.settings;
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    xml.push_str("<ComicInfo xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n");
    let _ = writeln!(xml, "  <Title>{}</Title>", xml_escape(&info.title));
    let _ = writeln!(xml, "  <Series>{}</Series>", xml_escape(&info.series));
    let _ = writeln!(xml, "  <PageCount>{}</PageCount>", pages.len());
    let _ = writeln!(
        xml,
        "  <LanguageISO>{}</LanguageISO>",
        xml_escape(&s.language_iso)
    );
    let _ = writeln!(xml, "  <Format>{}</Format>", xml_escape(&s.format));
    let _ = writeln!(
        xml,
        "  <BlackAndWhite>{}</BlackAndWhite>",
        yes_no(s.black_and_white)
    );
    let _ = writeln!(xml, "  <Manga>{}</Manga>", yes_no(s.manga));
    let _ = writeln!(xml, "  <AgeRating>{}</AgeRating>", xml_escape(&s.age_rating));
    xml.push_str("  <Pages>\n");
    for (i, page) in pages.iter().enumerate() {
        let _ = writeln!(
            xml,
            "    <Page Image=\"{}\" Type=\"{}\" ImageSize=\"{}\" />",
            i,
            page.kind.as_str(),
            page.size
        );
    }
    xml.push_str("  </Pages>\n");
    xml.push_str("</ComicInfo>\n");
    xml
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
