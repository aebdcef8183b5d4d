//! Cover image storage.
//!
//! The store only persists bytes and hands back a relative path. Cover rows
//! are managed by [`crate::db::CoverRepository`].

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::db::utils::generate_entity_id;

const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

/// Side of the thumbnail the average colour is taken from.
const COLOUR_SAMPLE_SIZE: u32 = 32;

#[derive(Error, Diagnostic, Debug)]
pub enum CoverStoreError {
    #[error("Failed to write cover {path}: {source}")]
    #[diagnostic(code(bookbound::covers::write))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete cover {path}: {source}")]
    #[diagnostic(code(bookbound::covers::delete))]
    Delete {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to store an empty cover for {0}")]
    #[diagnostic(code(bookbound::covers::empty))]
    Empty(String),
}

/// A stored cover file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCover {
    /// Path relative to the store root.
    pub path: String,
    pub content_type: String,
}

/// Where cover bytes live. Can be mocked in tests.
#[cfg_attr(test, automock)]
pub trait CoverStore: Send + Sync {
    /// Persist `bytes` for a book. `content_type` is the server-reported type
    /// and may be absent, in which case it is guessed from `source_url`.
    fn store(
        &self,
        book_identifier: &str,
        source_url: &str,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> Result<StoredCover, CoverStoreError>;

    /// Remove a previously stored file. Missing files are not an error.
    fn delete(&self, path: &str) -> Result<(), CoverStoreError>;
}

/// Stores covers as files below a root directory.
#[derive(Debug, Clone)]
pub struct FsCoverStore {
    root: PathBuf,
}

impl FsCoverStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn full_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Content type from the response, else guessed from the URL path.
fn resolve_content_type(source_url: &str, content_type: Option<String>) -> String {
    content_type
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_string())
        .filter(|ct| ct.starts_with("image/"))
        .or_else(|| {
            let path = reqwest::Url::parse(source_url)
                .map(|url| url.path().to_string())
                .unwrap_or_else(|_| source_url.to_string());
            mime_guess::from_path(path)
                .first()
                .map(|mime| mime.essence_str().to_string())
                .filter(|ct| ct.starts_with("image/"))
        })
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}

fn extension_for(content_type: &str) -> &'static str {
    match mime_guess::get_mime_extensions_str(content_type) {
        Some(exts) if exts.contains(&"jpg") => "jpg",
        Some(exts) => exts.first().copied().unwrap_or("img"),
        None => "img",
    }
}

/// Average colour of an encoded image as `#rrggbb`, or `None` if the bytes
/// do not decode.
pub fn average_colour(bytes: &[u8]) -> Option<String> {
    let image = image::load_from_memory(bytes).ok()?;
    let pixels = image
        .thumbnail(COLOUR_SAMPLE_SIZE, COLOUR_SAMPLE_SIZE)
        .to_rgb8();

    let count = u64::from(pixels.width()) * u64::from(pixels.height());
    if count == 0 {
        return None;
    }

    let mut sums = [0u64; 3];
    for pixel in pixels.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += u64::from(channel);
        }
    }

    let [r, g, b] = sums.map(|sum| sum / count);
    Some(format!("#{:02x}{:02x}{:02x}", r, g, b))
}

impl CoverStore for FsCoverStore {
    fn store(
        &self,
        book_identifier: &str,
        source_url: &str,
        content_type: Option<String>,
        bytes: &[u8],
    ) -> Result<StoredCover, CoverStoreError> {
        if bytes.is_empty() {
            return Err(CoverStoreError::Empty(book_identifier.to_string()));
        }

        let content_type = resolve_content_type(source_url, content_type);
        let file_name = sanitize_filename::sanitize(format!(
            "{}-{}.{}",
            book_identifier,
            generate_entity_id(),
            extension_for(&content_type)
        ));

        let full = self.root.join(&file_name);
        let write = |path: &Path| -> std::io::Result<()> {
            std::fs::create_dir_all(&self.root)?;
            std::fs::write(path, bytes)
        };
        write(&full).map_err(|source| CoverStoreError::Write {
            path: full.display().to_string(),
            source,
        })?;

        Ok(StoredCover {
            path: file_name,
            content_type,
        })
    }

    fn delete(&self, path: &str) -> Result<(), CoverStoreError> {
        let full = self.root.join(sanitize_filename::sanitize(path));
        match std::fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CoverStoreError::Delete {
                path: full.display().to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_writes_file_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCoverStore::new(dir.path().join("covers"));

        let stored = store
            .store(
                "9780441013593",
                "https://images.example.com/dune.png",
                Some("image/png".to_string()),
                b"png-bytes",
            )
            .unwrap();

        assert!(stored.path.starts_with("9780441013593-"));
        assert!(stored.path.ends_with(".png"));
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(
            std::fs::read(store.full_path(&stored.path)).unwrap(),
            b"png-bytes"
        );
    }

    fn encode_png(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
        let buffer = image::RgbImage::from_fn(width, height, |x, y| image::Rgb(f(x, y)));
        let mut out = std::io::Cursor::new(Vec::new());
        buffer.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_average_colour_of_solid_image() {
        let png = encode_png(8, 8, |_, _| [255, 0, 0]);
        assert_eq!(average_colour(&png).as_deref(), Some("#ff0000"));
    }

    #[test]
    fn test_average_colour_mixes_halves() {
        let png = encode_png(64, 64, |x, _| if x < 32 { [0, 0, 0] } else { [200, 100, 50] });
        let colour = average_colour(&png).unwrap();
        assert_eq!(colour.len(), 7);
        let channel = |i: usize| u8::from_str_radix(&colour[i..i + 2], 16).unwrap();
        assert!((95..=105).contains(&channel(1)), "{colour}");
        assert!((45..=55).contains(&channel(3)), "{colour}");
    }

    #[test]
    fn test_average_colour_of_garbage_is_none() {
        assert_eq!(average_colour(b"png-bytes"), None);
        assert_eq!(average_colour(b""), None);
    }

    #[test]
    fn test_content_type_guessed_from_url() {
        assert_eq!(
            resolve_content_type("https://covers.openlibrary.org/b/id/1-L.jpg", None),
            "image/jpeg"
        );
        assert_eq!(
            resolve_content_type("https://x.test/c.png?zoom=0", Some("text/html".to_string())),
            "image/png"
        );
        assert_eq!(
            resolve_content_type("https://x.test/cover", None),
            FALLBACK_CONTENT_TYPE
        );
        assert_eq!(
            resolve_content_type("https://x.test/c", Some("image/webp; q=1".to_string())),
            "image/webp"
        );
    }

    #[test]
    fn test_jpeg_uses_jpg_extension() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("application/x-unknown-thing"), "img");
    }

    #[test]
    fn test_identifier_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCoverStore::new(dir.path());

        let stored = store
            .store("../../etc/passwd", "https://x.test/a.jpg", None, b"x")
            .unwrap();

        assert!(!stored.path.contains('/'));
        assert!(store.full_path(&stored.path).exists());
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCoverStore::new(dir.path());

        let err = store
            .store("123", "https://x.test/a.jpg", None, b"")
            .unwrap_err();
        assert!(matches!(err, CoverStoreError::Empty(_)));
    }

    #[test]
    fn test_delete_removes_file_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCoverStore::new(dir.path());
        let stored = store
            .store("123", "https://x.test/a.jpg", None, b"x")
            .unwrap();

        store.delete(&stored.path).unwrap();
        assert!(!store.full_path(&stored.path).exists());
        store.delete(&stored.path).unwrap();
    }
}
