//! Asset locator - resolves storage paths to fetchable URLs

use crate::{types::QualityLevel, Error, Result};
use url::Url;

/// Resolves logical media paths into URLs the media resource can load
pub trait AssetLocator {
    /// URL of a video file; `quality` is set only when the source exists in
    /// several qualities
    fn video_url(&self, path: &str, quality: Option<QualityLevel>) -> Result<Url>;

    /// URL of a poster or thumbnail image
    fn poster_url(&self, path: &str) -> Result<Url>;
}

/// Locator for the content service's storage layout:
/// `{base}/content/videos[/{quality}]/{filename}`
#[derive(Debug, Clone)]
pub struct StorageLocator {
    /// Storage root, always without a trailing slash
    base: String,
}

impl StorageLocator {
    /// Locator rooted at an explicit storage base such as
    /// `https://cdn.example.com/storage`
    pub fn new(base: &str) -> Result<Self> {
        let base = base.trim_end_matches('/');
        Url::parse(base)?;
        Ok(Self {
            base: base.to_string(),
        })
    }

    /// Locator derived from the content service API URL: the `/api` suffix
    /// is dropped and `storage` appended
    pub fn from_api_url(api_url: &str) -> Result<Self> {
        let host = api_url.trim_end_matches('/');
        let host = host.strip_suffix("/api").unwrap_or(host);
        Self::new(&format!("{}/storage", host))
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Last path segment of a storage path or URL
fn file_name(path: &str) -> Result<&str> {
    let path = if is_absolute(path) {
        path.split(['?', '#']).next().unwrap_or(path)
    } else {
        path
    };
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::InvalidSource(path.to_string()))
}

impl AssetLocator for StorageLocator {
    fn video_url(&self, path: &str, quality: Option<QualityLevel>) -> Result<Url> {
        if path.trim().is_empty() {
            return Err(Error::InvalidSource("empty video path".into()));
        }
        // Absolute URLs pass through unless a quality variant is requested
        if is_absolute(path) && quality.is_none() {
            return Ok(Url::parse(path)?);
        }
        let name = file_name(path)?;
        let url = match quality {
            Some(q) => format!("{}/content/videos/{}/{}", self.base, q, name),
            None => format!("{}/content/videos/{}", self.base, name),
        };
        Ok(Url::parse(&url)?)
    }

    fn poster_url(&self, path: &str) -> Result<Url> {
        if path.trim().is_empty() {
            return Err(Error::InvalidSource("empty poster path".into()));
        }
        if is_absolute(path) {
            return Ok(Url::parse(path)?);
        }
        let relative = path.trim_start_matches('/');
        let relative = relative.strip_prefix("storage/").unwrap_or(relative);
        Ok(Url::parse(&format!("{}/{}", self.base, relative))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> StorageLocator {
        StorageLocator::from_api_url("http://localhost:4200/api").unwrap()
    }

    #[test]
    fn test_from_api_url() {
        assert_eq!(locator().base(), "http://localhost:4200/storage");
    }

    #[test]
    fn test_video_url_with_quality() {
        let url = locator()
            .video_url("uploads/abc/clip.mp4", Some(QualityLevel::Fhd1080))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4200/storage/content/videos/1080p/clip.mp4"
        );
    }

    #[test]
    fn test_video_url_single_quality() {
        let url = locator().video_url("clip.mp4", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4200/storage/content/videos/clip.mp4");
    }

    #[test]
    fn test_absolute_url_rewritten_per_quality() {
        let loc = locator();
        let src = "https://cdn.example.com/storage/content/videos/720p/clip.mp4";
        assert_eq!(loc.video_url(src, None).unwrap().as_str(), src);
        assert_eq!(
            loc.video_url(src, Some(QualityLevel::Sd480)).unwrap().as_str(),
            "http://localhost:4200/storage/content/videos/480p/clip.mp4"
        );
    }

    #[test]
    fn test_poster_url_prefix() {
        let loc = locator();
        for path in ["thumbs/a.jpg", "storage/thumbs/a.jpg", "/storage/thumbs/a.jpg"] {
            assert_eq!(
                loc.poster_url(path).unwrap().as_str(),
                "http://localhost:4200/storage/thumbs/a.jpg"
            );
        }
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = locator().video_url("", None).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SOURCE");
    }
}
