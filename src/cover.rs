use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("clippings-sync/", env!("CARGO_PKG_VERSION"));
const OPENLIBRARY_SEARCH: &str = "https://openlibrary.org/search.json";
const GOOGLE_BOOKS_VOLUMES: &str = "https://www.googleapis.com/books/v1/volumes";

/// Looks up a cover image for a book.
///
/// `Ok(None)` means "not found"; `Err` is reserved for transport failures.
pub trait CoverProvider {
    fn name(&self) -> &str;
    fn fetch(&self, title: &str, primary_author: Option<&str>) -> Result<Option<Vec<u8>>>;
}

/// File extension for image bytes, `None` when the payload is not an image.
pub fn image_extension(bytes: &[u8]) -> Option<&'static str> {
    let kind = infer::get(bytes)?;
    if kind.matcher_type() != infer::MatcherType::Image {
        return None;
    }
    Some(match kind.extension() {
        "jpeg" => "jpg",
        other => other,
    })
}

fn http_client(timeout: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout))
        .user_agent(USER_AGENT)
        .build()
        .context("building HTTP client")
}

fn decode<T: serde::de::DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).with_context(|| format!("decoding {what} response"))
}

fn download_image(client: &Client, url: &str) -> Result<Option<Vec<u8>>> {
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("GET {url}"))?;
    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let bytes = resp.error_for_status()?.bytes()?.to_vec();
    if image_extension(&bytes).is_none() {
        debug!("ignoring non-image payload from {url}");
        return Ok(None);
    }
    Ok(Some(bytes))
}

#[derive(Debug, Deserialize)]
struct OlSearch {
    #[serde(default)]
    docs: Vec<OlSearchDoc>,
}

#[derive(Debug, Deserialize)]
struct OlSearchDoc {
    cover_i: Option<i64>,
}

fn openlibrary_cover_id(body: &str) -> Result<Option<i64>> {
    let search: OlSearch = decode(body, "OpenLibrary search")?;
    Ok(search.docs.into_iter().find_map(|d| d.cover_i))
}

pub struct OpenLibraryCovers {
    client: Client,
}

impl OpenLibraryCovers {
    pub fn new(timeout: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }
}

impl CoverProvider for OpenLibraryCovers {
    fn name(&self) -> &str {
        "openlibrary"
    }

    fn fetch(&self, title: &str, primary_author: Option<&str>) -> Result<Option<Vec<u8>>> {
        let mut query = vec![("title", title), ("limit", "5"), ("fields", "cover_i")];
        if let Some(author) = primary_author {
            query.push(("author", author));
        }
        let body = self
            .client
            .get(OPENLIBRARY_SEARCH)
            .query(&query)
            .send()
            .context("OpenLibrary search")?
            .error_for_status()?
            .text()?;
        let Some(cover_id) = openlibrary_cover_id(&body)? else {
            return Ok(None);
        };
        let url = format!("https://covers.openlibrary.org/b/id/{cover_id}-L.jpg?default=false");
        download_image(&self.client, &url)
    }
}

#[derive(Debug, Deserialize)]
struct GbVolumes {
    #[serde(default)]
    items: Vec<GbItem>,
}

#[derive(Debug, Deserialize)]
struct GbItem {
    #[serde(rename = "volumeInfo")]
    volume_info: GbVolumeInfo,
}

#[derive(Debug, Deserialize)]
struct GbVolumeInfo {
    #[serde(rename = "imageLinks")]
    image_links: Option<GbImageLinks>,
}

#[derive(Debug, Deserialize)]
struct GbImageLinks {
    thumbnail: Option<String>,
    #[serde(rename = "smallThumbnail")]
    small_thumbnail: Option<String>,
}

fn google_thumbnail(body: &str) -> Result<Option<String>> {
    let volumes: GbVolumes = decode(body, "Google Books")?;
    Ok(volumes
        .items
        .into_iter()
        .filter_map(|i| i.volume_info.image_links)
        .find_map(|l| l.thumbnail.or(l.small_thumbnail))
        .map(|url| url.replacen("http://", "https://", 1)))
}

fn google_query(title: &str, primary_author: Option<&str>) -> String {
    let mut q = format!("intitle:{}", urlencoding::encode(title));
    if let Some(author) = primary_author {
        q.push_str(&format!("+inauthor:{}", urlencoding::encode(author)));
    }
    q
}

pub struct GoogleBooksCovers {
    client: Client,
}

impl GoogleBooksCovers {
    pub fn new(timeout: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }
}

impl CoverProvider for GoogleBooksCovers {
    fn name(&self) -> &str {
        "googlebooks"
    }

    fn fetch(&self, title: &str, primary_author: Option<&str>) -> Result<Option<Vec<u8>>> {
        let url = format!(
            "{GOOGLE_BOOKS_VOLUMES}?q={}&maxResults=5",
            google_query(title, primary_author)
        );
        let body = self
            .client
            .get(&url)
            .send()
            .context("Google Books search")?
            .error_for_status()?
            .text()?;
        match google_thumbnail(&body)? {
            Some(thumb) => download_image(&self.client, &thumb),
            None => Ok(None),
        }
    }
}

/// Tries each provider in turn; the first image wins. A failing provider
/// is logged and skipped, so the chain itself never errors.
pub struct CoverChain {
    providers: Vec<Box<dyn CoverProvider>>,
}

impl CoverChain {
    pub fn new(providers: Vec<Box<dyn CoverProvider>>) -> Self {
        Self { providers }
    }

    /// OpenLibrary first, Google Books as fallback.
    pub fn online(timeout: u64) -> Result<Self> {
        Ok(Self::new(vec![
            Box::new(OpenLibraryCovers::new(timeout)?),
            Box::new(GoogleBooksCovers::new(timeout)?),
        ]))
    }
}

impl CoverProvider for CoverChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn fetch(&self, title: &str, primary_author: Option<&str>) -> Result<Option<Vec<u8>>> {
        for provider in &self.providers {
            match provider.fetch(title, primary_author) {
                Ok(Some(bytes)) => {
                    debug!("cover for {title:?} from {}", provider.name());
                    return Ok(Some(bytes));
                }
                Ok(None) => debug!("{}: no cover for {title:?}", provider.name()),
                Err(e) => warn!("{} lookup failed for {title:?}: {e:#}", provider.name()),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0];

    struct Fixed(&'static str, Result<Option<Vec<u8>>, &'static str>);

    impl CoverProvider for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn fetch(&self, _title: &str, _author: Option<&str>) -> Result<Option<Vec<u8>>> {
            match &self.1 {
                Ok(v) => Ok(v.clone()),
                Err(msg) => Err(anyhow!(*msg)),
            }
        }
    }

    #[test]
    fn sniffs_image_types() {
        assert_eq!(image_extension(PNG_MAGIC), Some("png"));
        assert_eq!(image_extension(JPEG_MAGIC), Some("jpg"));
        assert_eq!(image_extension(b"<html>not found</html>"), None);
        assert_eq!(image_extension(&[]), None);
    }

    #[test]
    fn openlibrary_search_picks_first_cover() {
        let body = r#"{"numFound": 3, "docs": [{"title": "x"}, {"cover_i": 12345}, {"cover_i": 9}]}"#;
        assert_eq!(openlibrary_cover_id(body).unwrap(), Some(12345));
        assert_eq!(openlibrary_cover_id(r#"{"docs": []}"#).unwrap(), None);
        assert!(openlibrary_cover_id(r#"{"docs": [{"cover_i": "nope"}]}"#).is_err());
    }

    #[test]
    fn google_thumbnail_is_upgraded_to_https() {
        let body = r#"{"items": [
            {"volumeInfo": {"title": "no links"}},
            {"volumeInfo": {"imageLinks": {"smallThumbnail": "http://books.google.com/s.jpg"}}}
        ]}"#;
        assert_eq!(
            google_thumbnail(body).unwrap().as_deref(),
            Some("https://books.google.com/s.jpg")
        );
        assert_eq!(google_thumbnail(r#"{"totalItems": 0}"#).unwrap(), None);
    }

    #[test]
    fn google_query_encodes_terms() {
        assert_eq!(
            google_query("Dune & Co", Some("Frank Herbert")),
            "intitle:Dune%20%26%20Co+inauthor:Frank%20Herbert"
        );
        assert_eq!(google_query("Dune", None), "intitle:Dune");
    }

    #[test]
    fn chain_skips_failures_and_misses() {
        let chain = CoverChain::new(vec![
            Box::new(Fixed("down", Err("connection refused"))),
            Box::new(Fixed("empty", Ok(None))),
            Box::new(Fixed("hit", Ok(Some(PNG_MAGIC.to_vec())))),
        ]);
        assert_eq!(chain.fetch("Dune", None).unwrap(), Some(PNG_MAGIC.to_vec()));

        let chain = CoverChain::new(vec![Box::new(Fixed("down", Err("timeout")))]);
        assert_eq!(chain.fetch("Dune", None).unwrap(), None);
    }
}
