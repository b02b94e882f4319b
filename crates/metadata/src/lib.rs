use std::path::Path;
use std::sync::Arc;

use common::{file_stem, Track, PLACEHOLDER_ARTWORK, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod catalog;

pub use catalog::{parse_search_body, CatalogClient, CatalogError, HttpCatalog, DEFAULT_CATALOG_URL};

/// The first catalog hit for a search, field by field. Absent fields are left
/// absent here; sentinels are applied when merging into a `Track`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogMatch {
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub artwork_url: Option<String>,
}

/// "Artist-Some_Song.mp3" -> "Artist Some Song". `None` if nothing is left
/// to search for.
pub fn search_term_from_path(file_path: &str) -> Option<String> {
    let stem = file_stem(Path::new(file_path));
    let term = stem.replace(['-', '_'], " ");
    if term.trim().is_empty() {
        None
    } else {
        Some(term)
    }
}

/// Merges a catalog hit into `track` and marks it resolved. Missing fields
/// become the default sentinels; the title is left as the user knows it.
pub fn apply_catalog_match(track: &mut Track, found: &CatalogMatch) {
    track.artist = found
        .artist_name
        .clone()
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    track.album = found
        .album_name
        .clone()
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());
    track.artwork_ref = found
        .artwork_url
        .clone()
        .unwrap_or_else(|| PLACEHOLDER_ARTWORK.to_string());
    track.resolved = true;
}

/// Turns a file path into at most one catalog lookup.
///
/// Every failure mode (blank search term, transport error, bad status,
/// unparseable body, cancellation) collapses to `None`; nothing is retried.
#[derive(Clone)]
pub struct MetadataResolver {
    catalog: Arc<dyn CatalogClient>,
}

impl MetadataResolver {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self { catalog }
    }

    pub async fn resolve(
        &self,
        file_path: &str,
        cancel: &CancellationToken,
    ) -> Option<CatalogMatch> {
        let term = match search_term_from_path(file_path) {
            Some(term) => term,
            None => {
                debug!(file_path, "No search term for file; skipping lookup");
                return None;
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(file_path, "Catalog lookup cancelled");
                return None;
            }
            result = self.catalog.search(&term) => result,
        };

        match result {
            Ok(Some(found)) => Some(found),
            Ok(None) => {
                info!("No catalog match for {:?}", term);
                None
            }
            Err(err) => {
                warn!("Catalog lookup for {:?} failed: {}", term, err);
                None
            }
        }
    }
}
