//! Catalogue boundary: the loader/normalizer, its cache fallback chain, and
//! the offline merge utility. The session core consumes the normalized item
//! list and treats every arm of the fallback chain as equivalent input.

mod item;
mod loader;
mod merge;

pub use item::{resolve_media_path, Catalogue, PracticeItem};
pub use loader::{parse_catalogue, select_items, CatalogueLoader, CatalogueSource, LoadedCatalogue};
pub use merge::{merge_catalogue, MergeReport};
