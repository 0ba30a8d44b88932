//! Freesound API Client
//!
//! Async client for the Freesound API (`https://freesound.org/apiv2`).
//!
//! # Features
//!
//! - **Resources**: sounds, users and packs as schemaless objects whose
//!   fields depend on the `fields`/`descriptors` request parameters
//! - **Search**: text, content-based and combined searches
//! - **Pagination**: `next`/`previous` pages, combined-search `more`, and
//!   lazy item streams across pages
//! - **Download**: originals, previews and pack archives, in fixed-size
//!   blocks with progress reporting
//!
//! # Example
//!
//! ```ignore
//! use freesound_client::{ClientConfig, FreesoundClient, QueryParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FreesoundClient::new(ClientConfig::with_api_key("<your_api_key>"))?;
//!
//!     let sound = client.get_sound(6, QueryParams::new()).await?;
//!     println!("Getting sound: {}", sound.name()?);
//!     println!("Tags: {:?}", sound.get_as::<Vec<String>>("tags")?);
//!
//!     let results = client
//!         .text_search(
//!             QueryParams::new()
//!                 .param("query", "violoncello")
//!                 .param("filter", "tag:tenuto duration:[1.0 TO 15.0]")
//!                 .param("sort", "rating_desc"),
//!         )
//!         .await?;
//!     println!("Num results: {:?}", results.count());
//!     for sound in results.iter() {
//!         println!("\t- {}", sound?.name()?);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod download;
mod error;
mod object;
mod pager;
mod params;
mod resources;
mod types;
pub mod uris;

// Re-export main types
pub use client::{FreesoundClient, DEFAULT_SEARCH_FIELDS};
pub use error::{FreesoundError, Result};
pub use object::{FreesoundObject, FromObject};
pub use pager::{into_stream, CombinedSearchPager, Paginated, Pager};
pub use params::{format_vector, QueryParams};
pub use resources::{Pack, Sound, User};
pub use types::{
    ClientConfig, Credential, Preview, PreviewFormat, PreviewQuality, RetrieveProgress,
    CONTENT_CHUNK_SIZE,
};

// File naming helpers used by the download operations
pub use download::{filename_from_uri, sanitize_filename, with_format_extension};
