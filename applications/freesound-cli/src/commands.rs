//! Command implementations.

use anyhow::Context;
use freesound_client::{
    into_stream, with_format_extension, FreesoundClient, FreesoundObject, Preview, QueryParams,
    RetrieveProgress, Sound,
};
use futures_util::{StreamExt, TryStreamExt};
use std::io::Write;
use std::path::Path;

/// Print one sound's fields as pretty JSON.
pub async fn sound_info(
    client: &FreesoundClient,
    sound_id: u64,
    fields: Option<String>,
) -> anyhow::Result<()> {
    let mut params = QueryParams::new();
    if let Some(fields) = fields {
        params = params.param("fields", fields);
    }

    let sound = client.get_sound(sound_id, params).await?;
    print_object(&sound)
}

/// Run a text search and print up to `limit` results, following pages.
pub async fn text_search(
    client: &FreesoundClient,
    params: QueryParams,
    limit: usize,
) -> anyhow::Result<()> {
    let first = client.text_search(params).await?;
    if let Some(count) = first.count() {
        println!("Num results: {count}");
    }
    print_sounds(into_stream(first), limit).await
}

/// Content-based search on a descriptor target.
pub async fn content_search(
    client: &FreesoundClient,
    params: QueryParams,
    limit: usize,
) -> anyhow::Result<()> {
    let first = client.content_based_search(params).await?;
    print_sounds(into_stream(first), limit).await
}

/// Combined search, following `more` links.
pub async fn combined_search(
    client: &FreesoundClient,
    params: QueryParams,
    limit: usize,
) -> anyhow::Result<()> {
    let first = client.combined_search(params).await?;
    print_sounds(into_stream(first), limit).await
}

pub async fn similar(client: &FreesoundClient, sound_id: u64, limit: usize) -> anyhow::Result<()> {
    let sound = client.get_sound(sound_id, QueryParams::new()).await?;
    let first = sound.get_similar(QueryParams::new()).await?;
    print_sounds(into_stream(first), limit).await
}

pub async fn analysis(
    client: &FreesoundClient,
    sound_id: u64,
    descriptors: Option<String>,
    normalized: bool,
) -> anyhow::Result<()> {
    let sound = client.get_sound(sound_id, QueryParams::new()).await?;
    let analysis = sound
        .get_analysis(descriptors.as_deref(), normalized)
        .await?;
    print_object(&analysis)
}

/// Show a user, optionally with their sounds and packs.
pub async fn user(
    client: &FreesoundClient,
    username: &str,
    sounds: bool,
    packs: bool,
    limit: usize,
) -> anyhow::Result<()> {
    let user = client.get_user(username).await?;
    println!("{user}");

    if sounds {
        println!("Sounds:");
        let first = user.get_sounds(QueryParams::new()).await?;
        print_sounds(into_stream(first), limit).await?;
    }

    if packs {
        println!("Packs:");
        let first = user.get_packs(QueryParams::new()).await?;
        let mut stream = Box::pin(into_stream(first).take(limit));
        while let Some(pack) = stream.try_next().await? {
            println!("\t{}", pack_line(&pack));
        }
    }

    Ok(())
}

pub async fn pack(client: &FreesoundClient, pack_id: u64, limit: usize) -> anyhow::Result<()> {
    let pack = client.get_pack(pack_id).await?;
    println!("{pack}");
    let first = pack.get_sounds(QueryParams::new()).await?;
    print_sounds(into_stream(first), limit).await
}

pub async fn preview(
    client: &FreesoundClient,
    sound_id: u64,
    directory: &Path,
    name: Option<&str>,
    preview: Preview,
) -> anyhow::Result<()> {
    let sound = client
        .get_sound(sound_id, QueryParams::new().param("fields", "id,name,previews"))
        .await?;
    let path = sound.retrieve_preview(directory, name, preview).await?;
    println!("{}", path.display());
    Ok(())
}

/// Download the original file of a sound (needs an OAuth2 token).
pub async fn download(
    client: &FreesoundClient,
    sound_id: u64,
    directory: &Path,
    name: Option<&str>,
) -> anyhow::Result<()> {
    let sound = client.get_sound(sound_id, QueryParams::new()).await?;
    let mut progress = progress_printer();
    let path = sound.retrieve(directory, name, Some(&mut progress)).await?;
    eprintln!();
    println!("{}", path.display());
    Ok(())
}

/// Download a pack archive (needs an OAuth2 token).
pub async fn download_pack(
    client: &FreesoundClient,
    pack_id: u64,
    directory: &Path,
) -> anyhow::Result<()> {
    let pack = client.get_pack(pack_id).await?;
    let mut progress = progress_printer();
    let path = pack.retrieve(directory, None, Some(&mut progress)).await?;
    eprintln!();
    println!("{}", path.display());
    Ok(())
}

/// What `bookmarks` downloads for each bookmarked sound.
#[derive(Debug, Clone, Copy)]
pub enum BookmarkMode {
    /// Original files (needs an OAuth2 token)
    Originals,
    Previews(Preview),
}

/// Download the sounds of a user's bookmark categories into `directory`.
///
/// Walks every category, or only `category_id` when given. A failed
/// download is reported and skipped.
pub async fn bookmarks(
    client: &FreesoundClient,
    username: &str,
    category_id: Option<u64>,
    directory: &Path,
    mode: BookmarkMode,
) -> anyhow::Result<()> {
    let user = client.get_user(username).await?;
    println!("Username: {}", field_text(&user, "username"));

    let first = user
        .get_bookmark_categories(QueryParams::new().param("page_size", 100))
        .await?;
    println!("Num categories: {}", first.count().unwrap_or(0));

    let mut categories = into_stream(first)
        .try_collect::<Vec<FreesoundObject>>()
        .await?;
    if let Some(category_id) = category_id {
        categories.retain(|c| c.u64("id").ok() == Some(category_id));
        if categories.is_empty() {
            anyhow::bail!("{username} has no bookmark category {category_id}");
        }
    }

    let fields = match mode {
        BookmarkMode::Originals => "id,name,type",
        BookmarkMode::Previews(_) => "id,name,previews",
    };

    let mut failed = 0usize;
    for category in &categories {
        let id = category
            .u64("id")
            .context("bookmark category without an id")?;
        println!("\tCategory: {}", field_text(category, "name"));
        println!("\tNum sounds: {}", field_text(category, "num_sounds"));

        let first = user
            .get_bookmark_category_sounds(id, QueryParams::new().param("fields", fields))
            .await?;
        let mut stream = Box::pin(into_stream(first));
        while let Some(sound) = stream.try_next().await? {
            println!("\t\tDownloading: {}", field_text(&sound, "name"));
            let result = match mode {
                BookmarkMode::Originals => match original_filename(&sound) {
                    Ok(name) => sound.retrieve(directory, Some(name.as_str()), None).await,
                    Err(e) => Err(e),
                },
                BookmarkMode::Previews(preview) => {
                    sound.retrieve_preview(directory, None, preview).await
                }
            };
            if let Err(e) = result {
                failed += 1;
                tracing::warn!(sound = %sound, error = %e, "Bookmark download failed");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} bookmarked sound(s) could not be downloaded");
    }
    Ok(())
}

/// File name for a sound's original: its name, with the `type` field as
/// extension unless the name already ends with it.
pub fn original_filename(sound: &Sound) -> freesound_client::Result<String> {
    Ok(with_format_extension(sound.name()?, sound.str("type")?))
}

async fn print_sounds<S>(stream: S, limit: usize) -> anyhow::Result<()>
where
    S: futures_util::Stream<Item = freesound_client::Result<Sound>>,
{
    let mut stream = Box::pin(stream.take(limit));
    while let Some(sound) = stream.try_next().await? {
        println!("\t{}", sound_line(&sound));
    }
    Ok(())
}

fn print_object(object: &FreesoundObject) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(object)?;
    println!("{json}");
    Ok(())
}

/// One line per sound: id, name and uploader, tab separated.
pub fn sound_line(sound: &Sound) -> String {
    format!(
        "{}\t{}\t{}",
        field_text(sound, "id"),
        field_text(sound, "name"),
        field_text(sound, "username")
    )
}

fn pack_line(pack: &freesound_client::Pack) -> String {
    format!("{}\t{}", field_text(pack, "id"), field_text(pack, "name"))
}

fn field_text(object: &FreesoundObject, name: &str) -> String {
    match object.get_opt(name) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    }
}

fn progress_printer() -> impl FnMut(RetrieveProgress) + Send {
    |progress: RetrieveProgress| {
        let written = progress.chunks * progress.chunk_size as u64;
        match progress.fraction() {
            Some(fraction) => eprint!("\r{:>5.1}%", fraction * 100.0),
            None => eprint!("\r{written} bytes"),
        }
        let _ = std::io::stderr().flush();
    }
}
