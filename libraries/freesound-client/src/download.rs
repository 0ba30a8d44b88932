//! Streaming file retrieval.

use crate::client::FreesoundClient;
use crate::error::{FreesoundError, Result};
use crate::params::QueryParams;
use crate::types::RetrieveProgress;
use futures_util::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

type Progress<'a> = Option<&'a mut (dyn FnMut(RetrieveProgress) + Send)>;

/// Download `uri` into `path`.
///
/// The body is written to `<path>.part` and renamed over `path` once it
/// is complete, so a failed download never leaves a truncated file at the
/// destination. Every failure is reported as [`FreesoundError::Retrieval`].
pub(crate) async fn retrieve(
    client: &FreesoundClient,
    uri: &str,
    path: &Path,
    chunk_size: usize,
    progress: Progress<'_>,
) -> Result<()> {
    debug!(uri = %uri, dest = %path.display(), "Retrieving file");

    fetch_into(client, uri, path, chunk_size, progress)
        .await
        .map_err(|e| FreesoundError::retrieval(path, e))
}

async fn fetch_into(
    client: &FreesoundClient,
    uri: &str,
    path: &Path,
    chunk_size: usize,
    progress: Progress<'_>,
) -> Result<()> {
    // Status is checked here, before anything touches the filesystem.
    let response = client.send(uri, &QueryParams::new()).await?;
    let total_size = response.content_length();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = partial_path(path);
    let written = match write_file(
        &partial,
        response.bytes_stream(),
        chunk_size,
        total_size,
        progress,
    )
    .await
    {
        Ok(written) => written,
        Err(e) => {
            discard(&partial).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&partial, path).await {
        discard(&partial).await;
        return Err(e.into());
    }

    info!(dest = %path.display(), size = written, "File retrieved");
    Ok(())
}

async fn write_file<S, B, E>(
    partial: &Path,
    stream: S,
    chunk_size: usize,
    total_size: Option<u64>,
    progress: Progress<'_>,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<FreesoundError>,
{
    let mut file = File::create(partial).await?;
    let written = write_chunks(stream, &mut file, chunk_size, total_size, progress).await?;
    file.sync_all().await?;
    Ok(written)
}

async fn discard(partial: &Path) {
    if let Err(e) = tokio::fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %partial.display(), error = %e, "Failed to remove partial download");
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Copy a byte stream into `writer` in blocks of exactly `chunk_size`
/// bytes (the last block may be shorter), whatever sizes the stream
/// yields.
///
/// `progress` is called once with zero blocks before reading starts and
/// then after every block. Returns the number of bytes written.
pub(crate) async fn write_chunks<S, B, E, W>(
    stream: S,
    writer: &mut W,
    chunk_size: usize,
    total_size: Option<u64>,
    mut progress: Progress<'_>,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<FreesoundError>,
    W: AsyncWrite + Unpin,
{
    let chunk_size = chunk_size.max(1);
    let mut stream = std::pin::pin!(stream);
    let mut buffer = Vec::with_capacity(chunk_size);
    let mut chunks = 0u64;
    let mut written = 0u64;

    report(&mut progress, chunks, chunk_size, total_size);

    while let Some(piece) = stream.next().await {
        let piece = piece.map_err(Into::<FreesoundError>::into)?;
        let mut data = piece.as_ref();

        while !data.is_empty() {
            let take = (chunk_size - buffer.len()).min(data.len());
            buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            if buffer.len() == chunk_size {
                writer.write_all(&buffer).await?;
                written += buffer.len() as u64;
                buffer.clear();
                chunks += 1;
                report(&mut progress, chunks, chunk_size, total_size);
            }
        }
    }

    if !buffer.is_empty() {
        writer.write_all(&buffer).await?;
        written += buffer.len() as u64;
        chunks += 1;
        report(&mut progress, chunks, chunk_size, total_size);
    }

    writer.flush().await?;
    Ok(written)
}

fn report(progress: &mut Progress<'_>, chunks: u64, chunk_size: usize, total_size: Option<u64>) {
    if let Some(callback) = progress.as_deref_mut() {
        callback(RetrieveProgress {
            chunks,
            chunk_size,
            total_size,
        });
    }
}

// =============================================================================
// File names
// =============================================================================

/// Last path segment of a URI, percent-decoded, without the query string.
pub fn filename_from_uri(uri: &str) -> Option<String> {
    let url = url::Url::parse(uri).ok()?;
    let segment = url.path_segments()?.last().filter(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(segment).ok()?;
    Some(sanitize_filename(&decoded))
}

/// Append `.format` unless `name` already ends with that extension.
///
/// ```ignore
/// assert_eq!(with_format_extension("rain", "wav"), "rain.wav");
/// assert_eq!(with_format_extension("rain.wav", "wav"), "rain.wav");
/// assert_eq!(with_format_extension("rain.wav", "mp3"), "rain.wav.mp3");
/// ```
pub fn with_format_extension(name: &str, format: &str) -> String {
    let suffix = name.rsplit('.').next().unwrap_or(name);
    if name.contains('.') && suffix == format {
        name.to_string()
    } else {
        format!("{name}.{format}")
    }
}

/// Make a server-provided name safe to use as a single path component.
pub fn sanitize_filename(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn pieces(sizes: &[usize]) -> Vec<std::result::Result<Vec<u8>, std::io::Error>> {
        sizes.iter().map(|&n| Ok(vec![7u8; n])).collect()
    }

    #[tokio::test]
    async fn test_rechunks_to_fixed_blocks() {
        let mut out = Vec::new();
        let mut seen = Vec::new();
        let mut callback = |p: RetrieveProgress| seen.push((p.chunks, p.total_size));

        let written = write_chunks(
            stream::iter(pieces(&[3, 15, 7])),
            &mut out,
            10,
            Some(25),
            Some(&mut callback),
        )
        .await
        .unwrap();

        assert_eq!(written, 25);
        assert_eq!(out.len(), 25);
        assert_eq!(
            seen,
            [(0, Some(25)), (1, Some(25)), (2, Some(25)), (3, Some(25))]
        );
    }

    #[tokio::test]
    async fn test_unknown_total_size() {
        let mut out = Vec::new();
        let mut last = None;
        let mut callback = |p: RetrieveProgress| last = Some(p);

        let written = write_chunks(
            stream::iter(pieces(&[7, 13])),
            &mut out,
            10,
            None,
            Some(&mut callback),
        )
        .await
        .unwrap();

        assert_eq!(written, 20);
        assert_eq!(out.len(), 20);
        let last = last.expect("progress reported");
        assert_eq!(last.chunks, 2);
        assert_eq!(last.total_size, None);
        assert_eq!(last.fraction(), None);
    }

    #[tokio::test]
    async fn test_empty_body_reports_start_only() {
        let mut out = Vec::new();
        let mut calls = 0;
        let mut callback = |p: RetrieveProgress| {
            assert_eq!(p.chunks, 0);
            calls += 1;
        };

        let written = write_chunks(
            stream::iter(pieces(&[])),
            &mut out,
            10,
            Some(0),
            Some(&mut callback),
        )
        .await
        .unwrap();

        assert_eq!(written, 0);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let items: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(vec![1; 4]),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let mut out = Vec::new();

        let result = write_chunks(stream::iter(items), &mut out, 10, None, None).await;
        assert!(matches!(result, Err(FreesoundError::Io(_))));
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/sounds/rain.wav")),
            PathBuf::from("/tmp/sounds/rain.wav.part")
        );
    }

    #[test]
    fn test_filename_from_uri() {
        assert_eq!(
            filename_from_uri("https://cdn.freesound.org/previews/96/96541_1-lq.mp3?x=1"),
            Some("96541_1-lq.mp3".to_string())
        );
        assert_eq!(
            filename_from_uri("https://example.com/a/my%20file.ogg"),
            Some("my file.ogg".to_string())
        );
        assert_eq!(filename_from_uri("https://example.com/dir/"), None);
        assert_eq!(filename_from_uri("not a uri"), None);
    }

    #[test]
    fn test_with_format_extension() {
        assert_eq!(with_format_extension("rain", "wav"), "rain.wav");
        assert_eq!(with_format_extension("rain.wav", "wav"), "rain.wav");
        assert_eq!(with_format_extension("rain.wav", "mp3"), "rain.wav.mp3");
        assert_eq!(with_format_extension("wav", "wav"), "wav.wav");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("drums/kick 01.wav"), "drums_kick 01.wav");
        assert_eq!(sanitize_filename("plain.wav"), "plain.wav");
    }
}
