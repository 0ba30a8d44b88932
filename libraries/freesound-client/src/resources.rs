//! Sound, user, and pack resources.
//!
//! Each resource is a [`FreesoundObject`] (all fields stay reachable through
//! `Deref`) plus the operations of its endpoint family.

use crate::download::{filename_from_uri, sanitize_filename, with_format_extension};
use crate::error::{FreesoundError, Result};
use crate::object::{FreesoundObject, FromObject};
use crate::pager::Pager;
use crate::params::QueryParams;
use crate::types::{Preview, RetrieveProgress};
use crate::uris;
use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::debug;

type Progress<'a> = Option<&'a mut (dyn FnMut(RetrieveProgress) + Send)>;

macro_rules! resource {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name(FreesoundObject);

        impl Deref for $name {
            type Target = FreesoundObject;

            fn deref(&self) -> &FreesoundObject {
                &self.0
            }
        }

        impl FromObject for $name {
            fn from_object(object: FreesoundObject) -> Result<Self> {
                Ok(Self(object))
            }
        }

        impl From<$name> for FreesoundObject {
            fn from(resource: $name) -> FreesoundObject {
                resource.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serde::Serialize::serialize(&self.0, serializer)
            }
        }
    };
}

// =============================================================================
// Sound
// =============================================================================

resource!(
    /// A Freesound sound.
    ///
    /// ```ignore
    /// let sound = client.get_sound(6, QueryParams::new()).await?;
    /// sound.retrieve_preview(Path::new("/tmp"), None, Preview::default()).await?;
    /// ```
    Sound
);

impl Sound {
    pub fn id(&self) -> Result<u64> {
        self.u64("id")
    }

    pub fn name(&self) -> Result<&str> {
        self.str("name")
    }

    /// Fetch this sound again, e.g. with more `fields`.
    pub async fn refresh(&self, params: QueryParams) -> Result<Sound> {
        self.client().get_sound(self.id()?, params).await
    }

    /// Download the original file into `directory` (requires OAuth2).
    ///
    /// The file is named `name`, or the sound's name, with `/` replaced by
    /// `_`. Returns the path written.
    pub async fn retrieve(
        &self,
        directory: &Path,
        name: Option<&str>,
        progress: Progress<'_>,
    ) -> Result<PathBuf> {
        let filename = match name {
            Some(name) => name,
            None => self.name()?,
        };
        let path = directory.join(sanitize_filename(filename));
        let uri = self.client().uri(uris::DOWNLOAD, &[&self.id()?]);
        self.client().retrieve(&uri, &path, progress).await?;
        Ok(path)
    }

    /// Download a preview into `directory`.
    ///
    /// Without `name`, the file is named after the last segment of the
    /// preview URI. A given `name` gets the preview's extension appended
    /// unless it already ends with it. The preview URIs must have been
    /// requested through the `fields` parameter (searches include them by
    /// default).
    pub async fn retrieve_preview(
        &self,
        directory: &Path,
        name: Option<&str>,
        preview: Preview,
    ) -> Result<PathBuf> {
        let key = preview.field_name();
        let previews = self.object("previews")?;
        let uri = previews.str(&key).map_err(|e| match e {
            FreesoundError::MissingField(field) => {
                FreesoundError::MissingField(format!("previews.{field}"))
            }
            other => other,
        })?;

        let filename = match name {
            Some(name) => with_format_extension(name, preview.format.extension()),
            None => filename_from_uri(uri).ok_or_else(|| {
                FreesoundError::parse(format!("preview URI has no file name: {uri}"))
            })?,
        };
        let path = directory.join(sanitize_filename(&filename));
        debug!(uri = %uri, path = %path.display(), "Retrieving preview");

        self.client().retrieve(uri, &path, None).await?;
        Ok(path)
    }

    /// Content-based descriptors of this sound.
    ///
    /// ```ignore
    /// let analysis = sound.get_analysis(Some("lowlevel.mfcc"), false).await?;
    /// let mean = analysis.lookup("lowlevel.mfcc.mean")?;
    /// ```
    pub async fn get_analysis(
        &self,
        descriptors: Option<&str>,
        normalized: bool,
    ) -> Result<FreesoundObject> {
        let uri = self.client().uri(uris::SOUND_ANALYSIS, &[&self.id()?]);
        let mut params = QueryParams::new();
        if let Some(descriptors) = descriptors {
            params = params.param("descriptors", descriptors);
        }
        if normalized {
            params = params.param("normalized", 1);
        }
        self.client().request(&uri, &params).await
    }

    /// Frame-by-frame analysis, from the sound's `analysis_frames` URI.
    pub async fn get_analysis_frames(&self) -> Result<FreesoundObject> {
        let uri = self.str("analysis_frames")?;
        self.client().request(uri, &QueryParams::new()).await
    }

    /// Sounds similar to this one.
    ///
    /// Relevant params: `page`, `page_size`, `fields`, `descriptors`,
    /// `normalized`, `descriptors_filter`.
    pub async fn get_similar(&self, params: QueryParams) -> Result<Pager<Sound>> {
        let uri = self.client().uri(uris::SIMILAR_SOUNDS, &[&self.id()?]);
        self.client().request(&uri, &params).await
    }

    /// User comments. Relevant params: `page`, `page_size`.
    pub async fn get_comments(&self, params: QueryParams) -> Result<Pager<FreesoundObject>> {
        let uri = self.client().uri(uris::COMMENTS, &[&self.id()?]);
        self.client().request(&uri, &params).await
    }
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.get_opt("id").map(ToString::to_string);
        write!(
            f,
            "<Sound: id=\"{}\", name=\"{}\">",
            id.as_deref().unwrap_or("n.a."),
            self.name().unwrap_or("n.a.")
        )
    }
}

// =============================================================================
// User
// =============================================================================

resource!(
    /// A Freesound user.
    User
);

impl User {
    pub fn username(&self) -> Result<&str> {
        self.str("username")
    }

    /// Fetch this user again.
    pub async fn refresh(&self) -> Result<User> {
        self.client().get_user(self.username()?).await
    }

    /// Sounds uploaded by the user.
    ///
    /// Relevant params: `page`, `page_size`, `fields`, `descriptors`,
    /// `normalized`.
    pub async fn get_sounds(&self, params: QueryParams) -> Result<Pager<Sound>> {
        let uri = self.client().uri(uris::USER_SOUNDS, &[&self.username()?]);
        self.client().request(&uri, &params).await
    }

    /// Packs created by the user. Relevant params: `page`, `page_size`.
    pub async fn get_packs(&self, params: QueryParams) -> Result<Pager<Pack>> {
        let uri = self.client().uri(uris::USER_PACKS, &[&self.username()?]);
        self.client().request(&uri, &params).await
    }

    /// Bookmark categories of the user. Relevant params: `page`, `page_size`.
    pub async fn get_bookmark_categories(
        &self,
        params: QueryParams,
    ) -> Result<Pager<FreesoundObject>> {
        let uri = self
            .client()
            .uri(uris::USER_BOOKMARK_CATEGORIES, &[&self.username()?]);
        self.client().request(&uri, &params).await
    }

    /// Sounds in one bookmark category.
    ///
    /// Relevant params: `page`, `page_size`, `fields`, `descriptors`,
    /// `normalized`.
    pub async fn get_bookmark_category_sounds(
        &self,
        category_id: u64,
        params: QueryParams,
    ) -> Result<Pager<Sound>> {
        let uri = self.client().uri(
            uris::USER_BOOKMARK_CATEGORY_SOUNDS,
            &[&self.username()?, &category_id],
        );
        self.client().request(&uri, &params).await
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User: \"{}\">", self.username().unwrap_or("n.a."))
    }
}

// =============================================================================
// Pack
// =============================================================================

resource!(
    /// A pack of sounds.
    Pack
);

impl Pack {
    pub fn id(&self) -> Result<u64> {
        self.u64("id")
    }

    pub fn name(&self) -> Result<&str> {
        self.str("name")
    }

    /// Fetch this pack again.
    pub async fn refresh(&self) -> Result<Pack> {
        self.client().get_pack(self.id()?).await
    }

    /// Sounds in the pack.
    ///
    /// Relevant params: `page`, `page_size`, `fields`, `descriptors`,
    /// `normalized`.
    pub async fn get_sounds(&self, params: QueryParams) -> Result<Pager<Sound>> {
        let uri = self.client().uri(uris::PACK_SOUNDS, &[&self.id()?]);
        self.client().request(&uri, &params).await
    }

    /// Download the pack as a zip archive into `directory` (requires OAuth2).
    ///
    /// Named `name`, or `<pack name>.zip`.
    pub async fn retrieve(
        &self,
        directory: &Path,
        name: Option<&str>,
        progress: Progress<'_>,
    ) -> Result<PathBuf> {
        let filename = match name {
            Some(name) => name.to_string(),
            None => with_format_extension(self.name()?, "zip"),
        };
        let path = directory.join(sanitize_filename(&filename));
        let uri = self.client().uri(uris::PACK_DOWNLOAD, &[&self.id()?]);
        self.client().retrieve(&uri, &path, progress).await?;
        Ok(path)
    }
}

impl fmt::Display for Pack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Pack: name=\"{}\">", self.name().unwrap_or("n.a."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FreesoundClient;
    use crate::types::ClientConfig;
    use serde_json::json;

    fn object(value: serde_json::Value) -> FreesoundObject {
        let client = FreesoundClient::new(ClientConfig::with_api_key("test")).unwrap();
        FreesoundObject::from_value(value, client).unwrap()
    }

    #[test]
    fn test_sound_accessors() {
        let sound = Sound::from_object(object(json!({"id": 96541, "name": "cello.wav"}))).unwrap();
        assert_eq!(sound.id().unwrap(), 96541);
        assert_eq!(sound.name().unwrap(), "cello.wav");
        assert_eq!(sound.to_string(), "<Sound: id=\"96541\", name=\"cello.wav\">");
    }

    #[test]
    fn test_display_without_fields() {
        let sound = Sound::from_object(object(json!({}))).unwrap();
        assert_eq!(sound.to_string(), "<Sound: id=\"n.a.\", name=\"n.a.\">");

        let user = User::from_object(object(json!({"username": "Jovica"}))).unwrap();
        assert_eq!(user.to_string(), "<User: \"Jovica\">");
    }

    #[test]
    fn test_fields_through_deref() {
        let pack = Pack::from_object(object(json!({"id": 3524, "num_sounds": 12}))).unwrap();
        assert_eq!(pack.u64("num_sounds").unwrap(), 12);
        assert!(matches!(pack.name(), Err(FreesoundError::MissingField(_))));
    }

    #[tokio::test]
    async fn test_preview_requires_previews_field() {
        let sound = Sound::from_object(object(json!({"id": 1, "name": "x"}))).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = sound
            .retrieve_preview(dir.path(), None, Preview::default())
            .await
            .unwrap_err();
        match err {
            FreesoundError::MissingField(field) => assert_eq!(field, "previews"),
            other => panic!("Expected MissingField, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_preview_missing_format() {
        let sound = Sound::from_object(object(json!({
            "id": 1,
            "previews": {"preview-lq-mp3": "https://cdn.freesound.org/previews/0/1_1-lq.mp3"}
        })))
        .unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = sound
            .retrieve_preview(
                dir.path(),
                None,
                Preview::new(crate::PreviewQuality::High, crate::PreviewFormat::Ogg),
            )
            .await
            .unwrap_err();
        match err {
            FreesoundError::MissingField(field) => assert_eq!(field, "previews.preview_hq_ogg"),
            other => panic!("Expected MissingField, got: {:?}", other),
        }
    }
}
