//! Freesound API endpoint templates.
//!
//! Templates are paths relative to the API root with `<name>` placeholders,
//! filled in order by [`expand`].

use std::fmt::Display;

pub const BASE: &str = "https://freesound.org/apiv2";

pub const TEXT_SEARCH: &str = "/search/text/";
pub const CONTENT_SEARCH: &str = "/search/content/";
pub const COMBINED_SEARCH: &str = "/search/combined/";
pub const SOUND: &str = "/sounds/<sound_id>/";
pub const SOUND_ANALYSIS: &str = "/sounds/<sound_id>/analysis/";
pub const SIMILAR_SOUNDS: &str = "/sounds/<sound_id>/similar/";
pub const COMMENTS: &str = "/sounds/<sound_id>/comments/";
pub const DOWNLOAD: &str = "/sounds/<sound_id>/download/";
pub const ME: &str = "/me/";
pub const USER: &str = "/users/<username>/";
pub const USER_SOUNDS: &str = "/users/<username>/sounds/";
pub const USER_PACKS: &str = "/users/<username>/packs/";
pub const USER_BOOKMARK_CATEGORIES: &str = "/users/<username>/bookmark_categories/";
pub const USER_BOOKMARK_CATEGORY_SOUNDS: &str =
    "/users/<username>/bookmark_categories/<category_id>/sounds/";
pub const PACK: &str = "/packs/<pack_id>/";
pub const PACK_SOUNDS: &str = "/packs/<pack_id>/sounds/";
pub const PACK_DOWNLOAD: &str = "/packs/<pack_id>/download/";

/// Substitute `args` into the placeholders of `template`, left to right.
///
/// Each value is percent-encoded. Surplus placeholders are left untouched.
pub fn expand(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut args = args.iter();

    while let Some(start) = rest.find('<') {
        let Some(len) = rest[start..].find('>') else {
            break;
        };
        let Some(arg) = args.next() else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&urlencoding::encode(&arg.to_string()));
        rest = &rest[start + len + 1..];
    }

    out.push_str(rest);
    out
}
