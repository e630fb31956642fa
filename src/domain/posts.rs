//! Post metadata table and the projections derived from it.
//!
//! The table is read from `posts.json` as a whole and never patched in place.
//! Field names follow that document (`publishDate`, `md5`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Language served at the unprefixed URL space.
pub const DEFAULT_LANG: &str = "en";

/// Per-language part of a post entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLang {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Content hash of the language document.
    #[serde(rename = "md5")]
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEntry {
    #[serde(default)]
    pub image: String,
    /// Directory holding one `{lang}.md` per language.
    pub path: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub publish_date: String,
    pub langs: BTreeMap<String, PostLang>,
}

/// Slug to entry mapping, the whole `posts.json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostsMetadata {
    posts: BTreeMap<String, PostEntry>,
}

/// One post in one language, flattened, plus the languages it exists in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedPostMeta {
    pub lang: String,
    pub slug: String,
    pub image: String,
    pub path: String,
    pub order: i64,
    pub publish_date: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "md5")]
    pub fingerprint: String,
    pub langs: Vec<String>,
}

/// Listing entry for a language's home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomePost {
    pub lang: String,
    pub slug: String,
    pub image: String,
    pub title: String,
    pub description: String,
    pub publish_date: String,
}

/// Render result for one post, as served by `/cache/post/...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPost {
    /// Unix timestamp in milliseconds taken when rendering finished.
    pub render_time: i64,
    pub meta: ExtendedPostMeta,
    pub html: String,
    pub nav_list: Vec<String>,
}

/// Link to the same post in another language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateLink {
    pub lang: String,
    pub href: String,
}

impl PostsMetadata {
    pub fn new(posts: BTreeMap<String, PostEntry>) -> Self {
        Self { posts }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Projects `(lang, slug)` out of the table.
    pub fn post_meta(&self, lang: &str, slug: &str) -> Result<ExtendedPostMeta, DomainError> {
        let entry = self
            .posts
            .get(slug)
            .ok_or_else(|| DomainError::not_found("post", slug))?;
        let localized = entry
            .langs
            .get(lang)
            .ok_or_else(|| DomainError::not_found("post language", format!("{slug}/{lang}")))?;

        Ok(ExtendedPostMeta {
            lang: lang.to_string(),
            slug: slug.to_string(),
            image: entry.image.clone(),
            path: entry.path.clone(),
            order: entry.order,
            publish_date: entry.publish_date.clone(),
            title: localized.title.clone(),
            description: localized.description.clone(),
            fingerprint: localized.fingerprint.clone(),
            langs: entry.langs.keys().cloned().collect(),
        })
    }

    /// Every post available in `lang`, ascending by `order`.
    ///
    /// Ties keep slug order so the listing is stable between loads.
    pub fn home_posts(&self, lang: &str) -> Vec<HomePost> {
        let mut listed: Vec<(i64, HomePost)> = self
            .posts
            .iter()
            .filter_map(|(slug, entry)| {
                let localized = entry.langs.get(lang)?;
                Some((
                    entry.order,
                    HomePost {
                        lang: lang.to_string(),
                        slug: slug.clone(),
                        image: entry.image.clone(),
                        title: localized.title.clone(),
                        description: localized.description.clone(),
                        publish_date: entry.publish_date.clone(),
                    },
                ))
            })
            .collect();
        listed.sort_by_key(|(order, _)| *order);
        listed.into_iter().map(|(_, post)| post).collect()
    }
}

impl ExtendedPostMeta {
    /// Path of the Markdown document relative to the content root.
    pub fn document_path(&self) -> String {
        format!("{}/{}.md", self.path.trim_end_matches('/'), self.lang)
    }

    /// Absolute links to every language this post exists in.
    pub fn alternates(&self, base_url: &str) -> Vec<AlternateLink> {
        self.langs
            .iter()
            .map(|lang| AlternateLink {
                lang: lang.clone(),
                href: post_full_url(base_url, lang, &self.slug),
            })
            .collect()
    }
}

pub fn post_url(lang: &str, slug: &str) -> String {
    if lang == DEFAULT_LANG {
        format!("/posts/{slug}")
    } else {
        format!("/{lang}/posts/{slug}")
    }
}

pub fn post_full_url(base_url: &str, lang: &str, slug: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), post_url(lang, slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PostsMetadata {
        serde_json::from_str(
            r#"{
                "hello-world": {
                    "image": "/img/hello.png",
                    "path": "posts/hello-world",
                    "order": 2,
                    "publishDate": "2024-03-01",
                    "langs": {
                        "en": { "title": "Hello", "description": "First", "md5": "aaa" },
                        "zh": { "title": "你好", "description": "第一", "md5": "bbb" }
                    }
                },
                "second": {
                    "image": "",
                    "path": "posts/second/",
                    "order": 1,
                    "publishDate": "2024-04-01",
                    "langs": {
                        "en": { "title": "Second", "description": "", "md5": "ccc" }
                    }
                }
            }"#,
        )
        .expect("valid metadata")
    }

    #[test]
    fn post_meta_flattens_language_entry() {
        let meta = sample().post_meta("zh", "hello-world").expect("meta");

        assert_eq!(meta.title, "你好");
        assert_eq!(meta.fingerprint, "bbb");
        assert_eq!(meta.langs, vec!["en".to_string(), "zh".to_string()]);
        assert_eq!(meta.document_path(), "posts/hello-world/zh.md");
    }

    #[test]
    fn missing_slug_or_language_is_not_found() {
        let posts = sample();

        assert!(matches!(
            posts.post_meta("en", "nope"),
            Err(DomainError::NotFound { entity: "post", .. })
        ));
        assert!(matches!(
            posts.post_meta("zh", "second"),
            Err(DomainError::NotFound {
                entity: "post language",
                ..
            })
        ));
    }

    #[test]
    fn home_posts_filter_by_language_and_sort_by_order() {
        let posts = sample();

        let en: Vec<_> = posts
            .home_posts("en")
            .into_iter()
            .map(|post| post.slug)
            .collect();
        assert_eq!(en, vec!["second".to_string(), "hello-world".to_string()]);

        let zh = posts.home_posts("zh");
        assert_eq!(zh.len(), 1);
        assert_eq!(zh[0].title, "你好");
        assert!(posts.home_posts("fr").is_empty());
    }

    #[test]
    fn trailing_slash_in_path_is_normalised() {
        let meta = sample().post_meta("en", "second").expect("meta");
        assert_eq!(meta.document_path(), "posts/second/en.md");
    }

    #[test]
    fn urls_omit_default_language_prefix() {
        assert_eq!(post_url("en", "hello"), "/posts/hello");
        assert_eq!(post_url("zh", "hello"), "/zh/posts/hello");
        assert_eq!(
            post_full_url("https://blog.example/", "zh", "hello"),
            "https://blog.example/zh/posts/hello"
        );
    }

    #[test]
    fn alternates_cover_every_language() {
        let meta = sample().post_meta("en", "hello-world").expect("meta");
        let links = meta.alternates("https://blog.example");

        assert_eq!(
            links,
            vec![
                AlternateLink {
                    lang: "en".into(),
                    href: "https://blog.example/posts/hello-world".into(),
                },
                AlternateLink {
                    lang: "zh".into(),
                    href: "https://blog.example/zh/posts/hello-world".into(),
                },
            ]
        );
    }

    #[test]
    fn serialises_with_document_field_names() {
        let meta = sample().post_meta("en", "second").expect("meta");
        let json = serde_json::to_value(&meta).expect("json");

        assert_eq!(json["md5"], "ccc");
        assert_eq!(json["publishDate"], "2024-04-01");
        assert!(json.get("fingerprint").is_none());
    }
}
