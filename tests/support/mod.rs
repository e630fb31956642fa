//! Shared doubles for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use folio::application::content::{ContentError, PostsOrigin};
use folio::cache::{CacheError, RemoteTier};
use folio::domain::posts::{PostsMetadata, RenderedPost};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Get(String),
    Set {
        key: String,
        value: String,
        ttl: Duration,
    },
    Delete(String),
}

/// In-memory remote tier that records every call.
#[derive(Default)]
pub struct RecordingRemote {
    entries: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<RemoteCall>>,
    get_delay: Mutex<Duration>,
    failing: AtomicBool,
}

impl RecordingRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn with_get_delay(self, delay: Duration) -> Self {
        *self.get_delay.lock().unwrap() = delay;
        self
    }

    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sets(&self) -> Vec<RemoteCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, RemoteCall::Set { .. }))
            .collect()
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::remote("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteTier for RecordingRemote {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.record(RemoteCall::Get(key.to_string()));
        let delay = *self.get_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.record(RemoteCall::Set {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        });
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.record(RemoteCall::Delete(key.to_string()));
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Origin double answering from fixed data and counting requests.
pub struct FakeOrigin {
    pub metadata: PostsMetadata,
    pub rendered: HashMap<(String, String), RenderedPost>,
    pub meta_calls: AtomicUsize,
    pub post_calls: AtomicUsize,
    pub fail_metadata: AtomicBool,
}

impl FakeOrigin {
    pub fn new(metadata: PostsMetadata) -> Self {
        Self {
            metadata,
            rendered: HashMap::new(),
            meta_calls: AtomicUsize::new(0),
            post_calls: AtomicUsize::new(0),
            fail_metadata: AtomicBool::new(false),
        }
    }

    pub fn with_rendered(mut self, post: RenderedPost) -> Self {
        self.rendered
            .insert((post.meta.lang.clone(), post.meta.slug.clone()), post);
        self
    }

    pub fn meta_calls(&self) -> usize {
        self.meta_calls.load(Ordering::SeqCst)
    }

    pub fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostsOrigin for FakeOrigin {
    async fn fetch_posts_metadata(&self) -> Result<PostsMetadata, ContentError> {
        self.meta_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(ContentError::upstream("origin returned 502"));
        }
        Ok(self.metadata.clone())
    }

    async fn fetch_rendered_post(
        &self,
        lang: &str,
        slug: &str,
        _fingerprint: &str,
    ) -> Result<RenderedPost, ContentError> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        self.rendered
            .get(&(lang.to_string(), slug.to_string()))
            .cloned()
            .ok_or_else(|| ContentError::NotFound(format!("post `{lang}/{slug}`")))
    }
}

/// Two posts, `hello` in en/zh and `rust-notes` in en only.
pub fn sample_metadata_json() -> &'static str {
    r#"{
  "hello": {
    "image": "/images/hello.png",
    "path": "posts/hello",
    "order": 2,
    "publishDate": "2024-03-01",
    "langs": {
      "en": { "title": "Hello", "description": "First post", "md5": "fp-hello-en" },
      "zh": { "title": "你好", "description": "第一篇", "md5": "fp-hello-zh" }
    }
  },
  "rust-notes": {
    "image": "/images/rust.png",
    "path": "posts/rust-notes",
    "order": 1,
    "publishDate": "2024-01-15",
    "langs": {
      "en": { "title": "Rust notes", "description": "Ownership", "md5": "fp-rust-en" }
    }
  }
}"#
}

pub fn sample_metadata() -> PostsMetadata {
    serde_json::from_str(sample_metadata_json()).expect("sample metadata")
}
