//! Cache key layout shared by every instance.
//!
//! Keys are part of the remote tier contract; changing them orphans entries
//! written by other deployments.

/// Key holding the full posts metadata document.
pub const POSTS_META_KEY: &str = "posts-meta";

/// Key for one rendered post. The fingerprint makes content edits miss.
pub fn rendered_post_key(lang: &str, slug: &str, fingerprint: &str) -> String {
    format!("post/{lang}/{slug}/{fingerprint}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_post_key_embeds_fingerprint() {
        assert_eq!(
            rendered_post_key("en", "hello-world", "9f86d0"),
            "post/en/hello-world/9f86d0"
        );
        assert_ne!(
            rendered_post_key("en", "hello-world", "9f86d0"),
            rendered_post_key("en", "hello-world", "a1b2c3")
        );
    }
}
