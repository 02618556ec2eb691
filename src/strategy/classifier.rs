//! Request Classifier
//!
//! Maps an intercepted URL to the category that selects its strategy.

use std::collections::HashSet;

use url::Url;

use crate::config::Config;

/// Request categories, in matching precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// Data-provider API call
    Api,
    /// Stylesheet, script, image, font or audio file
    StaticAsset,
    /// Navigable app route
    Page,
    /// Anything else
    Other,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    api_host_patterns: Vec<String>,
    api_path_patterns: Vec<String>,
    static_extensions: HashSet<String>,
    pages: HashSet<String>,
}

impl Classifier {
    pub fn new(
        api_host_patterns: Vec<String>,
        api_path_patterns: Vec<String>,
        static_extensions: impl IntoIterator<Item = String>,
        pages: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            api_host_patterns,
            api_path_patterns,
            static_extensions: static_extensions.into_iter().collect(),
            pages: pages.into_iter().collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_host_patterns.clone(),
            config.api_path_patterns.clone(),
            config.static_extensions.iter().cloned(),
            config.app_pages.iter().cloned(),
        )
    }

    /// Classifies `url`. Pure: depends only on the URL and the configured lists.
    pub fn classify(&self, url: &Url) -> RequestClass {
        if self.is_api(url) {
            RequestClass::Api
        } else if self.is_static_asset(url) {
            RequestClass::StaticAsset
        } else if self.is_page(url) {
            RequestClass::Page
        } else {
            RequestClass::Other
        }
    }

    fn is_api(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default();
        let path = url.path();
        self.api_host_patterns.iter().any(|p| host.contains(p.as_str()))
            || self.api_path_patterns.iter().any(|p| path.contains(p.as_str()))
    }

    fn is_static_asset(&self, url: &Url) -> bool {
        let last_segment = url.path().rsplit('/').next().unwrap_or_default();
        match last_segment.rsplit_once('.') {
            Some((_, ext)) => self.static_extensions.contains(ext),
            None => false,
        }
    }

    fn is_page(&self, url: &Url) -> bool {
        let path = url.path();
        path == "/" || self.pages.contains(path)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classify(url: &str) -> RequestClass {
        Classifier::from_config(&Config::default()).classify(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_api_by_host() {
        assert_eq!(
            classify("https://api.aladhan.com/v1/timings?latitude=1"),
            RequestClass::Api
        );
        assert_eq!(classify("https://server8.mp3quran.net/afs/001.mp3"), RequestClass::Api);
        assert_eq!(classify("https://hadith.gading.dev/books"), RequestClass::Api);
    }

    #[test]
    fn test_api_by_path() {
        assert_eq!(classify("http://localhost:8080/api/timings?x=1"), RequestClass::Api);
    }

    #[test]
    fn test_static_assets() {
        for url in [
            "http://localhost:8080/static/css/main.css",
            "http://localhost:8080/static/js/bundle.js",
            "http://localhost:8080/icons/app-icon.png",
            "http://localhost:8080/fonts/amiri.woff2",
            "http://localhost:8080/mecca_athan.mp3",
        ] {
            assert_eq!(classify(url), RequestClass::StaticAsset, "{}", url);
        }
    }

    #[test]
    fn test_pages() {
        assert_eq!(classify("http://localhost:8080/"), RequestClass::Page);
        assert_eq!(classify("http://localhost:8080/adhkar"), RequestClass::Page);
        assert_eq!(classify("http://localhost:8080/quran"), RequestClass::Page);
    }

    #[test]
    fn test_page_requires_exact_path() {
        assert_eq!(classify("http://localhost:8080/adhkar/morning"), RequestClass::Other);
        assert_eq!(classify("http://localhost:8080/quran/"), RequestClass::Other);
    }

    #[test]
    fn test_other() {
        assert_eq!(classify("http://localhost:8080/manifest"), RequestClass::Other);
        assert_eq!(classify("http://localhost:8080/static/js/"), RequestClass::Other);
    }

    #[test]
    fn test_extension_match_is_case_sensitive() {
        assert_eq!(classify("http://localhost:8080/a.CSS"), RequestClass::Other);
        assert_eq!(classify("http://localhost:8080/icons/app-icon.PNG"), RequestClass::Other);
        assert_eq!(classify("http://localhost:8080/a.css"), RequestClass::StaticAsset);
    }

    #[test]
    fn test_api_wins_over_static_extension() {
        assert_eq!(classify("http://localhost:8080/api/logo.png"), RequestClass::Api);
    }

    proptest! {
        // Extension matching ignores what precedes the last path segment
        #[test]
        fn prop_static_extension_anywhere(
            dir in "[b-z]{1,8}",
            file in "[a-z]{1,8}",
            ext in prop::sample::select(vec!["css", "js", "png", "svg", "ttf", "webp"])
        ) {
            let url = format!("http://localhost:8080/{}/{}.{}", dir, file, ext);
            prop_assert_eq!(classify(&url), RequestClass::StaticAsset);
        }

        // Classification is deterministic
        #[test]
        fn prop_classify_is_pure(path in "/[a-z/]{0,20}") {
            let url = format!("http://localhost:8080{}", path);
            prop_assert_eq!(classify(&url), classify(&url));
        }
    }
}
