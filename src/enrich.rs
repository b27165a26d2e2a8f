/// Wiki reference enrichment for alerts.
///
/// Alerts link to the team wiki article describing the matched peatland.
/// The lookup is best-effort: a search request against the wiki, scraping
/// the first article link out of the result page, with a JSON file cache
/// keyed by polygon id so repeated runs stay off the network. Failures of
/// any kind degrade to `None` — enrichment must never block alert
/// generation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use crate::logging::{self, Component};

const BASE_SEARCH_URL: &str = "https://wiki.simargl-team.ru/public/index.php?search=";
const WIKI_ORIGIN: &str = "https://wiki.simargl-team.ru";

// ---------------------------------------------------------------------------
// Capability interface
// ---------------------------------------------------------------------------

/// Best-effort lookup of a reference URL for a peatland id.
pub trait ReferenceLookup {
    fn lookup(&self, unique_id: i64) -> Option<String>;
}

/// Fixed id-to-url table. Test double, also usable for offline runs.
#[derive(Debug, Default)]
pub struct StaticLookup {
    entries: HashMap<i64, String>,
}

impl StaticLookup {
    pub fn new(entries: HashMap<i64, String>) -> Self {
        Self { entries }
    }
}

impl ReferenceLookup for StaticLookup {
    fn lookup(&self, unique_id: i64) -> Option<String> {
        self.entries.get(&unique_id).cloned()
    }
}

// ---------------------------------------------------------------------------
// Wiki HTTP lookup
// ---------------------------------------------------------------------------

/// HTTP lookup against the team wiki with a file-backed cache.
///
/// Cache entries record misses as JSON null so a peatland with no article
/// is not re-searched every run. The cache file is rewritten after each
/// new entry; a corrupt or missing cache file starts empty.
pub struct WikiLookup {
    client: reqwest::blocking::Client,
    cache_path: String,
    cache: RefCell<HashMap<String, Option<String>>>,
}

impl WikiLookup {
    pub fn new(cache_path: &str, timeout: Duration) -> Self {
        let cache = load_cache(cache_path);
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            client,
            cache_path: cache_path.to_string(),
            cache: RefCell::new(cache),
        }
    }

    fn search(&self, unique_id: &str) -> Option<String> {
        let url = format!("{}{}", BASE_SEARCH_URL, unique_id);
        let response = match self.client.get(&url).send() {
            Ok(r) => r,
            Err(e) => {
                logging::warn(
                    Component::Alert,
                    Some(unique_id),
                    &format!("wiki search failed: {}", e),
                );
                return None;
            }
        };

        if !response.status().is_success() {
            logging::warn(
                Component::Alert,
                Some(unique_id),
                &format!("wiki search HTTP {}", response.status()),
            );
            return None;
        }

        let body = response.text().ok()?;
        find_article_link(&body)
    }

    fn save_cache(&self) {
        let cache = self.cache.borrow();
        match serde_json::to_string_pretty(&*cache) {
            Ok(text) => {
                if let Err(e) = std::fs::write(&self.cache_path, text) {
                    logging::warn(
                        Component::Alert,
                        None,
                        &format!("cannot write wiki cache {}: {}", self.cache_path, e),
                    );
                }
            }
            Err(e) => {
                logging::warn(Component::Alert, None, &format!("cannot serialize wiki cache: {}", e));
            }
        }
    }
}

impl ReferenceLookup for WikiLookup {
    fn lookup(&self, unique_id: i64) -> Option<String> {
        let key = unique_id.to_string();

        if let Some(cached) = self.cache.borrow().get(&key) {
            return cached.clone();
        }

        let found = self.search(&key);
        self.cache.borrow_mut().insert(key, found.clone());
        self.save_cache();
        found
    }
}

fn load_cache(path: &str) -> HashMap<String, Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
        Err(_) => HashMap::new(),
    }
}

/// First article link in a wiki search result page: an `/index.php/` href
/// that is not a redlink (missing article).
fn find_article_link(body: &str) -> Option<String> {
    for line in body.lines() {
        if line.contains("/index.php/") && !line.contains("redlink=1") {
            let start = line.find("/index.php/")?;
            let end = line[start..].find('"').map(|e| start + e)?;
            let link = line[start..end].replace("&amp;", "&");
            return Some(format!("{}{}", WIKI_ORIGIN, link));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_find_article_link_picks_first_non_redlink() {
        let body = r#"
            <a href="/index.php?title=Missing&amp;redlink=1">missing</a>
            <a href="/index.php/%D0%A2%D0%BE%D1%80%D1%84%D1%8F%D0%BD%D0%B8%D0%BA_42" title="x">hit</a>
            <a href="/index.php/Other_7">later</a>
        "#;
        let link = find_article_link(body).expect("should find a link");
        assert_eq!(
            link,
            "https://wiki.simargl-team.ru/index.php/%D0%A2%D0%BE%D1%80%D1%84%D1%8F%D0%BD%D0%B8%D0%BA_42"
        );
    }

    #[test]
    fn test_find_article_link_unescapes_amp() {
        let body = r#"<a href="/index.php/Page?a=1&amp;b=2">x</a>"#;
        let link = find_article_link(body).expect("should find a link");
        assert!(link.ends_with("/index.php/Page?a=1&b=2"));
    }

    #[test]
    fn test_find_article_link_none_when_absent() {
        assert_eq!(find_article_link("<html>nothing here</html>"), None);
        let only_redlinks = r#"<a href="/index.php?title=X&amp;redlink=1">x</a>"#;
        assert_eq!(find_article_link(only_redlinks), None);
    }

    #[test]
    fn test_cached_entries_answer_without_network() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"42": "https://wiki.simargl-team.ru/index.php/Bog_42", "7": null}}"#
        )
        .expect("write cache");

        // Zero timeout: any network attempt would fail instantly, so a
        // successful answer proves the cache was used.
        let lookup = WikiLookup::new(file.path().to_str().unwrap(), Duration::from_millis(1));

        assert_eq!(
            lookup.lookup(42),
            Some("https://wiki.simargl-team.ru/index.php/Bog_42".to_string())
        );
        // Cached miss stays a miss without a new search
        assert_eq!(lookup.lookup(7), None);
    }

    #[test]
    fn test_corrupt_cache_starts_empty() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json at all").expect("write cache");
        let cache = load_cache(file.path().to_str().unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_static_lookup() {
        let lookup = StaticLookup::new(HashMap::from([(1, "https://example/A_1".to_string())]));
        assert_eq!(lookup.lookup(1), Some("https://example/A_1".to_string()));
        assert_eq!(lookup.lookup(2), None);
    }
}
