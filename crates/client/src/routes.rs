//! Pure, deterministic route classification.
//!
//! Every intercepted GET is classified into exactly one delivery
//! strategy by ordered rule precedence:
//!
//! 1. image extension -> cache-first into the image partition
//! 2. static prefix or static extension -> stale-while-revalidate into
//!    the static partition
//! 3. dynamic prefix -> network-first into the dynamic partition
//! 4. everything else -> network-first into the dynamic partition
//!
//! Classification is a function of the URL string alone; execution of
//! the chosen strategy lives in [`crate::manager`].

/// Delivery strategy for a classified request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from cache if present; only consult network on miss.
    CacheFirst,
    /// Always attempt network first; fall back to cache, then offline page.
    NetworkFirst,
    /// Serve cached value immediately; refresh in the background.
    StaleWhileRevalidate,
}

/// Logical partition type a classified request reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Static,
    Dynamic,
    Image,
}

/// Result of classifying one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub strategy: Strategy,
    pub partition: PartitionKind,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "ico"];
const STATIC_EXTENSIONS: &[&str] = &["css", "js", "woff", "woff2", "ttf", "eot"];

/// Classification rule table, fixed at startup.
#[derive(Debug, Clone)]
pub struct RouteTable {
    static_prefixes: Vec<String>,
    network_first_prefixes: Vec<String>,
}

impl RouteTable {
    pub fn new(static_prefixes: Vec<String>, network_first_prefixes: Vec<String>) -> Self {
        Self { static_prefixes, network_first_prefixes }
    }

    pub fn from_config(config: &hearth_core::AppConfig) -> Self {
        Self::new(config.static_prefixes.clone(), config.network_first_prefixes.clone())
    }

    /// Classify a URL into exactly one route.
    pub fn classify(&self, url: &str) -> Route {
        if has_extension(url, IMAGE_EXTENSIONS) {
            return Route { strategy: Strategy::CacheFirst, partition: PartitionKind::Image };
        }

        if self.static_prefixes.iter().any(|p| url.contains(p.as_str())) || has_extension(url, STATIC_EXTENSIONS) {
            return Route { strategy: Strategy::StaleWhileRevalidate, partition: PartitionKind::Static };
        }

        if self.network_first_prefixes.iter().any(|p| url.contains(p.as_str())) {
            return Route { strategy: Strategy::NetworkFirst, partition: PartitionKind::Dynamic };
        }

        Route { strategy: Strategy::NetworkFirst, partition: PartitionKind::Dynamic }
    }
}

/// Extension match on the path portion of the URL (query and fragment
/// are ignored, matching is case-insensitive).
fn has_extension(url: &str, extensions: &[&str]) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    match last_segment.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|e| *e == ext)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::from_config(&hearth_core::AppConfig::default())
    }

    #[test]
    fn test_classify_image_extensions() {
        let t = table();
        for url in [
            "https://example.com/assets/images/oven.jpg",
            "https://example.com/logo.PNG",
            "https://example.com/icon.svg?v=3",
            "https://example.com/favicon.ico",
        ] {
            let route = t.classify(url);
            assert_eq!(route.strategy, Strategy::CacheFirst, "{url}");
            assert_eq!(route.partition, PartitionKind::Image, "{url}");
        }
    }

    #[test]
    fn test_image_extension_beats_static_prefix() {
        // /assets/images/ is a static prefix, but the extension rule
        // has precedence.
        let route = table().classify("https://example.com/assets/images/hero.webp");
        assert_eq!(route.strategy, Strategy::CacheFirst);
        assert_eq!(route.partition, PartitionKind::Image);
    }

    #[test]
    fn test_classify_static_assets() {
        let t = table();
        for url in [
            "https://example.com/assets/css/styles.css",
            "https://example.com/assets/js/main.js?v=12",
            "https://fonts.gstatic.com/s/inter/v12/abc.woff2",
            "https://fonts.googleapis.com/css2?family=Inter",
        ] {
            let route = t.classify(url);
            assert_eq!(route.strategy, Strategy::StaleWhileRevalidate, "{url}");
            assert_eq!(route.partition, PartitionKind::Static, "{url}");
        }
    }

    #[test]
    fn test_classify_network_first_prefixes() {
        let t = table();
        for url in [
            "https://example.com/api/services",
            "https://example.com/booking/new",
            "https://example.com/contact/form",
        ] {
            let route = t.classify(url);
            assert_eq!(route.strategy, Strategy::NetworkFirst, "{url}");
            assert_eq!(route.partition, PartitionKind::Dynamic, "{url}");
        }
    }

    #[test]
    fn test_classify_default_falls_through() {
        let route = table().classify("https://example.com/about");
        assert_eq!(route.strategy, Strategy::NetworkFirst);
        assert_eq!(route.partition, PartitionKind::Dynamic);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let t = table();
        let a = t.classify("https://example.com/api/services?page=1");
        let b = t.classify("https://example.com/api/services?page=1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_extension_ignores_query() {
        // The query string must not contribute a phantom extension.
        let route = table().classify("https://example.com/api/report?format=png");
        assert_eq!(route.strategy, Strategy::NetworkFirst);
    }
}
