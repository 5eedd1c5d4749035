//! Integration tests for the mirror engine
//!
//! These tests drive the real scheduler and renderer against an in-memory
//! browser that serves a fixed set of pages, and check the resulting tree.

use async_trait::async_trait;
use site_mirror::browser::{
    BrowserEngine, BrowserError, CaptureLog, CapturedResponse, NavigationOptions, Tab,
};
use site_mirror::config::{DenyEntry, DispatchMode, MirrorConfig};
use site_mirror::crawler::mirror_with;
use site_mirror::filter::RequestFilter;
use site_mirror::MirrorError;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;

/// A resource the fake browser can serve
#[derive(Clone)]
struct Resource {
    status: u16,
    content_type: &'static str,
    body: String,
    from_cache: bool,
}

/// A page plus the sub-resources it loads
#[derive(Clone)]
struct FakePage {
    document: Resource,
    loads: Vec<String>,
    times_out: bool,
}

#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, FakePage>,
    assets: HashMap<String, Resource>,
}

impl FakeSite {
    fn page(mut self, url: &str, html: &str, loads: &[&str]) -> Self {
        self.pages.insert(
            url.to_string(),
            FakePage {
                document: Resource {
                    status: 200,
                    content_type: "text/html; charset=utf-8",
                    body: html.to_string(),
                    from_cache: false,
                },
                loads: loads.iter().map(|s| s.to_string()).collect(),
                times_out: false,
            },
        );
        self
    }

    fn asset(mut self, url: &str, status: u16, content_type: &'static str, body: &str) -> Self {
        self.assets.insert(
            url.to_string(),
            Resource {
                status,
                content_type,
                body: body.to_string(),
                from_cache: false,
            },
        );
        self
    }

    /// Marks an asset as served from the browser cache
    fn cached(mut self, url: &str) -> Self {
        if let Some(asset) = self.assets.get_mut(url) {
            asset.from_cache = true;
        }
        self
    }

    /// Makes navigation to a page time out after its loads were captured
    fn timing_out(mut self, url: &str) -> Self {
        if let Some(page) = self.pages.get_mut(url) {
            page.times_out = true;
        }
        self
    }
}

struct FakeBrowser {
    site: Arc<FakeSite>,
    visits: Arc<Mutex<Vec<String>>>,
    open_tabs: Arc<AtomicUsize>,
    refuse_tabs: bool,
}

impl FakeBrowser {
    fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            visits: Arc::new(Mutex::new(Vec::new())),
            open_tabs: Arc::new(AtomicUsize::new(0)),
            refuse_tabs: false,
        }
    }

    fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserEngine for FakeBrowser {
    type Tab = FakeTab;

    async fn open_tab(&self) -> Result<FakeTab, BrowserError> {
        if self.refuse_tabs {
            return Err(BrowserError::Tab("no more tabs".to_string()));
        }
        self.open_tabs.fetch_add(1, Ordering::SeqCst);
        Ok(FakeTab {
            site: self.site.clone(),
            visits: self.visits.clone(),
            open_tabs: self.open_tabs.clone(),
            filter: None,
            log: CaptureLog::default(),
            bodies: HashMap::new(),
            current: None,
        })
    }

    async fn close(self) -> Result<(), BrowserError> {
        Ok(())
    }
}

struct FakeTab {
    site: Arc<FakeSite>,
    visits: Arc<Mutex<Vec<String>>>,
    open_tabs: Arc<AtomicUsize>,
    filter: Option<Arc<RequestFilter>>,
    log: CaptureLog,
    bodies: HashMap<String, String>,
    current: Option<(Url, String)>,
}

impl FakeTab {
    fn record(&mut self, url: &str, resource: &Resource) {
        let request_id = format!("{}-{}", self.log.responses.len(), url);
        self.bodies.insert(request_id.clone(), resource.body.clone());
        self.log.responses.push(CapturedResponse {
            request_id,
            url: url.to_string(),
            status: resource.status,
            content_type: resource.content_type.to_string(),
            from_cache: resource.from_cache,
        });
    }

    fn blocked(&self, url: &str) -> bool {
        self.filter.as_ref().is_some_and(|f| f.is_blocked(url))
    }
}

fn inner_html(html: &str, selectors: &[String]) -> Vec<Vec<String>> {
    let document = scraper::Html::parse_document(html);
    selectors
        .iter()
        .map(|s| match scraper::Selector::parse(s) {
            Ok(selector) => document.select(&selector).map(|el| el.inner_html()).collect(),
            Err(_) => Vec::new(),
        })
        .collect()
}

fn anchors(base: &Url, html: &str) -> Vec<String> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse("a[href]").unwrap();
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(|url| url.to_string())
        .collect()
}

#[async_trait]
impl Tab for FakeTab {
    async fn start_capture(&mut self, filter: Arc<RequestFilter>) -> Result<(), BrowserError> {
        self.filter = Some(filter);
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &Url,
        options: &NavigationOptions,
    ) -> Result<(), BrowserError> {
        self.visits.lock().unwrap().push(url.to_string());

        let Some(page) = self.site.pages.get(url.as_str()).cloned() else {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        };

        if self.blocked(url.as_str()) {
            self.log.blocked += 1;
        } else {
            self.record(url.as_str(), &page.document);
        }

        for load in &page.loads {
            if self.blocked(load) {
                self.log.blocked += 1;
                continue;
            }
            if let Some(asset) = self.site.assets.get(load).cloned() {
                self.record(load, &asset);
            }
        }

        self.current = Some((url.clone(), page.document.body));

        if page.times_out {
            return Err(BrowserError::Timeout {
                url: url.to_string(),
                timeout: options.timeout,
            });
        }
        Ok(())
    }

    async fn finish_capture(&mut self) -> CaptureLog {
        std::mem::take(&mut self.log)
    }

    async fn response_body(&self, response: &CapturedResponse) -> Result<Vec<u8>, BrowserError> {
        self.bodies
            .get(&response.request_id)
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| BrowserError::Protocol("no body".to_string()))
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self
            .current
            .as_ref()
            .map(|(_, html)| html.clone())
            .unwrap_or_else(|| "<html><head></head><body></body></html>".to_string()))
    }

    async fn select_inner_html(
        &self,
        selectors: &[String],
    ) -> Result<Vec<Vec<String>>, BrowserError> {
        let html = self.content().await?;
        Ok(inner_html(&html, selectors))
    }

    async fn anchor_hrefs(&self) -> Result<Vec<String>, BrowserError> {
        Ok(match &self.current {
            Some((base, html)) => anchors(base, html),
            None => Vec::new(),
        })
    }

    async fn close(self) -> Result<(), BrowserError> {
        self.open_tabs.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Creates a configuration writing into `out` with the given seeds
fn create_test_config(out: &Path, seeds: &[&str]) -> MirrorConfig {
    let mut config = MirrorConfig::default();
    config.output.directory = out.to_path_buf();
    config.crawler.seeds = seeds.iter().map(|s| s.to_string()).collect();
    config
}

/// Reads the whole tree under `root` into a path -> contents map
fn snapshot_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, files);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
                files.insert(relative, std::fs::read(&path).unwrap());
            }
        }
    }

    let mut files = BTreeMap::new();
    if root.exists() {
        walk(root, root, &mut files);
    }
    files
}

fn docs_site() -> FakeSite {
    FakeSite::default()
        .page(
            "https://a.com/docs/",
            r#"<html><head><link rel="stylesheet" href="/style.css"></head><body>
            <h1>Docs</h1>
            <a href="/docs/intro">Intro</a>
            <a href="/docs/guide/#setup">Guide</a>
            <a href="/blog/post">Blog</a>
            <a href="https://b.com/docs/elsewhere">Elsewhere</a>
            </body></html>"#,
            &["https://a.com/style.css", "https://a.com/img/logo.png"],
        )
        .page(
            "https://a.com/docs/intro",
            r#"<html><body><h1>Intro</h1><a href="/docs/">Back</a></body></html>"#,
            &["https://a.com/style.css"],
        )
        .page(
            "https://a.com/docs/guide",
            r#"<html><body><h1>Guide</h1><a href="/docs/intro#top">Intro</a></body></html>"#,
            &[],
        )
        .page(
            "https://a.com/blog/post",
            "<html><body><h1>Blog</h1></body></html>",
            &[],
        )
        .asset("https://a.com/style.css", 200, "text/css", "body { margin: 0 }")
        .asset("https://a.com/img/logo.png", 200, "image/png", "PNG")
}

#[tokio::test]
async fn test_single_page_mirror() {
    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(docs_site());
    let config = create_test_config(dir.path(), &["https://a.com/docs/"]);

    let stats = mirror_with(&browser, &config).await.unwrap();

    let tree = snapshot_tree(dir.path());
    assert!(tree.contains_key("a.com/docs/index.html"));
    assert_eq!(tree["a.com/style.css"], b"body { margin: 0 }");
    assert_eq!(tree["a.com/img/logo.png"], b"PNG");
    assert_eq!(tree.len(), 3);

    assert_eq!(stats.pages_rendered, 1);
    assert_eq!(browser.visits(), vec!["https://a.com/docs/"]);
    assert_eq!(browser.open_tabs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_duplicate_seeds_render_once() {
    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(docs_site());
    let config = create_test_config(
        dir.path(),
        &[
            "https://a.com/docs/intro",
            "https://a.com/docs/intro/#frag",
            "https://a.com/docs/intro#other",
        ],
    );

    let stats = mirror_with(&browser, &config).await.unwrap();

    assert_eq!(stats.pages_rendered, 1);
    assert_eq!(browser.visits().len(), 1);
}

#[tokio::test]
async fn test_failing_seed_does_not_stop_others() {
    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(docs_site());
    let config = create_test_config(
        dir.path(),
        &["https://unreachable.invalid/", "https://a.com/docs/intro"],
    );

    let stats = mirror_with(&browser, &config).await.unwrap();

    assert_eq!(stats.pages_rendered, 2);
    assert_eq!(stats.navigation_errors, 1);
    assert!(dir.path().join("a.com/docs/intro/index.html").exists());
}

#[tokio::test]
async fn test_blocked_requests_never_reach_disk() {
    let site = docs_site()
        .page(
            "https://a.com/ads",
            "<html><body>ads</body></html>",
            &["https://tracker.com/t.js", "https://a.com/style.css"],
        )
        .asset("https://tracker.com/t.js", 200, "text/javascript", "track()");

    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(site);
    let mut config = create_test_config(dir.path(), &["https://a.com/ads"]);
    config.denylist.push(DenyEntry {
        pattern: "*tracker.com*".to_string(),
    });

    let stats = mirror_with(&browser, &config).await.unwrap();

    assert!(!dir.path().join("tracker.com").exists());
    assert!(dir.path().join("a.com/style.css").exists());
    assert_eq!(stats.requests_blocked, 1);
}

#[tokio::test]
async fn test_skipped_responses() {
    let site = FakeSite::default()
        .page(
            "https://a.com/",
            "<html><body>home</body></html>",
            &[
                "https://a.com/missing.js",
                "https://a.com/moved.css",
                "data:image/gif;base64,R0lGOD",
            ],
        )
        .asset("https://a.com/missing.js", 404, "text/html", "not found")
        .asset("https://a.com/moved.css", 302, "text/html", "")
        .asset("data:image/gif;base64,R0lGOD", 200, "image/gif", "GIF");

    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(site);
    let config = create_test_config(dir.path(), &["https://a.com/"]);

    let stats = mirror_with(&browser, &config).await.unwrap();

    let tree = snapshot_tree(dir.path());
    assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["a.com/index.html"]);
    assert_eq!(stats.responses_skipped, 3);
}

#[tokio::test]
async fn test_timed_out_page_keeps_captured_resources() {
    let site = docs_site()
        .page(
            "https://a.com/slow",
            "<html><body>slow</body></html>",
            &["https://a.com/style.css", "https://a.com/img/logo.png"],
        )
        .timing_out("https://a.com/slow");

    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(site);
    let config = create_test_config(dir.path(), &["https://a.com/slow"]);

    let stats = mirror_with(&browser, &config).await.unwrap();

    let tree = snapshot_tree(dir.path());
    assert_eq!(tree["a.com/style.css"], b"body { margin: 0 }");
    assert_eq!(tree["a.com/img/logo.png"], b"PNG");
    assert!(tree.contains_key("a.com/slow/index.html"));
    assert_eq!(stats.navigation_errors, 1);
    assert_eq!(stats.pages_rendered, 1);
    assert_eq!(browser.open_tabs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_write_failure_does_not_stop_render() {
    let dir = TempDir::new().unwrap();
    // A plain file where the asset directory should go
    std::fs::create_dir_all(dir.path().join("a.com")).unwrap();
    std::fs::write(dir.path().join("a.com/img"), "in the way").unwrap();

    let browser = FakeBrowser::new(docs_site());
    let config = create_test_config(
        dir.path(),
        &["https://a.com/docs/", "https://a.com/docs/intro"],
    );

    let stats = mirror_with(&browser, &config).await.unwrap();

    let tree = snapshot_tree(dir.path());
    assert!(tree.contains_key("a.com/docs/index.html"));
    assert!(tree.contains_key("a.com/docs/intro/index.html"));
    assert_eq!(tree["a.com/style.css"], b"body { margin: 0 }");
    assert_eq!(tree["a.com/img"], b"in the way");
    assert_eq!(stats.write_errors, 1);
    assert_eq!(stats.pages_rendered, 2);
}

#[tokio::test]
async fn test_cache_hits_are_counted_and_written() {
    let site = docs_site().cached("https://a.com/style.css");

    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(site);
    let config = create_test_config(dir.path(), &["https://a.com/docs/"]);

    let stats = mirror_with(&browser, &config).await.unwrap();

    assert_eq!(stats.cache_hits, 1);
    assert!(dir.path().join("a.com/style.css").exists());
    assert!(dir.path().join("a.com/img/logo.png").exists());
}

#[tokio::test]
async fn test_markdown_follows_selector_order() {
    let site = FakeSite::default().page(
        "https://a.com/article.html",
        r#"<html><body>
        <div class="content"><p>Body</p></div>
        <h1>Title</h1>
        </body></html>"#,
        &[],
    );

    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(site);
    let mut config = create_test_config(dir.path(), &["https://a.com/article.html"]);
    config.output.generate_markdown = true;
    config.output.selectors = vec!["h1".to_string(), ".content".to_string()];

    let stats = mirror_with(&browser, &config).await.unwrap();

    // Selector order wins over document order
    let markdown = std::fs::read_to_string(dir.path().join("a.com/article.md")).unwrap();
    let title = markdown.find("Title").expect("heading text missing");
    let body = markdown.find("Body").expect("body missing");
    assert!(title < body);
    assert!(markdown.contains("Title\n\nBody"));
    assert_eq!(stats.markdown_written, 1);
}

#[tokio::test]
async fn test_markdown_defaults_to_body() {
    let site = FakeSite::default().page(
        "https://a.com/",
        "<html><body><p>Everything</p></body></html>",
        &[],
    );

    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(site);
    let mut config = create_test_config(dir.path(), &["https://a.com/"]);
    config.output.generate_markdown = true;

    mirror_with(&browser, &config).await.unwrap();

    let markdown = std::fs::read_to_string(dir.path().join("a.com/index.md")).unwrap();
    assert!(markdown.contains("Everything"));
}

#[tokio::test]
async fn test_recursion_stays_under_seed() {
    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(docs_site());
    let mut config = create_test_config(dir.path(), &["https://a.com/docs/"]);
    config.crawler.recursive = true;

    let stats = mirror_with(&browser, &config).await.unwrap();

    let mut visits = browser.visits();
    visits.sort();
    assert_eq!(
        visits,
        vec![
            "https://a.com/docs/",
            "https://a.com/docs/guide",
            "https://a.com/docs/intro",
        ]
    );
    assert_eq!(stats.pages_rendered, 3);
    assert!(!dir.path().join("a.com/blog").exists());
    assert!(!dir.path().join("b.com").exists());
}

#[tokio::test]
async fn test_page_cap_limits_recursion() {
    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(docs_site());
    let mut config = create_test_config(dir.path(), &["https://a.com/docs/"]);
    config.crawler.recursive = true;
    config.crawler.max_pages = 2;

    let stats = mirror_with(&browser, &config).await.unwrap();

    assert_eq!(stats.pages_rendered, 2);
    assert_eq!(browser.visits().len(), 2);
}

#[tokio::test]
async fn test_rerun_produces_identical_tree() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path(), &["https://a.com/docs/"]);
    config.crawler.recursive = true;
    config.output.generate_markdown = true;

    mirror_with(&FakeBrowser::new(docs_site()), &config)
        .await
        .unwrap();
    let first = snapshot_tree(dir.path());

    mirror_with(&FakeBrowser::new(docs_site()), &config)
        .await
        .unwrap();
    let second = snapshot_tree(dir.path());

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_serial_and_parallel_dispatch_agree() {
    let parallel_dir = TempDir::new().unwrap();
    let mut config = create_test_config(parallel_dir.path(), &["https://a.com/docs/"]);
    config.crawler.recursive = true;
    config.crawler.batch_size = 2;
    mirror_with(&FakeBrowser::new(docs_site()), &config)
        .await
        .unwrap();

    let serial_dir = TempDir::new().unwrap();
    config.output.directory = serial_dir.path().to_path_buf();
    config.crawler.dispatch = DispatchMode::Serial;
    mirror_with(&FakeBrowser::new(docs_site()), &config)
        .await
        .unwrap();

    assert_eq!(
        snapshot_tree(parallel_dir.path()),
        snapshot_tree(serial_dir.path())
    );
}

#[tokio::test]
async fn test_repeated_tab_failures_abort() {
    let dir = TempDir::new().unwrap();
    let mut browser = FakeBrowser::new(docs_site());
    browser.refuse_tabs = true;

    let mut config = create_test_config(
        dir.path(),
        &[
            "https://a.com/1",
            "https://a.com/2",
            "https://a.com/3",
            "https://a.com/4",
        ],
    );
    config.crawler.batch_size = 1;
    config.crawler.max_failed_batches = 2;

    let result = mirror_with(&browser, &config).await;

    assert!(matches!(
        result,
        Err(MirrorError::CrawlAborted { failed_batches: 2 })
    ));
}

#[tokio::test]
async fn test_invalid_seeds_are_dropped() {
    let dir = TempDir::new().unwrap();
    let browser = FakeBrowser::new(docs_site());
    let config = create_test_config(dir.path(), &["not a url", "ftp://a.com/file"]);

    let stats = mirror_with(&browser, &config).await.unwrap();

    assert_eq!(stats.pages_rendered, 0);
    assert!(browser.visits().is_empty());
}
