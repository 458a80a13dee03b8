//! Cache manager: strategy execution and partition lifecycle.
//!
//! [`CacheManager`] owns handles to the named cache partitions and is
//! passed explicitly to whoever needs it; there is no ambient global
//! state. Route classification ([`crate::routes`]) decides WHAT to do
//! with a URL, the manager does it:
//!
//! - cache-first for images, with a synthetic placeholder on total miss
//! - stale-while-revalidate for static assets
//! - network-first for dynamic routes and the default fall-through
//! - all-or-nothing precache install; activation records the active
//!   generation so a later failed install falls back to it
//! - activation garbage collection of non-active partitions
//! - periodic oldest-first trimming of every partition
//!
//! Concurrent requests for the same key are not coalesced: each runs
//! its own fetch and its own cache write. Puts are last-write-wins at
//! the same key, so the race is benign and accepted.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Url;

use hearth_core::{AppConfig, CacheDb, CacheEntry, Error};

use crate::fetch::{FetchedResponse, Fetcher, canonicalize, is_interceptable};
use crate::offline::{IMAGE_PLACEHOLDER_BODY, offline_document};
use crate::routes::{PartitionKind, RouteTable, Strategy};

/// Metadata key recording which generation was last activated.
const ACTIVE_VERSION_KEY: &str = "active_version";

/// Versioned names of one generation's partitions.
#[derive(Debug, Clone)]
pub struct PartitionNames {
    pub static_assets: String,
    pub dynamic: String,
    pub image: String,
}

impl PartitionNames {
    pub fn for_version(version: &str) -> Self {
        Self {
            static_assets: format!("static-{version}"),
            dynamic: format!("dynamic-{version}"),
            image: format!("image-{version}"),
        }
    }

    pub fn for_kind(&self, kind: PartitionKind) -> &str {
        match kind {
            PartitionKind::Static => &self.static_assets,
            PartitionKind::Dynamic => &self.dynamic,
            PartitionKind::Image => &self.image,
        }
    }

    pub fn all(&self) -> [String; 3] {
        [self.static_assets.clone(), self.dynamic.clone(), self.image.clone()]
    }
}

/// Per-partition maximum entry counts.
#[derive(Debug, Clone, Copy)]
pub struct PartitionLimits {
    pub static_assets: usize,
    pub dynamic: usize,
    pub image: usize,
}

impl PartitionLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            static_assets: config.static_max_entries,
            dynamic: config.dynamic_max_entries,
            image: config.image_max_entries,
        }
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedSource {
    /// Fresh from the network.
    Network,
    /// Read from a cache partition.
    Cache,
    /// The synthesized offline fallback document.
    Fallback,
    /// The synthetic image placeholder.
    Placeholder,
}

/// Response handed back to the gateway.
#[derive(Debug, Clone)]
pub struct Served {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub source: ServedSource,
}

impl Served {
    fn from_network(resp: FetchedResponse) -> Self {
        Self { status: resp.status, content_type: resp.content_type, body: resp.body, source: ServedSource::Network }
    }

    fn from_entry(entry: CacheEntry) -> Self {
        Self {
            status: entry.status,
            content_type: entry.content_type,
            body: Bytes::from(entry.body),
            source: ServedSource::Cache,
        }
    }

    /// Offline fallback: always a renderable document, always 200.
    fn offline() -> Self {
        Self {
            status: 200,
            content_type: Some("text/html".to_string()),
            body: Bytes::from(offline_document()),
            source: ServedSource::Fallback,
        }
    }

    /// Image placeholder: a missing decorative image must not surface
    /// a hard failure to the page.
    fn placeholder() -> Self {
        Self {
            status: 200,
            content_type: Some("text/plain".to_string()),
            body: Bytes::from_static(IMAGE_PLACEHOLDER_BODY.as_bytes()),
            source: ServedSource::Placeholder,
        }
    }
}

/// Owns the partition handles, the route table, and the fetcher seam.
///
/// Cloning is cheap; all clones share the same database connection and
/// fetcher, which is what lets stale-while-revalidate spawn background
/// refreshes.
#[derive(Clone)]
pub struct CacheManager {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    routes: Arc<RouteTable>,
    /// Target generation this build wants to serve.
    version: String,
    /// Generation currently being served; diverges from `version`
    /// while a failed install leaves a previous generation in effect.
    partitions: PartitionNames,
    limits: PartitionLimits,
}

impl CacheManager {
    pub fn new(
        db: CacheDb, fetcher: Arc<dyn Fetcher>, routes: RouteTable, version: &str, limits: PartitionLimits,
    ) -> Self {
        Self {
            db,
            fetcher,
            routes: Arc::new(routes),
            version: version.to_string(),
            partitions: PartitionNames::for_version(version),
            limits,
        }
    }

    pub fn from_config(db: CacheDb, fetcher: Arc<dyn Fetcher>, config: &AppConfig) -> Self {
        Self::new(
            db,
            fetcher,
            RouteTable::from_config(config),
            &config.cache_version,
            PartitionLimits::from_config(config),
        )
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Serve one intercepted GET request.
    ///
    /// The raw URL is canonicalized first so equal resources share one
    /// cache key. Non-network schemes are rejected at this seam; they
    /// are neither cached nor fetched.
    pub async fn handle(&self, url: &str) -> Result<Served, Error> {
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if !is_interceptable(&url) {
            return Err(Error::InvalidInput(format!("unsupported scheme: {}", url.scheme())));
        }

        let route = self.routes.classify(url.as_str());
        match route.strategy {
            Strategy::CacheFirst => self.cache_first(&url).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(&url).await,
            Strategy::NetworkFirst => self.network_first(&url).await,
        }
    }

    /// Cache-first delivery for images.
    ///
    /// A cache hit never touches the network. A miss fetches and stores
    /// on 200. Network failure yields a 200 placeholder, never an error.
    async fn cache_first(&self, url: &Url) -> Result<Served, Error> {
        let partition = self.partitions.for_kind(PartitionKind::Image);

        if let Some(entry) = self.db.get_entry(partition, url.as_str()).await? {
            return Ok(Served::from_entry(entry));
        }

        match self.fetcher.get(url).await {
            Ok(resp) => {
                if resp.status == 200 {
                    self.store(partition, &resp).await?;
                }
                Ok(Served::from_network(resp))
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "image fetch failed, serving placeholder");
                Ok(Served::placeholder())
            }
        }
    }

    /// Stale-while-revalidate delivery for static assets.
    ///
    /// A hit is returned immediately while a single background refresh
    /// overwrites the entry on success; refresh failures are swallowed.
    /// A miss behaves cache-first; total failure yields the offline
    /// fallback document.
    async fn stale_while_revalidate(&self, url: &Url) -> Result<Served, Error> {
        let partition = self.partitions.for_kind(PartitionKind::Static);

        if let Some(entry) = self.db.get_entry(partition, url.as_str()).await? {
            self.spawn_refresh(url.clone());
            return Ok(Served::from_entry(entry));
        }

        match self.fetcher.get(url).await {
            Ok(resp) => {
                if resp.status == 200 {
                    self.store(partition, &resp).await?;
                }
                Ok(Served::from_network(resp))
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "static asset unreachable, serving offline page");
                Ok(Served::offline())
            }
        }
    }

    /// Network-first delivery for dynamic routes and the default case.
    ///
    /// Fresh content is never shadowed by a stale entry: the cache is
    /// only consulted after the network has failed.
    async fn network_first(&self, url: &Url) -> Result<Served, Error> {
        let partition = self.partitions.for_kind(PartitionKind::Dynamic);

        match self.fetcher.get(url).await {
            Ok(resp) => {
                if resp.status == 200 {
                    self.store(partition, &resp).await?;
                }
                Ok(Served::from_network(resp))
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "network failed, trying dynamic cache");
                match self.db.get_entry(partition, url.as_str()).await? {
                    Some(entry) => Ok(Served::from_entry(entry)),
                    None => Ok(Served::offline()),
                }
            }
        }
    }

    /// Single background refresh for a cached static asset.
    ///
    /// One attempt, no retry; every failure path is logged and dropped.
    fn spawn_refresh(&self, url: Url) {
        let mgr = self.clone();
        tokio::spawn(async move {
            let partition = mgr.partitions.static_assets.clone();
            match mgr.fetcher.get(&url).await {
                Ok(resp) if resp.status == 200 => {
                    if let Err(e) = mgr.store(&partition, &resp).await {
                        tracing::debug!(url = %url, error = %e, "background refresh store failed");
                    }
                }
                Ok(resp) => {
                    tracing::debug!(url = %url, status = resp.status, "background refresh skipped");
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "background refresh failed");
                }
            }
        });
    }

    async fn store(&self, partition: &str, resp: &FetchedResponse) -> Result<(), Error> {
        self.db.put_entry(&response_to_entry(partition, resp)).await
    }

    /// Precache install for the target cache generation.
    ///
    /// Fetches every manifest entry (relative entries resolved against
    /// `origin`), then commits them to the target generation's static
    /// partition in a single transaction. Any unreachable or non-200
    /// asset aborts the whole install before anything is written,
    /// leaving the previous generation in effect. Returns the number of
    /// entries committed.
    pub async fn install(&self, manifest: &[String], origin: &Url) -> Result<usize, Error> {
        let target = PartitionNames::for_version(&self.version);
        let partition = &target.static_assets;
        let mut entries = Vec::with_capacity(manifest.len());

        for item in manifest {
            let url = resolve_manifest_url(item, origin)?;
            let resp = self
                .fetcher
                .get(&url)
                .await
                .map_err(|e| Error::BootstrapFailed(format!("{item}: {e}")))?;

            if resp.status != 200 {
                return Err(Error::BootstrapFailed(format!("{item}: status {}", resp.status)));
            }

            entries.push(response_to_entry(partition, &resp));
        }

        let count = entries.len();
        self.db.put_entries_atomic(entries).await?;
        tracing::info!(partition = %partition, entries = count, "precache install committed");
        Ok(count)
    }

    /// Activate the target generation after a successful install.
    ///
    /// Records the target version as the active one, points serving at
    /// its partitions, and deletes every partition outside that set, so
    /// at most one generation of each partition type survives. Must not
    /// be called after a failed install: the previous generation's
    /// partitions have to stay in effect. Returns the number of deleted
    /// entries.
    pub async fn activate(&mut self) -> Result<u64, Error> {
        self.db.set_meta(ACTIVE_VERSION_KEY, &self.version).await?;
        self.partitions = PartitionNames::for_version(&self.version);

        let keep = self.partitions.all();
        let deleted = self.db.delete_partitions_except(&keep).await?;
        if deleted > 0 {
            tracing::info!(deleted, "activation removed stale partitions");
        }
        Ok(deleted)
    }

    /// Fall back to the last activated generation after a failed install.
    ///
    /// Reads the persisted active version and points serving at its
    /// partitions without deleting anything. With no recorded generation
    /// (fresh database) the target names stay in place over an empty
    /// cache.
    pub async fn adopt_active_generation(&mut self) -> Result<(), Error> {
        if let Some(version) = self.db.get_meta(ACTIVE_VERSION_KEY).await?
            && version != self.version
        {
            tracing::warn!(active = %version, target = %self.version, "serving previously activated generation");
            self.partitions = PartitionNames::for_version(&version);
        }
        Ok(())
    }

    /// One trim pass over every partition. Returns total deleted entries.
    pub async fn sweep(&self) -> Result<u64, Error> {
        let mut deleted = 0;
        deleted += self.db.trim_partition(&self.partitions.static_assets, self.limits.static_assets).await?;
        deleted += self.db.trim_partition(&self.partitions.dynamic, self.limits.dynamic).await?;
        deleted += self.db.trim_partition(&self.partitions.image, self.limits.image).await?;
        Ok(deleted)
    }

    /// Run [`Self::sweep`] on a fixed recurring interval.
    ///
    /// Independent of request handling; a sweep racing a concurrent
    /// refill self-corrects on the next pass.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let mgr = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval fires immediately on the first tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match mgr.sweep().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(deleted = n, "trim sweep removed surplus entries"),
                    Err(e) => tracing::warn!(error = %e, "trim sweep failed"),
                }
            }
        })
    }
}

fn response_to_entry(partition: &str, resp: &FetchedResponse) -> CacheEntry {
    CacheEntry {
        partition: partition.to_string(),
        url: resp.url.to_string(),
        status: resp.status,
        content_type: resp.content_type.clone(),
        headers_json: serde_json::to_string(&resp.headers).ok(),
        body: resp.body.to_vec(),
        stored_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn resolve_manifest_url(item: &str, origin: &Url) -> Result<Url, Error> {
    if item.contains("://") {
        Url::parse(item).map_err(|e| Error::InvalidUrl(format!("{item}: {e}")))
    } else {
        origin.join(item).map_err(|e| Error::InvalidUrl(format!("{item}: {e}")))
    }
}
