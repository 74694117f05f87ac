use crate::error::{Error, Result};
use crate::fetch::{Fetcher, Transport};
use crate::materialize::Materializer;
use crate::page;
use crate::storage::Storage;
use derive_builder::Builder;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const BASE_URL: &str = "http://existentialcomics.com/";

/// Wait between two comics.
pub trait Pause {
    fn pause(&self);
}

/// Sleeps for a fixed duration.
pub struct Sleep(pub Duration);

impl Pause for Sleep {
    fn pause(&self) {
        std::thread::sleep(self.0);
    }
}

/// Never waits.
pub struct NoPause;

impl Pause for NoPause {
    fn pause(&self) {}
}

#[derive(Debug, Clone, Builder)]
pub struct CrawlOptions {
    /// Site root; comics live under `<base_url>comic/<id>`.
    #[builder(setter(into), default = "BASE_URL.to_string()")]
    base_url: String,
    /// Start over from id 1, skipping comics which are stored already.
    #[builder(default)]
    restart: bool,
}

/// What happened to a single id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processed {
    /// There is no comic 0.
    Invalid,
    /// Restart mode found a stored row; nothing was fetched.
    AlreadyStored,
    Ingested,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub latest: i32,
    pub start_progress: i32,
    pub final_progress: i32,
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub failed_ids: Vec<i32>,
    pub images_downloaded: usize,
    pub images_reused: usize,
    pub philosophers_created: usize,
    pub links_created: usize,
    pub links_removed: usize,
    pub interrupted: bool,
}

/// Walks comic ids from the stored progress up to the newest comic on the site.
///
/// Comics are processed one at a time in ascending order. A comic that fails is logged
/// and skipped; progress never moves past it, so the next run will try it again.
pub struct Crawler<'a, T, P> {
    storage: &'a Storage,
    fetcher: Fetcher<T>,
    materializer: Materializer,
    pause: P,
    base_url: Url,
    restart: bool,
    interrupt: Arc<AtomicBool>,
    /// Highest id up to which every comic is processed.
    progress: i32,
    /// Progress as written to storage.
    persisted: i32,
    stats: RunStats,
}

impl<'a, T: Transport, P: Pause> Crawler<'a, T, P> {
    pub fn new(
        storage: &'a Storage,
        fetcher: Fetcher<T>,
        materializer: Materializer,
        pause: P,
        options: CrawlOptions,
        interrupt: Arc<AtomicBool>,
    ) -> Result<Self> {
        let progress = storage.get_progress()?;
        Ok(Self {
            storage,
            fetcher,
            materializer,
            pause,
            base_url: Url::parse(&options.base_url)?,
            restart: options.restart,
            interrupt,
            progress,
            persisted: progress,
            stats: RunStats {
                start_progress: progress,
                final_progress: progress,
                ..Default::default()
            },
        })
    }

    pub fn comic_url(&self, id: i32) -> Result<Url> {
        Ok(self.base_url.join(&format!("comic/{}", id))?)
    }

    /// Newest comic id published on the site.
    pub fn discover_latest(&self) -> Result<i32> {
        log::info!("Getting newest upload id...");
        let doc = self
            .fetcher
            .document(self.base_url.as_str())
            .map_err(|e| Error::Discovery(e.to_string()))?;
        let latest = page::latest_id(&doc)?;
        log::info!("Newest upload: {}", latest);
        Ok(latest)
    }

    /// Processes every pending comic. Progress is stored after each comic.
    pub fn run(&mut self) -> Result<()> {
        let latest = self.discover_latest()?;
        self.stats.latest = latest;

        if self.restart {
            log::info!("Restarting from the first comic");
            self.progress = 0;
            self.persist_progress();
        }

        if latest <= self.progress {
            log::info!("Already have the latest comic");
            return Ok(());
        }

        let mut blocked = false;
        for id in (self.progress + 1)..=latest {
            if self.interrupt.load(Ordering::SeqCst) {
                log::warn!("Interrupted; stopping before comic {}", id);
                self.stats.interrupted = true;
                break;
            }

            log::info!("Getting comic: {}", id);
            self.stats.attempted += 1;

            let done = match self.process(id) {
                Ok(Processed::Ingested) => {
                    self.stats.succeeded += 1;
                    self.pause.pause();
                    true
                }
                Ok(Processed::AlreadyStored) => {
                    log::debug!("Comic {} is stored already", id);
                    self.stats.skipped_existing += 1;
                    true
                }
                Ok(Processed::Invalid) => true,
                Err(e) => {
                    log::error!("Comic {} failed: {:#}", id, anyhow::Error::from(e));
                    self.stats.failed += 1;
                    self.stats.failed_ids.push(id);
                    self.pause.pause();
                    false
                }
            };

            if !done {
                if !blocked {
                    log::warn!("Progress stays at {} until comic {} succeeds", self.progress, id);
                }
                blocked = true;
            } else if !blocked {
                self.progress = id;
                self.persist_progress();
            }
        }

        Ok(())
    }

    /// Fetches, parses, downloads and stores a single comic.
    /// Nothing is written unless every step succeeds.
    pub fn process(&mut self, id: i32) -> Result<Processed> {
        if id <= 0 {
            return Ok(Processed::Invalid);
        }
        if self.restart && self.storage.comic_exists(id)? {
            return Ok(Processed::AlreadyStored);
        }

        let url = self.comic_url(id)?;
        let doc = self.fetcher.document(url.as_str())?;
        let mut comic = page::parse(&doc, id)?;

        let mut downloaded = 0;
        let mut file_paths = Vec::with_capacity(comic.image_count());
        for (index, src) in comic.image_urls.iter().enumerate() {
            let src = url.join(src)?;
            let image = self
                .materializer
                .materialize(&self.fetcher, &src, id, index)?;
            if image.downloaded {
                downloaded += 1;
            }
            file_paths.push(image.path);
        }
        comic.file_paths = file_paths;

        let storage = self.storage;
        let linked = storage.transaction(|| {
            storage.upsert_comic(&comic)?;
            storage.link_philosophers(comic.id, &comic.philosophers)
        })?;

        self.stats.images_downloaded += downloaded;
        self.stats.images_reused += comic.image_count() - downloaded;
        self.stats.philosophers_created += linked.philosophers_created;
        self.stats.links_created += linked.links_created;
        self.stats.links_removed += linked.links_removed;
        Ok(Processed::Ingested)
    }

    fn persist_progress(&mut self) {
        let now = chrono::Local::now().naive_local();
        match self.storage.set_progress(self.progress, now) {
            Ok(()) => self.persisted = self.progress,
            Err(e) => log::error!(
                "Cannot store progress {}: {:#}",
                self.progress,
                anyhow::Error::from(e)
            ),
        }
        self.stats.final_progress = self.persisted;
    }

    /// Stores progress that could not be stored during the run, and returns statistics.
    pub fn finish(mut self) -> RunStats {
        if self.persisted != self.progress {
            self.persist_progress();
        }
        self.stats
    }
}
