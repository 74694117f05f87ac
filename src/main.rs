use anyhow::{anyhow, Context};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use structopt::StructOpt;

use exarch::config::{Overrides, Settings};
use exarch::fetch::{Fetcher, UreqTransport};
use exarch::materialize::Materializer;
use exarch::scraper::{CrawlOptionsBuilder, Crawler, Sleep};
use exarch::storage::Storage;

const DEFAULT_LOG_ENV: &str = "exarch=info";

#[derive(Debug, StructOpt)]
#[structopt(name = "exarch", about = "existentialcomics.com archiver")]
struct Opt {
    /// YAML config file supplying `save_dir`, `restart`, `proxies` and friends.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// Absolute path to save directory. Overrides `save_dir` of config file.
    #[structopt(short, long, parse(from_os_str))]
    dir: Option<PathBuf>,
    /// Start over from the first comic, skipping comics which are stored already.
    #[structopt(short, long)]
    restart: bool,
    /// Database path. If not provided defaults to <dir>/existentialcomics.sqlite
    #[structopt(long)]
    db: Option<String>,
    /// Pause between comics, in milliseconds.
    #[structopt(long)]
    delay_ms: Option<u64>,
}

impl Opt {
    fn process(self) -> anyhow::Result<()> {
        let settings = Settings::load(
            self.config.as_deref(),
            Overrides {
                dir: self.dir,
                restart: self.restart,
                database: self.db,
                delay_ms: self.delay_ms,
            },
        )?;
        log::debug!("settings: {:?}", settings);
        settings.prepare_save_dir()?;

        log::info!("Opening SQLite DB at {}", settings.database);
        let storage = Storage::open(&settings.database)
            .with_context(|| format!("cannot set up database {}", settings.database))?;

        let transport = UreqTransport::new(
            &settings.proxies,
            settings.timeout,
            settings.user_agent.as_deref(),
        )?;
        if let Some(proxy) = transport.current_proxy() {
            log::info!(
                "Using proxy {} (rotating over {})",
                proxy,
                settings.proxies.len()
            );
        }

        let interrupt = Arc::new(AtomicBool::new(false));
        let flag = interrupt.clone();
        ctrlc::set_handler(move || {
            if flag.swap(true, Ordering::SeqCst) {
                std::process::exit(130);
            }
            log::warn!("Keyboard interrupt; finishing current comic. Press again to quit now.");
        })
        .context("cannot install interrupt handler")?;

        let options = CrawlOptionsBuilder::default()
            .base_url(settings.base_url.clone())
            .restart(settings.restart)
            .build()
            .map_err(|e| anyhow!("invalid crawl options: {}", e))?;

        let mut crawler = Crawler::new(
            &storage,
            Fetcher::new(transport, settings.retries, settings.delay),
            Materializer::new(&settings.save_dir, settings.overwrite_images),
            Sleep(settings.delay),
            options,
            interrupt,
        )?;

        let result = crawler.run();
        let stats = crawler.finish();
        match serde_json::to_string(&stats) {
            Ok(json) => log::info!("Run statistics: {}", json),
            Err(e) => log::error!("Cannot serialize run statistics: {}", e),
        }

        result.context("crawl aborted")?;
        if stats.failed > 0 {
            log::warn!(
                "{} of {} comics failed: {:?}",
                stats.failed,
                stats.attempted,
                stats.failed_ids
            );
        }
        Ok(())
    }
}

fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(DEFAULT_LOG_ENV));

    let opt = Opt::from_args();
    log::debug!("opt: {:?}", opt);

    if let Err(e) = opt.process() {
        log::error!("Error: {:#}", e);
        std::process::exit(1)
    }
}
