//! Serves an article catalog through a repository backed by the in-memory test collaborators.
//!
//! ```text
//! cargo run --example catalog --features demo -- --strategy memory_first --preload --page-size 5 --page 1
//! ```

use anyhow::Result;
use clap::Parser;
use fieldx::fxstruct;
use std::sync::Arc;
use strata_cache::prelude::*;
use strata_cache::test::init_tracing;
use strata_cache::test::Article;
use strata_cache::test::MemoryDatabase;
use strata_cache::test::Reply;
use strata_cache::test::ScriptedNetwork;
use strata_cache::test::TestController;

const CACHE_NAME: &str = "catalog";
const QUERY: &str = "all";

#[derive(Debug, Clone, Parser)]
#[fxstruct(no_new, get(copy))]
#[clap(about, version, author, name = "catalog")]
struct Cli {
    /// How the repository combines its sources.
    #[clap(long, short, env = "STRATA_STRATEGY", default_value_t = CacheStrategy::MemoryFirst)]
    strategy: CacheStrategy,

    /// Publish cached data before the network answers.
    #[clap(long, env = "STRATA_PRELOAD", default_value_t = false)]
    preload: bool,

    /// Pretend there is no connectivity.
    #[clap(long, env = "STRATA_OFFLINE", default_value_t = false)]
    offline: bool,

    /// Make the server fail with this HTTP status.
    #[clap(long, env = "STRATA_FAIL_STATUS")]
    fail_status: Option<u16>,

    /// Articles the server knows about.
    #[clap(long, env = "STRATA_ARTICLES", default_value_t = 25)]
    articles: u64,

    #[clap(long, env = "STRATA_PAGE_SIZE", default_value_t = 10)]
    page_size: usize,

    /// Page to show, starting at 0.
    #[clap(long, env = "STRATA_PAGE", default_value_t = 0)]
    page: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let reply = match cli.fail_status() {
        Some(status) => Reply::Status(status),
        None => Reply::Data(Article::list(0..cli.articles())),
    };
    let controller = TestController::new(
        MemoryDatabase::new().with_row(QUERY, Article::list(0..cli.articles() / 2)),
        ScriptedNetwork::new().with_reply(QUERY, reply),
    )
    .with_launch_data(Article::list(0..3));
    controller.network().set_online(!cli.offline());

    let registry = CacheRegistry::shared();
    let config = RepositoryConfig::builder()
        .strategy(cli.strategy())
        .cache_name(CACHE_NAME)
        .cache_loaded_at_launch(true)
        .preload_before_network(cli.preload())
        .build()?;
    let repository = Arc::new(Repository::new(config, controller, Arc::clone(&registry))?);

    let report = CacheLoader::new(registry).scan([repository.clone() as Arc<dyn Preload>]).await;
    println!("cache loader: {} loaded, {} failed", report.loaded.len(), report.failed.len());

    let _subscription = repository
        .data()
        .subscribe(|articles: &Vec<Article>| println!("published {} articles", articles.len()));

    if repository.fetch(&QUERY.to_string()).await.is_none() {
        println!("no data");
        return Ok(());
    }

    let pager = repository
        .pager()
        .with_page_size(cli.page_size())?
        .with_current_page(cli.page());
    println!(
        "page {} of {} ({} articles total)",
        pager.current_page() + 1,
        pager.page_count(),
        pager.total_count()
    );
    for article in pager.current() {
        println!("  {:>4}  {}", article.id, article.title);
    }
    if pager.has_next_page() {
        println!("next: --page {}", pager.next_page());
    }

    Ok(())
}
