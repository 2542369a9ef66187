use parking_lot::Mutex;
use std::sync::Arc;
use strata_cache::prelude::*;
use strata_cache::test::Article;
use strata_cache::test::MemoryDatabase;
use strata_cache::test::RecordingCallback;
use strata_cache::test::Reply;
use strata_cache::test::ScriptedNetwork;
use strata_cache::test::TestController;
use strata_cache::Subscription;

type Articles = Vec<Article>;
type ArticleRepository = Repository<TestController<Articles>>;

const LATEST: &str = "latest";

struct Setup {
    strategy:               CacheStrategy,
    cache_name:             &'static str,
    preload_before_network: bool,
    cache_loaded_at_launch: bool,
    clear_on_error:         bool,
}

impl Setup {
    fn new(strategy: CacheStrategy) -> Self {
        Self {
            strategy,
            cache_name: "",
            preload_before_network: false,
            cache_loaded_at_launch: false,
            clear_on_error: false,
        }
    }

    fn named(mut self, cache_name: &'static str) -> Self {
        self.cache_name = cache_name;
        self
    }

    fn preload(mut self) -> Self {
        self.preload_before_network = true;
        self
    }

    fn loaded_at_launch(mut self) -> Self {
        self.cache_loaded_at_launch = true;
        self
    }

    fn clear_on_error(mut self) -> Self {
        self.clear_on_error = true;
        self
    }

    fn build(
        self,
        controller: TestController<Articles>,
        registry: Arc<CacheRegistry>,
    ) -> Result<(Arc<ArticleRepository>, Arc<RecordingCallback<Articles>>), Box<dyn std::error::Error>> {
        #[cfg(feature = "tracing")]
        strata_cache::test::init_tracing();

        let config = RepositoryConfig::builder()
            .strategy(self.strategy)
            .cache_name(self.cache_name)
            .preload_before_network(self.preload_before_network)
            .cache_loaded_at_launch(self.cache_loaded_at_launch)
            .clear_data_on_network_error(self.clear_on_error)
            .build()?;
        let repository = Arc::new(Repository::new(config, controller, registry)?);
        let callback = RecordingCallback::new();
        repository.set_callback(callback.clone());
        Ok((repository, callback))
    }
}

fn query() -> String {
    LATEST.to_string()
}

fn record(repository: &ArticleRepository) -> (Arc<Mutex<Vec<Articles>>>, Subscription<Articles>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = repository
        .data()
        .subscribe(move |articles: &Articles| sink.lock().push(articles.clone()));
    (seen, subscription)
}

async fn wait_for_requests(network: &ScriptedNetwork<Articles>, count: usize) {
    while network.requests() < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn database_only_never_calls_network() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Article::list(0..3)),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(10..12))),
    );
    let network = controller.network();
    let (repository, callback) = Setup::new(CacheStrategy::DatabaseOnly).build(controller, CacheRegistry::shared())?;

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..3)));
    assert_eq!(repository.value(), Some(Article::list(0..3)));

    // A miss is not an error and publishes nothing.
    assert_eq!(repository.fetch(&"missing".to_string()).await, None);
    assert_eq!(repository.data().publish_count(), 1);

    assert_eq!(network.requests(), 0);
    assert!(callback.failures().is_empty());
    Ok(())
}

#[tokio::test]
async fn memory_only_reads_registry_alone() -> Result<(), Box<dyn std::error::Error>> {
    let registry = CacheRegistry::shared();
    registry.put("articles", Article::list(0..2)).await;

    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Article::list(5..9)),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(10..12))),
    );
    let database = controller.database();
    let network = controller.network();
    let (repository, _) = Setup::new(CacheStrategy::MemoryOnly)
        .named("articles")
        .build(controller, Arc::clone(&registry))?;

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..2)));

    registry.clear().await;
    assert_eq!(repository.fetch(&query()).await, None);

    assert_eq!(database.reads(), 0);
    assert_eq!(database.writes(), 0);
    assert_eq!(network.requests(), 0);
    Ok(())
}

#[tokio::test]
async fn memory_strategy_without_name_is_rejected() {
    let controller = TestController::<Articles>::new(MemoryDatabase::new(), ScriptedNetwork::new());
    let result = Setup::new(CacheStrategy::MemoryFirst).build(controller, CacheRegistry::shared());
    let err = result.err().map(|err| err.to_string()).unwrap_or_default();
    assert!(err.contains("memory_first"), "unexpected error: {err}");
}

#[tokio::test]
async fn database_first_fills_empty_database() -> Result<(), Box<dyn std::error::Error>> {
    let fresh = Article::list(0..4);
    let controller = TestController::new(
        MemoryDatabase::new(),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(fresh.clone())),
    );
    let database = controller.database();
    let (repository, callback) = Setup::new(CacheStrategy::DatabaseFirst).build(controller, CacheRegistry::shared())?;

    assert_eq!(repository.fetch(&query()).await, Some(fresh.clone()));

    assert_eq!(database.writes(), 1);
    assert_eq!(database.row(LATEST), Some(fresh.clone()));
    assert_eq!(repository.value(), Some(fresh.clone()));
    assert_eq!(repository.data().publish_count(), 1);
    assert_eq!(callback.successes(), vec![fresh]);
    assert!(callback.failures().is_empty());
    Ok(())
}

#[tokio::test]
async fn network_is_published_once_without_preload() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Article::list(0..2)),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..3))),
    );
    let (repository, _) = Setup::new(CacheStrategy::DatabaseFirst).build(controller, CacheRegistry::shared())?;
    let (seen, _subscription) = record(&repository);

    repository.fetch(&query()).await;

    assert_eq!(*seen.lock(), vec![Article::list(0..3)]);
    Ok(())
}

#[tokio::test]
async fn preload_publishes_cached_data_first() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Article::list(0..2)),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..3))),
    );
    let database = controller.database();
    let (repository, _) = Setup::new(CacheStrategy::DatabaseFirst)
        .preload()
        .build(controller, CacheRegistry::shared())?;
    let (seen, _subscription) = record(&repository);

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..3)));

    assert_eq!(*seen.lock(), vec![Article::list(0..2), Article::list(0..3)]);
    assert_eq!(database.row(LATEST), Some(Article::list(0..3)));
    Ok(())
}

#[tokio::test]
async fn preload_is_published_before_network_answers() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Article::list(0..2)),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..3))),
    );
    let network = controller.network();
    network.hold(LATEST);
    let (repository, _) = Setup::new(CacheStrategy::DatabaseFirst)
        .preload()
        .build(controller, CacheRegistry::shared())?;

    let (_ticket, handle) = repository.spawn_fetch(query());
    wait_for_requests(&network, 1).await;
    assert_eq!(repository.value(), Some(Article::list(0..2)));

    network.release(LATEST);
    assert_eq!(handle.await?, Some(Article::list(0..3)));
    assert_eq!(repository.value(), Some(Article::list(0..3)));
    Ok(())
}

#[tokio::test]
async fn failure_codes() -> Result<(), Box<dyn std::error::Error>> {
    let network = ScriptedNetwork::new()
        .with_reply(LATEST, Reply::Transport("connection reset".into()))
        .with_reply(LATEST, Reply::Status(503))
        .with_reply(LATEST, Reply::MissingBody)
        .with_reply(LATEST, Reply::EmptyData)
        .with_reply(LATEST, Reply::Data(Article::list(0..1)));
    let controller = TestController::new(MemoryDatabase::new(), network);
    let (repository, callback) = Setup::new(CacheStrategy::DatabaseFirst).build(controller, CacheRegistry::shared())?;

    for _ in 0..4 {
        assert_eq!(repository.fetch(&query()).await, None);
    }
    assert_eq!(
        callback.failure_codes(),
        vec![
            NetworkFailure::TRANSPORT,
            503,
            NetworkFailure::MISSING_BODY,
            NetworkFailure::EMPTY_PAYLOAD
        ]
    );
    let failures = callback.failures();
    assert_eq!(failures[0].1, "connection reset");
    assert_eq!(failures[1].1, "HTTP status code: 503");
    assert!(!repository.data().has_value());

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..1)));
    assert_eq!(callback.failures().len(), 4);
    Ok(())
}

#[tokio::test]
async fn failure_keeps_preloaded_value() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Article::list(0..2)),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Status(500)),
    );
    let database = controller.database();
    let (repository, callback) = Setup::new(CacheStrategy::DatabaseFirst)
        .preload()
        .build(controller, CacheRegistry::shared())?;

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..2)));

    assert_eq!(repository.value(), Some(Article::list(0..2)));
    assert_eq!(repository.data().publish_count(), 1);
    assert_eq!(callback.failure_codes(), vec![500]);
    assert_eq!(database.writes(), 0);
    Ok(())
}

#[tokio::test]
async fn failure_falls_back_to_local_data() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Article::list(0..2)),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Transport("timeout".into())),
    );
    let (repository, callback) = Setup::new(CacheStrategy::DatabaseFirst).build(controller, CacheRegistry::shared())?;

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..2)));
    assert_eq!(repository.data().publish_count(), 1);
    assert_eq!(callback.failure_codes(), vec![NetworkFailure::TRANSPORT]);
    Ok(())
}

#[tokio::test]
async fn offline_serves_local_data_silently() -> Result<(), Box<dyn std::error::Error>> {
    let registry = CacheRegistry::shared();
    registry.put("articles", Article::list(7..9)).await;

    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Article::list(0..2)),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..3))),
    );
    let network = controller.network();
    network.set_online(false);
    let (repository, callback) = Setup::new(CacheStrategy::DatabaseFirst)
        .named("articles")
        .build(controller, registry)?;

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..2)));
    // The database misses, memory is next in line.
    assert_eq!(repository.fetch(&"other".to_string()).await, Some(Article::list(7..9)));

    assert_eq!(network.requests(), 0);
    assert!(callback.failures().is_empty());
    assert!(callback.successes().is_empty());
    Ok(())
}

#[tokio::test]
async fn offline_miss_is_silent() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::<Articles>::new(MemoryDatabase::new(), ScriptedNetwork::new());
    controller.network().set_online(false);
    let (repository, callback) = Setup::new(CacheStrategy::MemoryFirst)
        .named("articles")
        .build(controller, CacheRegistry::shared())?;

    assert_eq!(repository.fetch(&query()).await, None);
    assert!(callback.failures().is_empty());
    Ok(())
}

#[tokio::test]
async fn memory_first_refreshes_database_and_registry() -> Result<(), Box<dyn std::error::Error>> {
    let registry = CacheRegistry::shared();
    registry.put("articles", Article::list(0..1)).await;

    let controller = TestController::new(
        MemoryDatabase::new(),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..5))),
    );
    let database = controller.database();
    let (repository, _) = Setup::new(CacheStrategy::MemoryFirst)
        .named("articles")
        .build(controller, Arc::clone(&registry))?;

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..5)));

    assert_eq!(registry.get::<Articles>("articles").await, Some(Article::list(0..5)));
    assert_eq!(database.row(LATEST), Some(Article::list(0..5)));
    assert_eq!(repository.controller().intercepted(), vec![DataOrigin::Network]);
    Ok(())
}

#[tokio::test]
async fn database_first_leaves_registry_alone() -> Result<(), Box<dyn std::error::Error>> {
    let registry = CacheRegistry::shared();
    let controller = TestController::new(
        MemoryDatabase::new(),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..5))),
    );
    let (repository, _) = Setup::new(CacheStrategy::DatabaseFirst)
        .named("articles")
        .build(controller, Arc::clone(&registry))?;

    repository.fetch(&query()).await;
    assert!(!registry.contains("articles"));
    Ok(())
}

#[tokio::test]
async fn launch_data_preloads_from_memory() -> Result<(), Box<dyn std::error::Error>> {
    let registry = CacheRegistry::shared();
    registry.put("articles", Article::list(100..101)).await;

    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Article::list(0..2)),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..3))),
    );
    let (repository, _) = Setup::new(CacheStrategy::DatabaseFirst)
        .named("articles")
        .preload()
        .loaded_at_launch()
        .build(controller, registry)?;
    let (seen, _subscription) = record(&repository);

    repository.fetch(&query()).await;

    assert_eq!(*seen.lock(), vec![Article::list(100..101), Article::list(0..3)]);
    assert_eq!(
        repository.controller().intercepted(),
        vec![DataOrigin::Memory, DataOrigin::Network]
    );
    Ok(())
}

#[tokio::test]
async fn blank_and_unreadable_data_count_as_missing() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Vec::new()),
        ScriptedNetwork::new(),
    );
    let database = controller.database();
    let (repository, _) = Setup::new(CacheStrategy::DatabaseOnly).build(controller, CacheRegistry::shared())?;

    assert_eq!(repository.fetch(&query()).await, None);

    database.set_fail_reads(true);
    assert_eq!(repository.fetch(&query()).await, None);
    assert_eq!(database.reads(), 2);
    assert!(!repository.data().has_value());
    Ok(())
}

#[tokio::test]
async fn refused_write_still_publishes() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new(),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..2))),
    );
    let database = controller.database();
    database.set_refuse_writes(true);
    let (repository, callback) = Setup::new(CacheStrategy::DatabaseFirst).build(controller, CacheRegistry::shared())?;

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..2)));
    assert_eq!(database.row(LATEST), None);
    assert_eq!(callback.successes().len(), 1);
    Ok(())
}

#[tokio::test]
async fn network_data_is_intercepted_before_storing() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new(),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..2))),
    )
    .with_interceptor(|origin, articles: &mut Articles| {
        if origin == DataOrigin::Network {
            articles.retain(|article| article.id != 0);
        }
    });
    let database = controller.database();
    let (repository, _) = Setup::new(CacheStrategy::DatabaseFirst).build(controller, CacheRegistry::shared())?;

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(1..2)));
    assert_eq!(database.row(LATEST), Some(Article::list(1..2)));
    Ok(())
}

#[tokio::test]
async fn stale_completion_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let network = ScriptedNetwork::new()
        .with_reply("slow", Reply::Data(Article::list(0..1)))
        .with_reply("fast", Reply::Data(Article::list(0..2)));
    network.hold("slow");
    let controller = TestController::new(MemoryDatabase::new(), network);
    let database = controller.database();
    let network = controller.network();
    let (repository, _) = Setup::new(CacheStrategy::DatabaseFirst).build(controller, CacheRegistry::shared())?;

    let (_slow_ticket, slow) = repository.spawn_fetch("slow".to_string());
    wait_for_requests(&network, 1).await;

    assert_eq!(repository.fetch(&"fast".to_string()).await, Some(Article::list(0..2)));

    network.release("slow");
    assert_eq!(slow.await?, None);

    assert_eq!(repository.value(), Some(Article::list(0..2)));
    assert_eq!(repository.data().publish_count(), 1);
    assert_eq!(database.row("slow"), None);
    Ok(())
}

#[tokio::test]
async fn stale_completion_leaves_shared_cache_alone() -> Result<(), Box<dyn std::error::Error>> {
    let registry = CacheRegistry::shared();
    let network = ScriptedNetwork::new()
        .with_reply("slow", Reply::Data(Article::list(0..1)))
        .with_reply("fast", Reply::Data(Article::list(0..2)));
    network.hold("slow");
    let controller = TestController::new(MemoryDatabase::new(), network);
    let database = controller.database();
    let network = controller.network();
    let (repository, callback) = Setup::new(CacheStrategy::MemoryFirst)
        .named("articles")
        .build(controller, Arc::clone(&registry))?;

    let (_slow_ticket, slow) = repository.spawn_fetch("slow".to_string());
    wait_for_requests(&network, 1).await;

    assert_eq!(repository.fetch(&"fast".to_string()).await, Some(Article::list(0..2)));

    network.release("slow");
    assert_eq!(slow.await?, None);

    assert_eq!(repository.value(), Some(Article::list(0..2)));
    assert_eq!(registry.get::<Articles>("articles").await, Some(Article::list(0..2)));
    assert_eq!(database.row("slow"), None);
    assert_eq!(callback.successes(), vec![Article::list(0..2)]);

    // Offline, memory comes first and must hold what the slot showed.
    network.set_online(false);
    assert_eq!(repository.fetch(&"fast".to_string()).await, Some(Article::list(0..2)));
    Ok(())
}

#[tokio::test]
async fn network_error_clears_data_when_configured() -> Result<(), Box<dyn std::error::Error>> {
    let registry = CacheRegistry::shared();
    let controller = TestController::new(
        MemoryDatabase::new(),
        ScriptedNetwork::new()
            .with_reply(LATEST, Reply::Data(Article::list(0..3)))
            .with_reply(LATEST, Reply::Status(502)),
    );
    let database = controller.database();
    let (repository, callback) = Setup::new(CacheStrategy::MemoryFirst)
        .named("articles")
        .clear_on_error()
        .build(controller, Arc::clone(&registry))?;
    let rx = repository.data().watch();

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..3)));
    assert!(registry.contains("articles"));
    assert_eq!(database.row(LATEST), Some(Article::list(0..3)));

    assert_eq!(repository.fetch(&query()).await, None);

    assert_eq!(callback.failure_codes(), vec![502]);
    assert!(!repository.data().has_value());
    assert_eq!(*rx.borrow(), None);
    assert!(!registry.contains("articles"));
    assert_eq!(database.row(LATEST), None);
    Ok(())
}

#[tokio::test]
async fn clearing_on_error_spares_preloaded_value() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new().with_row(LATEST, Article::list(0..2)),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Transport("timeout".into())),
    );
    let database = controller.database();
    let (repository, callback) = Setup::new(CacheStrategy::DatabaseFirst)
        .preload()
        .clear_on_error()
        .build(controller, CacheRegistry::shared())?;

    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..2)));

    assert_eq!(repository.value(), Some(Article::list(0..2)));
    assert_eq!(database.row(LATEST), Some(Article::list(0..2)));
    assert_eq!(callback.failure_codes(), vec![NetworkFailure::TRANSPORT]);
    Ok(())
}

#[tokio::test]
async fn cancelled_fetch_is_abandoned() -> Result<(), Box<dyn std::error::Error>> {
    let network = ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..3)));
    network.hold(LATEST);
    let controller = TestController::new(MemoryDatabase::new(), network);
    let database = controller.database();
    let network = controller.network();
    let (repository, callback) = Setup::new(CacheStrategy::DatabaseFirst).build(controller, CacheRegistry::shared())?;

    let (ticket, handle) = repository.spawn_fetch(query());
    wait_for_requests(&network, 1).await;
    ticket.cancel();

    assert_eq!(handle.await?, None);
    assert!(!repository.data().has_value());
    assert_eq!(database.writes(), 0);
    assert!(callback.successes().is_empty());
    assert!(callback.failures().is_empty());
    Ok(())
}

#[tokio::test]
async fn cancel_all_abandons_every_fetch() -> Result<(), Box<dyn std::error::Error>> {
    let network = ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..3)));
    network.hold(LATEST);
    let controller = TestController::new(MemoryDatabase::new(), network);
    let network = controller.network();
    let (repository, _) = Setup::new(CacheStrategy::DatabaseFirst).build(controller, CacheRegistry::shared())?;

    let (_, first) = repository.spawn_fetch(query());
    let (_, second) = repository.spawn_fetch(query());
    wait_for_requests(&network, 2).await;
    repository.cancel_all();

    assert_eq!(first.await?, None);
    assert_eq!(second.await?, None);

    // Fetches started afterwards are not affected.
    network.release(LATEST);
    assert_eq!(repository.fetch(&query()).await, Some(Article::list(0..3)));
    Ok(())
}

#[tokio::test]
async fn paging_through_fetched_list() -> Result<(), Box<dyn std::error::Error>> {
    let controller = TestController::new(
        MemoryDatabase::new(),
        ScriptedNetwork::new().with_reply(LATEST, Reply::Data(Article::list(0..25))),
    );
    let (repository, _) = Setup::new(CacheStrategy::DatabaseFirst).build(controller, CacheRegistry::shared())?;

    assert_eq!(repository.pager().total_count(), 0);

    repository.fetch(&query()).await;

    let mut pager = repository.pager().with_page_size(10)?.with_current_page(2);
    assert_eq!(pager.page_count(), 3);
    assert_eq!(pager.current(), Article::list(20..25));
    assert!(!pager.has_next_page());

    pager.set_current_page(pager.next_page());
    assert!(pager.current().is_empty());

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    pager.set_current_page(0);
    pager.set_page_callback(move |page| sink.lock().push(page));
    pager.accept(&DefaultPageDataVisitor);
    assert_eq!(*delivered.lock(), vec![Article::list(0..10)]);
    Ok(())
}
