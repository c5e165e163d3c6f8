use super::*;
use chrono::{Duration, TimeZone};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

struct FakeBackend {
    token: Option<&'static str>,
    response: Option<UsageData>,
    fetches: AtomicUsize,
}

impl FakeBackend {
    fn new(token: Option<&'static str>, response: Option<UsageData>) -> Self {
        Self {
            token,
            response,
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl UsageBackend for FakeBackend {
    async fn token(&self) -> Option<String> {
        self.token.map(String::from)
    }

    async fn fetch(&self, _token: &str) -> Option<UsageData> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 16, 12, 0, 0).unwrap()
}

fn limit(utilization: f64, resets_in_hours: Option<i64>) -> Option<UsageLimit> {
    Some(UsageLimit {
        utilization,
        resets_at: resets_in_hours.map(|h| now() + Duration::hours(h)),
    })
}

fn data(session: f64) -> UsageData {
    UsageData {
        session: limit(session, Some(2)),
        weekly: limit(17.0, Some(100)),
        sonnet: limit(5.0, None),
        fetched_at: now(),
    }
}

fn ctx(cache_dir: Option<&Path>) -> RenderContext {
    RenderContext {
        cache_dir: cache_dir.map(Path::to_path_buf),
        ..RenderContext::default()
    }
}

#[tokio::test]
async fn test_refresh_fetches_and_saves() {
    let dir = tempfile::tempdir().unwrap();
    let cache = UsageCache::new(dir.path(), 30);
    let backend = FakeBackend::new(Some("tok"), Some(data(42.0)));

    let refresh = refresh_usage(&backend, Some(&cache), now()).await;
    assert_eq!(refresh.data, Some(data(42.0)));
    assert!(refresh.notes.is_empty());
    assert_eq!(cache.load().unwrap().data, Some(data(42.0)));
}

#[tokio::test]
async fn test_refresh_rate_limited_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = UsageCache::new(dir.path(), 30);
    cache.save(Some(&data(10.0)), now()).unwrap();
    let backend = FakeBackend::new(Some("tok"), Some(data(42.0)));

    let refresh = refresh_usage(&backend, Some(&cache), now() + Duration::seconds(5)).await;
    assert_eq!(refresh.data, Some(data(10.0)));
    assert_eq!(refresh.notes, vec![RefreshNote::RateLimited]);
    assert_eq!(backend.fetches.load(Ordering::SeqCst), 0);

    let refresh = refresh_usage(&backend, Some(&cache), now() + Duration::seconds(31)).await;
    assert_eq!(refresh.data, Some(data(42.0)));
    assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_fetch_keeps_cache_and_throttles() {
    let dir = tempfile::tempdir().unwrap();
    let cache = UsageCache::new(dir.path(), 30);
    cache.save(Some(&data(10.0)), now()).unwrap();
    let backend = FakeBackend::new(Some("tok"), None);

    let later = now() + Duration::seconds(60);
    let refresh = refresh_usage(&backend, Some(&cache), later).await;
    assert_eq!(refresh.data, Some(data(10.0)));
    assert_eq!(refresh.notes, vec![RefreshNote::ApiFailed]);

    // The failed attempt is recorded, the data keeps its fetch time
    let saved = cache.load().unwrap();
    assert_eq!(saved.attempted_at, later);
    assert_eq!(saved.data.unwrap().fetched_at, now());

    let refresh = refresh_usage(&backend, Some(&cache), later + Duration::seconds(10)).await;
    assert_eq!(refresh.notes, vec![RefreshNote::RateLimited]);
    assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failing_fetch_throttled_without_cached_data() {
    let dir = tempfile::tempdir().unwrap();
    let cache = UsageCache::new(dir.path(), 30);
    let backend = FakeBackend::new(Some("tok"), None);

    for secs in 0..5 {
        let refresh = refresh_usage(&backend, Some(&cache), now() + Duration::seconds(secs)).await;
        assert!(refresh.data.is_none());
    }
    assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(cache.load().unwrap().attempted_at, now());

    let refresh = refresh_usage(&backend, Some(&cache), now() + Duration::seconds(30)).await;
    assert_eq!(refresh.notes, vec![RefreshNote::ApiFailed, RefreshNote::NoData]);
    assert_eq!(backend.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_no_token_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = UsageCache::new(dir.path(), 30);
    cache.save(Some(&data(10.0)), now()).unwrap();
    let backend = FakeBackend::new(None, Some(data(42.0)));

    let refresh = refresh_usage(&backend, Some(&cache), now() + Duration::hours(1)).await;
    assert_eq!(refresh.data, Some(data(10.0)));
    assert_eq!(refresh.notes, vec![RefreshNote::NoToken]);
    assert_eq!(backend.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_nothing_available() {
    let backend = FakeBackend::new(Some("tok"), None);
    let refresh = refresh_usage(&backend, None, now()).await;
    assert!(refresh.data.is_none());
    assert_eq!(refresh.notes, vec![RefreshNote::ApiFailed, RefreshNote::NoData]);
}

#[tokio::test]
async fn test_render_multiline() {
    let module = UsageModule::with_backend(
        &ctx(None),
        UsageOptions::default(),
        Box::new(FakeBackend::new(Some("tok"), Some(data(42.0)))),
    );
    let out = module.render_at(now()).await.unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "Usage:");
    assert_eq!(lines[1], "├ Session: 42% (2h 0m)");
    let weekly_reset = format_reset_at(now() + Duration::hours(100));
    assert_eq!(lines[2], format!("└ Weekly:  17% ({weekly_reset})"));
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn test_render_single_line_with_bars() {
    let options = UsageOptions {
        multiline: false,
        show_progress_bar: true,
        show_sonnet: true,
        weekly_time_format: TimeFormat::Remaining,
        ..UsageOptions::default()
    };
    let module = UsageModule::with_backend(
        &ctx(None),
        options,
        Box::new(FakeBackend::new(Some("tok"), Some(data(42.0)))),
    );
    let out = module.render_at(now()).await.unwrap();
    assert_eq!(
        out,
        "Usage: 5h [██░░░] 42% (2h 0m) | 7d [░░░░░] 17% (4d 4h) | Sonnet [░░░░░] 5% (—)"
    );
}

#[tokio::test]
async fn test_render_hides_reset_time() {
    let options = UsageOptions {
        show_reset_time: false,
        show_weekly: false,
        ..UsageOptions::default()
    };
    let module = UsageModule::with_backend(
        &ctx(None),
        options,
        Box::new(FakeBackend::new(Some("tok"), Some(data(42.0)))),
    );
    assert_eq!(module.render_at(now()).await.unwrap(), "Usage:\n└ Session: 42%");
}

#[tokio::test]
async fn test_render_without_data() {
    let module = UsageModule::with_backend(
        &ctx(None),
        UsageOptions::default(),
        Box::new(FakeBackend::new(None, None)),
    );
    assert_eq!(module.render_at(now()).await, None);
}

#[tokio::test]
async fn test_debug_appends_notes() {
    let context = RenderContext {
        debug: true,
        ..ctx(None)
    };
    let module = UsageModule::with_backend(
        &context,
        UsageOptions::default(),
        Box::new(FakeBackend::new(None, None)),
    );
    assert_eq!(
        module.render_at(now()).await.unwrap(),
        "[usage_limits] No token, using cache"
    );
}

#[test]
fn test_options_from_toml() {
    let options: UsageOptions =
        toml::from_str("multiline = false\nsession_time_format = \"reset_at\"\nrate_limit = 120")
            .unwrap();
    assert!(!options.multiline);
    assert_eq!(options.session_time_format, TimeFormat::ResetAt);
    assert_eq!(options.rate_limit, 120);
    assert_eq!(options.bar_width, 10);
}
