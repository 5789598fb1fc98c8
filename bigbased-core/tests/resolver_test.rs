//! Tenant resolution integration tests

use crate::common::{enabled_tenancy, memory_cache, tenant, TestAppState, TestDomainRepository, T0};
use bigbased_core::cache::remote::KvRestClient;
use bigbased_core::cache::{CacheManager, CacheOperations};
use bigbased_core::clock::ManualClock;
use bigbased_core::config::TenancyConfig;
use bigbased_core::domain::{is_valid_domain, SiteType};
use bigbased_core::service::{TenantResolver, VisitTracker};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

#[tokio::test]
async fn test_store_hit_is_cached_in_memory() {
    let state = TestAppState::enabled();
    state
        .repo
        .add_domain(tenant(7, "basedbook.com", SiteType::Basedbook))
        .await;

    let first = state.resolver.resolve("WWW.BasedBook.com:443").await;
    let second = state.resolver.resolve("basedbook.com").await;

    assert_eq!(first.id, 7);
    assert_eq!(first, second);
    assert_eq!(state.repo.lookups(), 1);
    assert_eq!(state.cache.memory().len(), 1);
}

#[tokio::test]
async fn test_cached_entry_expires_after_ttl() {
    let state = TestAppState::enabled();
    state
        .repo
        .add_domain(tenant(1, "bigbased.com", SiteType::Bigbased))
        .await;

    state.resolver.resolve("bigbased.com").await;
    state.clock.advance(Duration::from_secs(301));
    state.resolver.resolve("bigbased.com").await;

    assert_eq!(state.repo.lookups(), 2);
}

#[tokio::test]
async fn test_sweep_removes_expired_entries() {
    let state = TestAppState::enabled();
    state
        .repo
        .add_domain(tenant(1, "bigbased.com", SiteType::Bigbased))
        .await;

    state.resolver.resolve("bigbased.com").await;
    assert_eq!(state.cache.sweep(), 0);

    state.clock.advance(Duration::from_secs(301));
    assert_eq!(state.cache.sweep(), 1);
    assert!(state.cache.memory().is_empty());
}

#[tokio::test]
async fn test_unknown_domain_gets_default_config() {
    let state = TestAppState::enabled();

    let config = state.resolver.resolve("shop.random-custom.org").await;

    assert!(config.is_default());
    assert_eq!(config.domain, "shop.random-custom.org");
    assert_eq!(config.site_type, SiteType::Custom);
    assert!(config.is_active);
    // Defaults are not cached; a later insert is picked up immediately
    assert!(state.cache.memory().is_empty());
}

#[tokio::test]
async fn test_inactive_domain_is_not_served() {
    let state = TestAppState::enabled();
    let mut inactive = tenant(3, "basedbook.com", SiteType::Basedbook);
    inactive.is_active = false;
    state.repo.add_domain(inactive).await;

    let config = state.resolver.resolve("basedbook.com").await;

    assert!(config.is_default());
    assert_eq!(config.site_type, SiteType::Basedbook);
}

#[tokio::test]
async fn test_store_outage_degrades_to_default() {
    let state = TestAppState::enabled();
    state.repo.set_failing(true);

    let config = state.resolver.resolve("basedbook.com").await;

    assert!(config.is_default());
    assert_eq!(config.domain, "basedbook.com");
}

#[tokio::test]
async fn test_cache_keeps_serving_through_store_outage() {
    let state = TestAppState::enabled();
    state
        .repo
        .add_domain(tenant(9, "basedbook.com", SiteType::Basedbook))
        .await;
    state.resolver.resolve("basedbook.com").await;

    state.repo.set_failing(true);
    let config = state.resolver.resolve("basedbook.com").await;

    assert_eq!(config.id, 9);
}

#[tokio::test]
async fn test_disabled_resolution_never_touches_store() {
    let state = TestAppState::new(TenancyConfig::default());
    state
        .repo
        .add_domain(tenant(7, "basedbook.com", SiteType::Basedbook))
        .await;

    let config = state.resolver.resolve("basedbook.com").await;

    assert!(config.is_default());
    assert_eq!(config.site_type, SiteType::Basedbook);
    assert_eq!(state.repo.lookups(), 0);
    assert!(state.cache.memory().is_empty());
}

#[tokio::test]
async fn test_invalidate_picks_up_store_changes() {
    let state = TestAppState::enabled();
    state
        .repo
        .add_domain(tenant(4, "books.example.org", SiteType::Custom))
        .await;
    state.resolver.resolve("books.example.org").await;

    state
        .repo
        .update_domain("books.example.org", |c| c.site_type = SiteType::Basedbook)
        .await;
    assert_eq!(
        state.resolver.resolve("books.example.org").await.site_type,
        SiteType::Custom
    );

    let canonical = state.resolver.invalidate("www.books.example.org:8443").await;
    assert_eq!(canonical, "books.example.org");
    assert_eq!(
        state.resolver.resolve("books.example.org").await.site_type,
        SiteType::Basedbook
    );
}

#[tokio::test]
async fn test_malformed_hosts_resolve_to_default_domain() {
    let state = TestAppState::enabled();

    for host in ["", "   ", "bad host!", ":8080", "-leading.com"] {
        let config = state.resolver.resolve(host).await;
        assert_eq!(config.domain, "bigbased.com", "host {:?}", host);
        assert!(is_valid_domain(&config.domain));
        assert_eq!(config.site_type, SiteType::Bigbased);
    }
}

#[tokio::test]
async fn test_custom_default_domain_is_used_for_malformed_hosts() {
    let state = TestAppState::new(TenancyConfig {
        default_domain: "basedbook.com".to_string(),
        ..enabled_tenancy()
    });

    let config = state.resolver.resolve("").await;

    assert_eq!(config.domain, "basedbook.com");
    assert_eq!(config.site_type, SiteType::Basedbook);
}

#[tokio::test]
async fn test_unreachable_remote_store_falls_back_to_memory() {
    // Nothing listens on this port
    let remote = KvRestClient::new("http://127.0.0.1:9", "token", Duration::from_millis(200))
        .unwrap();
    let clock = ManualClock::new(T0);
    let cache = Arc::new(CacheManager::new(Some(remote), Arc::new(clock)));
    let repo = Arc::new(TestDomainRepository::new());
    repo.add_domain(tenant(5, "bigbased.com", SiteType::Bigbased))
        .await;
    let resolver = TenantResolver::new(repo.clone(), cache.clone(), enabled_tenancy());

    assert_eq!(resolver.resolve("bigbased.com").await.id, 5);
    assert_eq!(resolver.resolve("bigbased.com").await.id, 5);

    assert_eq!(repo.lookups(), 1);
    assert!(cache
        .get_domain_config("bigbased.com")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_remote_hit_skips_store() {
    let server = MockServer::start().await;
    let cached = tenant(11, "basedbook.com", SiteType::Basedbook);
    Mock::given(method("GET"))
        .and(path("/get/bigbased:domain:basedbook.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": serde_json::to_string(&cached).unwrap()
        })))
        .mount(&server)
        .await;

    let remote = KvRestClient::new(&server.uri(), "token", Duration::from_secs(2)).unwrap();
    let cache = Arc::new(CacheManager::new(Some(remote), Arc::new(ManualClock::new(T0))));
    let repo = Arc::new(TestDomainRepository::new());
    let resolver = TenantResolver::new(repo.clone(), cache, enabled_tenancy());

    let config = resolver.resolve("basedbook.com").await;

    assert_eq!(config, cached);
    assert_eq!(repo.lookups(), 0);
}

#[tokio::test]
async fn test_resolve_and_track_posts_visit_for_persisted_tenant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/visits"))
        .and(body_json(serde_json::json!({"domainId": 42, "type": "visit"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let clock = ManualClock::new(T0);
    let repo = Arc::new(TestDomainRepository::new());
    repo.add_domain(tenant(42, "basedbook.com", SiteType::Basedbook))
        .await;
    let (tracker, delivery) = VisitTracker::spawn(format!("{}/visits", server.uri()));
    let resolver = TenantResolver::new(repo, Arc::new(memory_cache(&clock)), enabled_tenancy())
        .with_visit_tracker(tracker);

    let config = resolver.resolve_and_track("basedbook.com").await;
    assert_eq!(config.id, 42);

    // Unknown hosts get the default config, which is never tracked
    resolver.resolve_and_track("unknown-host.net").await;

    // Dropping the resolver closes the queue; the task drains it and exits
    drop(resolver);
    tokio::time::timeout(Duration::from_secs(5), delivery)
        .await
        .unwrap()
        .unwrap();
    server.verify().await;
}
