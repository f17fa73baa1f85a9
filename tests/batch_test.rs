mod common;

use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;

use common::{Script, ScriptedProvider, chain_of, day, memory_cache};
use epg_sync::cache::Cache;
use epg_sync::models::{ChannelMappingInfo, ProviderConfig};
use epg_sync::providers::Provider;
use epg_sync::utils::date_range;

fn infos(provider_id: &str, channels: &[&str]) -> Vec<ChannelMappingInfo> {
    channels
        .iter()
        .map(|ch| ChannelMappingInfo::new(provider_id, *ch, ch.to_uppercase()))
        .collect()
}

#[tokio::test]
async fn one_failing_item_does_not_cancel_its_siblings() {
    let provider = ScriptedProvider::new("p", 1, &[("ok1", "OK1"), ("bad", "BAD"), ("ok2", "OK2")])
        .script("ok1", Script::Titles(vec!["A", "B"]))
        .script("bad", Script::Fail("timeout"))
        .script("ok2", Script::Titles(vec!["C"]))
        .shared();
    let _chain = chain_of(&[provider.clone()], memory_cache());

    let outcome = Arc::clone(&provider)
        .fetch_epg_batch(infos("p", &["ok1", "bad", "ok2"]), day("2024-05-01"))
        .await;

    assert_eq!(outcome.programs.len(), 3);
    assert_eq!((outcome.fetched, outcome.failed, outcome.cache_hits), (2, 1, 0));
    assert!(!outcome.is_complete());
    assert!(outcome.first_error.as_ref().unwrap().to_string().contains("timeout"));
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn cached_items_never_reach_the_upstream() {
    let provider = ScriptedProvider::new("p", 1, &[("a", "A"), ("b", "B"), ("c", "C")])
        .script("a", Script::Titles(vec!["A"]))
        .script("b", Script::Titles(vec!["B"]))
        .script("c", Script::Titles(vec!["C"]))
        .shared();
    let _chain = chain_of(&[provider.clone()], memory_cache());
    let date = day("2024-05-01");

    let first = Arc::clone(&provider)
        .fetch_epg_batch(infos("p", &["a", "b", "c"]), date)
        .await;
    assert_eq!(first.fetched, 3);
    assert_eq!(provider.calls(), 3);

    let second = Arc::clone(&provider)
        .fetch_epg_batch(infos("p", &["a", "b", "c"]), date)
        .await;
    assert_eq!(second.cache_hits, 3);
    assert_eq!(second.programs.len(), 3);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn failed_items_are_not_cached() {
    let provider = ScriptedProvider::new("p", 1, &[("bad", "BAD")])
        .script("bad", Script::Fail("boom"))
        .shared();
    let _chain = chain_of(&[provider.clone()], memory_cache());
    let date = day("2024-05-01");

    for _ in 0..2 {
        let outcome = Arc::clone(&provider)
            .fetch_epg_batch(infos("p", &["bad"]), date)
            .await;
        assert_eq!(outcome.failed, 1);
    }
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn multi_day_window_fills_eight_dates_with_one_request() {
    let provider = ScriptedProvider::new("md", 1, &[("cctv1", "CCTV-1")])
        .multi_day()
        .script("cctv1", Script::Titles(vec!["News", "Weather"]))
        .shared();
    let cache = memory_cache();
    let _chain = chain_of(&[provider.clone()], Arc::clone(&cache));
    let date = day("2024-05-10");

    let batch = infos("md", &["cctv1", "cctv1", "cctv1"]);
    let outcome = Arc::clone(&provider).fetch_epg_batch(batch, date).await;

    assert_eq!(provider.window_calls(), 1);
    assert_eq!(provider.single_calls(), 0);
    assert_eq!(outcome.programs.len(), 2);
    assert!(outcome.programs.iter().all(|p| p.channel_id == "CCTV1"));

    let window = date_range(date - ChronoDuration::days(6), date + ChronoDuration::days(1));
    assert_eq!(window.len(), 8);
    for cached_day in window {
        let key = provider.base().cache_key("cctv1", "CCTV1", cached_day);
        assert!(cache.exists(&key).await.unwrap(), "missing {key}");
    }
    let outside = provider
        .base()
        .cache_key("cctv1", "CCTV1", date + ChronoDuration::days(2));
    assert!(!cache.exists(&outside).await.unwrap());
}

#[tokio::test]
async fn multi_day_single_fetch_reads_the_window_cache() {
    let provider = ScriptedProvider::new("md", 1, &[("cctv1", "CCTV-1")])
        .multi_day()
        .script("cctv1", Script::Titles(vec!["News"]))
        .shared();
    let _chain = chain_of(&[provider.clone()], memory_cache());
    let date = day("2024-05-10");

    provider.fetch_epg("cctv1", "CCTV1", date).await.unwrap();
    let earlier = provider
        .fetch_epg("cctv1", "CCTV1", date - ChronoDuration::days(3))
        .await
        .unwrap();

    assert_eq!(earlier.len(), 1);
    assert_eq!(provider.window_calls(), 1);
}

#[tokio::test]
async fn workers_never_exceed_the_rate_limit() {
    let channels: Vec<(String, String)> =
        (0..8).map(|i| (format!("c{i}"), format!("C{i}"))).collect();
    let catalog: Vec<(&str, &str)> = channels
        .iter()
        .map(|(id, name)| (id.as_str(), name.as_str()))
        .collect();

    let mut config = ProviderConfig::new("slow", "Slow", "http://localhost");
    config.rate_limit = 2;
    let mut provider = ScriptedProvider::with_config(config, &catalog)
        .unwrap()
        .with_delay(Duration::from_millis(20));
    for (id, _) in &catalog {
        provider = provider.script(id, Script::Titles(vec!["Show"]));
    }
    let provider = provider.shared();
    let _chain = chain_of(&[provider.clone()], memory_cache());

    let ids: Vec<&str> = catalog.iter().map(|(id, _)| *id).collect();
    let outcome = Arc::clone(&provider)
        .fetch_epg_batch(infos("slow", &ids), day("2024-05-01"))
        .await;

    assert_eq!(outcome.fetched, 8);
    assert_eq!(provider.calls(), 8);
    assert!(provider.max_in_flight() <= 2);
}
