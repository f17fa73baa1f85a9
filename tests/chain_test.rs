mod common;

use chrono::Timelike;
use rstest::rstest;

use common::{Script, ScriptedProvider, TZ, chain_of, day, memory_cache};
use epg_sync::errors::ProviderError;
use epg_sync::models::{ChannelMappingInfo, ProviderConfig};

#[tokio::test]
async fn falls_back_to_the_next_provider_on_failure() {
    let a = ScriptedProvider::new("a", 1, &[("cctv1", "CCTV-1")])
        .catalog_only()
        .script("cctv1", Script::Fail("upstream down"))
        .shared();
    let b = ScriptedProvider::new("b", 2, &[("cctv1", "CCTV-1")])
        .catalog_only()
        .script("cctv1", Script::Titles(vec!["News"]))
        .shared();
    let chain = chain_of(&[b.clone(), a.clone()], memory_cache());

    let info = ChannelMappingInfo::new("a", "cctv1", "CCTV1");
    let programs = chain.fetch_epg(&info, day("2024-05-01")).await.unwrap();

    assert_eq!(programs.len(), 1);
    assert_eq!(programs[0].title, "News");
    assert_eq!(programs[0].provider_id, "b");
    let start = programs[0].start_time.with_timezone(&TZ);
    assert_eq!((start.hour(), programs[0].end_time.with_timezone(&TZ).hour()), (8, 9));
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn stops_at_the_first_success() {
    let providers: Vec<_> = [
        ("p1", Script::Fail("boom")),
        ("p2", Script::Fail("boom")),
        ("p3", Script::Titles(vec!["Morning"])),
        ("p4", Script::Titles(vec!["Never"])),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (id, script))| {
        ScriptedProvider::new(id, i as i32, &[("ch", "Channel")])
            .catalog_only()
            .script("ch", script)
            .shared()
    })
    .collect();
    let chain = chain_of(&providers, memory_cache());

    let info = ChannelMappingInfo::new("p1", "ch", "CH");
    let programs = chain.fetch_epg(&info, day("2024-05-01")).await.unwrap();

    assert_eq!(programs[0].provider_id, "p3");
    let calls: Vec<usize> = providers.iter().map(|p| p.calls()).collect();
    assert_eq!(calls, vec![1, 1, 1, 0]);
}

#[tokio::test]
async fn exhausted_chain_wraps_the_last_error() {
    let a = ScriptedProvider::new("a", 1, &[("ch", "Channel")])
        .catalog_only()
        .script("ch", Script::Fail("first"))
        .shared();
    let b = ScriptedProvider::new("b", 2, &[("ch", "Channel")])
        .catalog_only()
        .script("ch", Script::Fail("second"))
        .shared();
    let chain = chain_of(&[a, b], memory_cache());

    let err = chain
        .fetch_epg(&ChannelMappingInfo::new("a", "ch", "CH"), day("2024-05-01"))
        .await
        .unwrap_err();

    match err {
        ProviderError::AllFailed { last } => assert!(last.to_string().contains("second")),
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
#[case::unknown_channel("a", "missing")]
#[case::other_provider("zzz", "ch")]
#[tokio::test]
async fn no_candidate_is_not_found(#[case] provider_id: &str, #[case] provider_channel_id: &str) {
    let a = ScriptedProvider::new("a", 1, &[("ch", "Channel")])
        .script("ch", Script::Titles(vec!["News"]))
        .shared();
    let chain = chain_of(&[a.clone()], memory_cache());

    let info = ChannelMappingInfo::new(provider_id, provider_channel_id, "CH");
    let err = chain.fetch_epg(&info, day("2024-05-01")).await.unwrap_err();

    assert!(matches!(err, ProviderError::NotFound { .. }));
    assert_eq!(a.calls(), 0);
}

#[tokio::test]
async fn providers_are_ordered_by_priority_keeping_ties_stable() {
    let providers = [
        ScriptedProvider::new("late", 10, &[]).shared(),
        ScriptedProvider::new("tie_first", 5, &[]).shared(),
        ScriptedProvider::new("tie_second", 5, &[]).shared(),
        ScriptedProvider::new("early", -1, &[]).shared(),
    ];
    let chain = chain_of(&providers, memory_cache());

    let order: Vec<&str> = chain.providers().iter().map(|p| p.id()).collect();
    assert_eq!(order, vec!["early", "tie_first", "tie_second", "late"]);
}

#[tokio::test]
async fn parallel_fetch_keeps_first_provider_with_programs() {
    let a = ScriptedProvider::new("a", 1, &[("a1", "A1")])
        .script("a1", Script::Fail("down"))
        .shared();
    let b = ScriptedProvider::new("b", 2, &[("b1", "B1")])
        .script("b1", Script::Titles(vec!["Film"]))
        .shared();
    let chain = chain_of(&[a.clone(), b.clone()], memory_cache());

    let infos = vec![
        ChannelMappingInfo::new("a", "a1", "CH"),
        ChannelMappingInfo::new("b", "b1", "CH"),
    ];
    let programs = chain
        .fetch_epg_parallel(&infos, day("2024-05-01"))
        .await
        .unwrap();

    assert_eq!(programs.len(), 1);
    assert_eq!(programs[0].provider_id, "b");
    assert_eq!((a.calls(), b.calls()), (1, 1));
}

#[tokio::test]
async fn parallel_fetch_without_providers_fails() {
    let chain = chain_of(&[], memory_cache());
    let err = chain
        .fetch_epg_parallel(&[ChannelMappingInfo::new("a", "a1", "CH")], day("2024-05-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NoEnabledProviders));
}

#[tokio::test]
async fn parallel_fetch_rejects_channels_outside_the_catalog() {
    let p = ScriptedProvider::new("p", 1, &[("ch", "Channel")])
        .script("ch", Script::Titles(vec!["News"]))
        .script("ghost", Script::Titles(vec!["Ghost Show"]))
        .shared();
    let chain = chain_of(&[p.clone()], memory_cache());

    let infos = [ChannelMappingInfo::new("p", "ghost", "GHOST")];
    let err = chain
        .fetch_epg_parallel(&infos, day("2024-05-01"))
        .await
        .unwrap_err();

    match err {
        ProviderError::UnsupportedChannel {
            provider_channel_id,
            ..
        } => assert_eq!(provider_channel_id, "ghost"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(p.calls(), 0);
}

#[tokio::test]
async fn parallel_fetch_drops_unsupported_mappings_from_the_batch() {
    let p = ScriptedProvider::new("p", 1, &[("ch", "Channel")])
        .script("ch", Script::Titles(vec!["News"]))
        .script("ghost", Script::Titles(vec!["Ghost Show"]))
        .shared();
    let chain = chain_of(&[p.clone()], memory_cache());

    let infos = vec![
        ChannelMappingInfo::new("p", "ghost", "GHOST"),
        ChannelMappingInfo::new("p", "ch", "CH"),
    ];
    let programs = chain
        .fetch_epg_parallel(&infos, day("2024-05-01"))
        .await
        .unwrap();

    let titles: Vec<&str> = programs.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["News"]);
    assert_eq!(p.calls(), 1);
}

#[tokio::test]
async fn validation_failures_are_reported_when_the_chain_is_exhausted() {
    let config = ProviderConfig::new("a", " ", "http://localhost").with_priority(1);
    let invalid = ScriptedProvider::with_config(config, &[("ch", "Channel")])
        .unwrap()
        .catalog_only()
        .script("ch", Script::Titles(vec!["News"]))
        .shared();
    let chain = chain_of(&[invalid.clone()], memory_cache());

    let err = chain
        .fetch_epg(&ChannelMappingInfo::new("a", "ch", "CH"), day("2024-05-01"))
        .await
        .unwrap_err();

    match err {
        ProviderError::AllFailed { last } => {
            assert!(matches!(*last, ProviderError::InvalidConfig { .. }))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(invalid.calls(), 0);
}
