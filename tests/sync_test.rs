mod common;

use chrono::{Duration as ChronoDuration, Utc};

use common::{Harness, Script, ScriptedProvider, TZ, day, program};
use epg_sync::errors::AppError;
use epg_sync::models::{ChannelMappingInfo, Program};
use epg_sync::services::DateSyncOutcome;
use epg_sync::utils::{TimeWindow, today_in};

fn cctv_provider(titles: Vec<&'static str>) -> std::sync::Arc<ScriptedProvider> {
    ScriptedProvider::new("p", 1, &[("cctv1", "CCTV-1")])
        .script("cctv1", Script::Titles(titles))
        .shared()
}

async fn stored(harness: &Harness, channel_id: &str, date: chrono::NaiveDate) -> Vec<Program> {
    harness
        .program_repo
        .list_by_channel_and_time_range(channel_id, TimeWindow::for_day(date, TZ))
        .await
        .unwrap()
}

#[tokio::test]
async fn sync_is_idempotent_per_date() {
    let provider = cctv_provider(vec!["Morning News", "Weather"]);
    let harness = Harness::new(&[provider.clone()], &[("CCTV1", "CCTV-1")]).await;
    harness.map("CCTV1", "p", "cctv1").await;

    let first = harness
        .epg
        .sync_epg("CCTV1", day("2024-05-01"), day("2024-05-02"))
        .await
        .unwrap();
    assert_eq!(first.persisted_programs(), 4);
    assert_eq!(provider.calls(), 2);

    let second = harness
        .epg
        .sync_epg("CCTV1", day("2024-05-01"), day("2024-05-02"))
        .await
        .unwrap();
    assert_eq!(second.skipped(), 2);
    assert_eq!(second.persisted_programs(), 0);
    assert_eq!(provider.calls(), 2);

    let programs = harness.epg.get_epg("CCTV1", day("2024-05-01")).await.unwrap();
    let titles: Vec<&str> = programs.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Morning News", "Weather"]);
}

#[tokio::test]
async fn sync_without_mapping_is_not_found() {
    let harness = Harness::new(&[cctv_provider(vec!["News"])], &[("CCTV1", "CCTV-1")]).await;

    let err = harness
        .epg
        .sync_epg("CCTV1", day("2024-05-01"), day("2024-05-01"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn reversed_range_is_rejected() {
    let harness = Harness::new(&[cctv_provider(vec!["News"])], &[]).await;

    let err = harness
        .epg
        .sync_epg("CCTV1", day("2024-05-02"), day("2024-05-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn empty_listing_counts_as_failure() {
    let provider = cctv_provider(vec![]);
    let harness = Harness::new(&[provider], &[("CCTV1", "CCTV-1")]).await;
    harness.map("CCTV1", "p", "cctv1").await;

    let report = harness
        .epg
        .sync_epg("CCTV1", day("2024-05-01"), day("2024-05-01"))
        .await
        .unwrap();
    assert_eq!(report.failed(), 1);
    assert!(stored(&harness, "CCTV1", day("2024-05-01")).await.is_empty());
}

#[tokio::test]
async fn batch_groups_by_provider_and_tolerates_a_failing_group() {
    let a = ScriptedProvider::new("a", 1, &[("a1", "A1")])
        .script("a1", Script::Fail("down"))
        .shared();
    let b = ScriptedProvider::new("b", 2, &[("b1", "B1")])
        .script("b1", Script::Titles(vec!["Film"]))
        .shared();
    let harness = Harness::new(&[a, b], &[("CH1", "One"), ("CH2", "Two")]).await;

    let infos = vec![
        ChannelMappingInfo::new("b", "b1", "CH2"),
        ChannelMappingInfo::new("a", "a1", "CH1"),
    ];
    let report = harness
        .epg
        .sync_epg_batch(&infos, day("2024-05-01"), day("2024-05-01"), false)
        .await
        .unwrap();

    let providers: Vec<Option<&str>> =
        report.dates.iter().map(|d| d.provider_id.as_deref()).collect();
    assert_eq!(providers, vec![Some("a"), Some("b")]);
    assert!(matches!(report.dates[0].outcome, DateSyncOutcome::Failed { .. }));
    assert_eq!(report.dates[1].outcome, DateSyncOutcome::Persisted { programs: 1 });
    assert_eq!(stored(&harness, "CH2", day("2024-05-01")).await.len(), 1);
    assert!(stored(&harness, "CH1", day("2024-05-01")).await.is_empty());
}

#[tokio::test]
async fn batch_skips_stored_dates_unless_forced() {
    let provider = cctv_provider(vec!["News", "Drama"]);
    let harness = Harness::new(&[provider.clone()], &[("CCTV1", "CCTV-1")]).await;
    let infos = vec![ChannelMappingInfo::new("p", "cctv1", "CCTV1")];
    let date = day("2024-05-01");

    harness.epg.sync_epg_batch(&infos, date, date, false).await.unwrap();
    let again = harness.epg.sync_epg_batch(&infos, date, date, false).await.unwrap();
    assert_eq!(again.skipped(), 1);
    assert_eq!(stored(&harness, "CCTV1", date).await.len(), 2);

    let forced = harness.epg.sync_epg_batch(&infos, date, date, true).await.unwrap();
    assert_eq!(forced.persisted_programs(), 2);
    assert_eq!(stored(&harness, "CCTV1", date).await.len(), 2);
    // the refetch is served by the provider cache
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let harness = Harness::new(&[cctv_provider(vec!["News"])], &[]).await;
    let report = harness
        .epg
        .sync_epg_batch(&[], day("2024-05-01"), day("2024-05-01"), true)
        .await
        .unwrap();
    assert!(report.dates.is_empty());
}

#[tokio::test]
async fn cleanup_removes_programs_past_retention() {
    let harness = Harness::new(&[cctv_provider(vec!["News"])], &[]).await;
    let today = today_in(TZ);
    harness
        .program_repo
        .create_batch(vec![
            program("CCTV1", "Old", today - ChronoDuration::days(30), 8, "p"),
            program("CCTV1", "Recent", today - ChronoDuration::days(1), 8, "p"),
        ])
        .await
        .unwrap();

    assert_eq!(harness.epg.cleanup_old_epg(7).await.unwrap(), 1);
    assert!(harness.epg.cleanup_old_epg(-1).await.is_err());
}

#[tokio::test]
async fn current_program_is_the_one_airing_now() {
    let harness = Harness::new(&[cctv_provider(vec!["News"])], &[]).await;
    let now = Utc::now().with_timezone(&TZ);
    harness
        .program_repo
        .create_batch(vec![Program::new(
            "CCTV1",
            "Live",
            now - ChronoDuration::minutes(30),
            now + ChronoDuration::minutes(30),
            "p",
        )])
        .await
        .unwrap();

    let current = harness.epg.get_current_program("CCTV1").await.unwrap();
    assert_eq!(current.title, "Live");
    assert!(harness.epg.get_current_program("CCTV2").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn xmltv_lists_synced_channels_and_programmes() {
    let harness = Harness::new(&[cctv_provider(vec!["News"])], &[("CCTV1", "CCTV-1 综合")]).await;
    harness.map("CCTV1", "p", "cctv1").await;
    let today = today_in(TZ);
    harness.epg.sync_epg("CCTV1", today, today).await.unwrap();

    let document = harness.epg.generate_xmltv().await.unwrap();
    assert_eq!(document.channels.len(), 1);
    assert_eq!(document.channels[0].display_names, vec!["CCTV1", "CCTV-1 综合"]);
    assert_eq!(document.programmes.len(), 1);
    assert!(document.programmes[0].start.ends_with("+0800"));

    let xml = harness.epg.render_xmltv().await.unwrap();
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("<title>News</title>"));
}

#[tokio::test]
async fn diyp_resolves_free_text_names() {
    let harness =
        Harness::new(&[cctv_provider(vec!["News", "Drama"])], &[("CCTV1", "CCTV-1")]).await;
    harness.map("CCTV1", "p", "cctv1").await;
    harness
        .epg
        .sync_epg("CCTV1", day("2024-05-01"), day("2024-05-01"))
        .await
        .unwrap();

    let listing = harness.epg.generate_diyp("cctv-1", "2024-05-01").await.unwrap();
    assert_eq!(listing.channel_name, "CCTV1");
    assert_eq!(listing.date, "2024-05-01");
    let slots: Vec<(&str, &str)> = listing
        .epg_data
        .iter()
        .map(|p| (p.start.as_str(), p.end.as_str()))
        .collect();
    assert_eq!(slots, vec![("08:00", "09:00"), ("09:00", "10:00")]);

    assert!(harness.epg.generate_diyp("", "2024-05-01").await.is_err());
    assert!(harness.epg.generate_diyp("CCTV1", "May 1").await.is_err());
    assert!(harness.epg.generate_diyp("Unknown", "2024-05-01").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn runner_syncs_today_for_auto_mapped_channels() {
    let provider = cctv_provider(vec!["News"]);
    let harness = Harness::new(&[provider.clone()], &[("CCTV1", "CCTV-1")]).await;
    let mapped = harness.mappings.auto_map_chain(&harness.chain).await;
    assert_eq!(mapped.created, 1);

    let runner = harness.runner(7);
    let report = runner.sync_all_epg(false).await.unwrap();
    assert_eq!(report.persisted_programs(), 1);

    let refreshed = runner.sync_all_epg(true).await.unwrap();
    assert_eq!(refreshed.persisted_programs(), 1);
    assert_eq!(stored(&harness, "CCTV1", today_in(TZ)).await.len(), 1);
}
