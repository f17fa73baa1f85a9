//! Shanxi provincial channels: one JSONP document per channel covering a
//! rolling window of days, local `YYYY-MM-DD HH:MM:SS` times

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::errors::{ProviderError, ProviderResult};
use crate::models::{Program, ProviderChannel, ProviderConfig};
use crate::providers::base::ProviderBase;
use crate::providers::batch::fetch_day_from_window;
use crate::providers::time_range::{LOCAL_DATETIME_LAYOUT, process_time_range};
use crate::providers::traits::{FetchMode, ProgramsByDate, Provider};
use crate::utils::parse_date;

pub const PROVIDER_TYPE: &str = "sxrtv";

#[derive(Debug, Deserialize)]
struct ScheduleEntry {
    name: String,
    start_time: String,
    end_time: String,
}

pub struct SxrtvProvider {
    base: ProviderBase,
}

impl SxrtvProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let channels = [
            ("SXTV1", "山西卫视"),
            ("SXTV2", "黄河电视台"),
            ("SXTV3", "山西经济与科技"),
            ("SXTV4", "山西影视"),
            ("SXTV5", "山西社会与法制"),
            ("SXTV6", "山西文体生活"),
        ]
        .into_iter()
        .map(|(id, name)| ProviderChannel::new(id, name))
        .collect();

        Ok(Self {
            base: ProviderBase::new(config, channels)?,
        })
    }

    pub fn create(config: ProviderConfig) -> ProviderResult<Arc<dyn Provider>> {
        Ok(Arc::new(Self::new(config)?))
    }

    /// Group entries by the date prefix of their start time
    fn parse_response(&self, body: &[u8], canonical_id: &str) -> ProviderResult<ProgramsByDate> {
        let text = String::from_utf8_lossy(body);
        let json = strip_jsonp(&text)
            .ok_or_else(|| ProviderError::parse_failed(self.id(), "no JSON array in response"))?;
        let entries: Vec<ScheduleEntry> = serde_json::from_str(json)
            .map_err(|e| ProviderError::parse_failed(self.id(), e.to_string()))?;

        let tz = self.base.timezone();
        let mut by_date = ProgramsByDate::new();
        for entry in entries {
            let Some(label) = entry.start_time.get(..10) else {
                warn!("Skipping '{}' with short start time '{}'", entry.name, entry.start_time);
                continue;
            };
            let Ok(date) = parse_date(label) else {
                warn!("Skipping '{}' with unparseable date '{}'", entry.name, label);
                continue;
            };
            match process_time_range(
                &entry.start_time,
                &entry.end_time,
                date,
                LOCAL_DATETIME_LAYOUT,
                tz,
            ) {
                Ok((start, end)) => by_date
                    .entry(label.to_string())
                    .or_default()
                    .push(Program::new(canonical_id, &entry.name, start, end, self.id())),
                Err(e) => warn!(
                    "Skipping '{}' on {} for {}: {}",
                    entry.name, label, canonical_id, e
                ),
            }
        }
        Ok(by_date)
    }
}

/// The array between the callback wrapper, e.g. `cb([...]);`
fn strip_jsonp(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

#[async_trait]
impl Provider for SxrtvProvider {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    fn fetch_mode(&self) -> FetchMode {
        FetchMode::MultiDay
    }

    async fn fetch_epg(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        date: NaiveDate,
    ) -> ProviderResult<Vec<Program>> {
        fetch_day_from_window(self, provider_channel_id, canonical_id, date).await
    }

    /// The upstream always serves its full window; `start`/`end` only bound what callers use
    async fn fetch_epg_multi_day(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> ProviderResult<ProgramsByDate> {
        let path = format!("/epg/{provider_channel_id}.json");
        let body = self
            .base
            .http()
            .get_with_headers(&path, &[], &[("User-Agent", self.base.user_agent())])
            .await?;
        self.parse_response(&body, canonical_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SxrtvProvider {
        SxrtvProvider::new(ProviderConfig::new("sxrtv", "SXRTV", "https://epg.example")).unwrap()
    }

    #[test]
    fn groups_by_start_date_and_clamps() {
        let body = r#"jQuery_callback_1234567([
            {"name":"早间新闻","start_time":"2024-05-01 07:00:00","end_time":"2024-05-01 07:30:00"},
            {"name":"午夜剧场","start_time":"2024-05-01 23:30:00","end_time":"2024-05-02 01:00:00"},
            {"name":"凌晨节目","start_time":"2024-05-02 01:00:00","end_time":"2024-05-02 02:00:00"}
        ]);"#;
        let by_date = provider().parse_response(body.as_bytes(), "SXWS").unwrap();
        assert_eq!(by_date.len(), 2);
        assert_eq!(by_date["2024-05-01"].len(), 2);
        assert_eq!(by_date["2024-05-02"].len(), 1);

        let late = &by_date["2024-05-01"][1];
        let end = late.end_time.with_timezone(&chrono_tz::Asia::Shanghai);
        assert_eq!(end.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 23:59:59");
        assert_eq!(late.channel_id, "SXWS");
    }

    #[test]
    fn bad_entries_are_skipped_and_garbage_is_an_error() {
        let body = br#"cb([{"name":"x","start_time":"soon","end_time":"later"}]);"#;
        assert!(provider().parse_response(body, "SXWS").unwrap().is_empty());
        assert!(provider().parse_response(b"Not Found", "SXWS").is_err());
    }

    #[test]
    fn reports_multi_day_mode() {
        assert_eq!(provider().fetch_mode(), FetchMode::MultiDay);
        assert_eq!(strip_jsonp("a([1]);"), Some("[1]"));
    }
}
