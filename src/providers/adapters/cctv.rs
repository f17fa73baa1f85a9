//! CCTV national channels: one request per channel and day, Unix timestamps

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::errors::{ProviderError, ProviderResult};
use crate::models::{Program, ProviderChannel, ProviderConfig};
use crate::providers::base::ProviderBase;
use crate::providers::time_range::process_time_range_from_timestamps;
use crate::providers::traits::Provider;

pub const PROVIDER_TYPE: &str = "cctv";

const EPG_PATH: &str = "/epg/getEpgInfoByChannelNew";
const REFERER: &str = "https://tv.cctv.com/";

#[derive(Debug, Deserialize)]
struct EpgResponse {
    #[serde(default)]
    errcode: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: HashMap<String, ChannelSchedule>,
}

#[derive(Debug, Deserialize)]
struct ChannelSchedule {
    #[serde(default)]
    list: Vec<ScheduleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleEntry {
    title: String,
    start_time: i64,
    end_time: i64,
}

pub struct CctvProvider {
    base: ProviderBase,
}

impl CctvProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        Ok(Self {
            base: ProviderBase::new(config, channel_list())?,
        })
    }

    pub fn create(config: ProviderConfig) -> ProviderResult<Arc<dyn Provider>> {
        Ok(Arc::new(Self::new(config)?))
    }

    fn parse_response(
        &self,
        body: &[u8],
        provider_channel_id: &str,
        canonical_id: &str,
        date: NaiveDate,
    ) -> ProviderResult<Vec<Program>> {
        let resp: EpgResponse = serde_json::from_slice(body)
            .map_err(|e| ProviderError::parse_failed(self.id(), e.to_string()))?;

        if !resp.errcode.is_empty() {
            return Err(ProviderError::Api {
                provider_id: self.id().to_string(),
                status: resp.errcode,
                message: resp.msg,
            });
        }

        let tz = self.base.timezone();
        let entries = resp
            .data
            .get(provider_channel_id)
            .map(|schedule| schedule.list.as_slice())
            .unwrap_or_default();

        let mut programs = Vec::with_capacity(entries.len());
        for entry in entries {
            match process_time_range_from_timestamps(entry.start_time, entry.end_time, date, tz) {
                Ok((start, end)) => {
                    programs.push(Program::new(canonical_id, &entry.title, start, end, self.id()));
                }
                Err(e) => warn!(
                    "Skipping '{}' on {} for {}: {}",
                    entry.title, date, canonical_id, e
                ),
            }
        }
        Ok(programs)
    }
}

#[async_trait]
impl Provider for CctvProvider {
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    async fn fetch_epg(
        &self,
        provider_channel_id: &str,
        canonical_id: &str,
        date: NaiveDate,
    ) -> ProviderResult<Vec<Program>> {
        let day = date.format("%Y%m%d").to_string();
        let params = [
            ("c", provider_channel_id),
            ("serviceId", "tvcctv"),
            ("d", day.as_str()),
        ];
        let headers = [("User-Agent", self.base.user_agent()), ("Referer", REFERER)];
        let body = self
            .base
            .http()
            .get_with_headers(EPG_PATH, &params, &headers)
            .await?;
        self.parse_response(&body, provider_channel_id, canonical_id, date)
    }
}

const CHANNELS: &[(&str, &str, &[&str])] = &[
    ("cctv1", "CCTV-1综合", &["CCTV1", "CCTV-1"]),
    ("cctv2", "CCTV-2财经", &["CCTV2", "CCTV-2"]),
    ("cctv3", "CCTV-3综艺", &["CCTV3", "CCTV-3"]),
    ("cctv4", "CCTV-4中文国际", &["CCTV4亚洲", "CCTV-4中文国际(亚)"]),
    ("cctv5", "CCTV-5体育", &["CCTV5", "CCTV-5"]),
    ("cctv5plus", "CCTV-5体育赛事", &["CCTV5+", "CCTV-5+", "CCTV5plus"]),
    ("cctv6", "CCTV-6电影", &["CCTV6", "CCTV-6"]),
    ("cctv7", "CCTV-7国防军事", &["CCTV7", "CCTV-7"]),
    ("cctv8", "CCTV-8电视剧", &["CCTV8", "CCTV-8"]),
    ("cctvjilu", "CCTV-9纪录", &["CCTV9", "CCTV-9"]),
    ("cctv10", "CCTV-10科教", &["CCTV10", "CCTV-10"]),
    ("cctv11", "CCTV-11戏曲", &["CCTV11", "CCTV-11"]),
    ("cctv12", "CCTV-12社会与法", &["CCTV12", "CCTV-12"]),
    ("cctv13", "CCTV-13新闻", &["CCTV13", "CCTV-13"]),
    ("cctvchild", "CCTV-14少儿", &["CCTV14", "CCTV-14"]),
    ("cctv15", "CCTV-15音乐", &["CCTV15", "CCTV-15"]),
    ("cctv16", "CCTV-16奥林匹克", &["CCTV16", "CCTV-16"]),
    ("cctv17", "CCTV-17农业农村", &["CCTV17", "CCTV-17"]),
];

fn channel_list() -> Vec<ProviderChannel> {
    CHANNELS
        .iter()
        .map(|(id, name, aliases)| {
            ProviderChannel::new(*id, *name).with_aliases(aliases.iter().copied())
        })
        .collect()
}
