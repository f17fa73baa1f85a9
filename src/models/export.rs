//! Rendered export documents: XMLTV and the DIYP per-day JSON listing

use serde::{Deserialize, Serialize};

pub const XMLTV_TIME_FORMAT: &str = "%Y%m%d%H%M%S %z";
pub const DIYP_TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "tv")]
pub struct XmltvDocument {
    #[serde(rename = "@generator-info-name")]
    pub generator: String,
    #[serde(rename = "channel", default)]
    pub channels: Vec<XmltvChannel>,
    #[serde(rename = "programme", default)]
    pub programmes: Vec<XmltvProgramme>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmltvChannel {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "display-name", default)]
    pub display_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmltvProgramme {
    #[serde(rename = "@channel")]
    pub channel: String,
    #[serde(rename = "@start")]
    pub start: String,
    #[serde(rename = "@stop")]
    pub stop: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
}

impl XmltvDocument {
    pub fn to_xml(&self) -> Result<String, quick_xml::se::SeError> {
        let body = quick_xml::se::to_string(self)?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiypChannelEpg {
    pub channel_name: String,
    pub date: String,
    pub epg_data: Vec<DiypProgram>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiypProgram {
    pub start: String,
    pub end: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
}
