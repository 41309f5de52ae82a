use std::fs;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{TerrainError, TerrainResult};

/// 文档类型（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Letter,
    Journal,
    Photograph,
    Ticket,
    Certificate,
    Recording,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 6] = [
        DocumentKind::Letter,
        DocumentKind::Journal,
        DocumentKind::Photograph,
        DocumentKind::Ticket,
        DocumentKind::Certificate,
        DocumentKind::Recording,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Letter => "letter",
            DocumentKind::Journal => "journal",
            DocumentKind::Photograph => "photograph",
            DocumentKind::Ticket => "ticket",
            DocumentKind::Certificate => "certificate",
            DocumentKind::Recording => "recording",
        }
    }
}

/// 记忆所用的语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageTag {
    First,
    Second,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl Period {
    /// 时间段中点（小数年），没有结束日期时取开始日期
    pub fn midpoint_year(&self) -> f64 {
        let start = fractional_year(self.start);
        let end = self.end.map(fractional_year).unwrap_or(start);
        (start + end) * 0.5
    }
}

pub fn fractional_year(date: NaiveDate) -> f64 {
    let days_in_year = if date.leap_year() { 366.0 } else { 365.0 };
    date.year() as f64 + date.ordinal0() as f64 / days_in_year
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEvent {
    pub kind: DocumentKind,
    #[serde(default)]
    pub content: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageTag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// [0,1]
    pub intensity: f64,
    /// [-1,1]
    pub valence: f64,
    /// [-1,1]，-1 为第一语言，+1 为第二语言
    pub language_balance: f64,
    /// [0,1]
    pub significance: f64,
    /// 年
    pub duration: f64,
    #[serde(default)]
    pub is_visit: bool,
    pub color: String,
    #[serde(default)]
    pub events: Vec<MemoryEvent>,
}

impl Location {
    /// 代表年份：时间段中点，否则 year，否则 None
    pub fn representative_year(&self) -> Option<f64> {
        self.period
            .as_ref()
            .map(Period::midpoint_year)
            .or(self.year.map(|y| y as f64))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// 完整的手写数据集，一次性载入内存后只读
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JourneyData {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl JourneyData {
    pub fn from_json_str(json: &str) -> TerrainResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_ron_str(text: &str) -> TerrainResult<Self> {
        Ok(ron::from_str(text)?)
    }

    /// 按扩展名载入 `.json` 或 `.ron`
    pub fn load<P: AsRef<Path>>(path: P) -> TerrainResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let data = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            Some("ron") => Self::from_ron_str(&content)?,
            other => {
                return Err(TerrainError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };
        info!(
            "Loaded journey data from {:?}: {} locations, {} events, {} connections",
            path,
            data.locations.len(),
            data.event_count(),
            data.connections.len()
        );
        Ok(data)
    }

    pub fn event_count(&self) -> usize {
        self.locations.iter().map(|l| l.events.len()).sum()
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }
}
