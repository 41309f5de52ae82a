use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::model::{DocumentKind, LanguageTag};

/// 单个文档类型对地形系数的修正
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindModifier {
    pub amplitude: f64,
    pub roughness: f64,
    pub ridge: f64,
    /// 乘以事件情感后加到高程偏置上
    pub sentiment_bias: f64,
}

impl KindModifier {
    pub const fn new(amplitude: f64, roughness: f64, ridge: f64, sentiment_bias: f64) -> Self {
        Self { amplitude, roughness, ridge, sentiment_bias }
    }
}

/// 文档类型修正表，每种类型一项；新增类型必须在 `get` 中补全
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierTable {
    pub letter: KindModifier,
    pub journal: KindModifier,
    pub photograph: KindModifier,
    pub ticket: KindModifier,
    pub certificate: KindModifier,
    pub recording: KindModifier,
}

impl Default for ModifierTable {
    fn default() -> Self {
        Self {
            letter: KindModifier::new(0.85, 1.1, 0.8, 2.5),
            journal: KindModifier::new(1.0, 1.3, 0.9, 3.0),
            photograph: KindModifier::new(1.2, 0.8, 0.6, 2.0),
            ticket: KindModifier::new(0.7, 1.4, 1.3, 1.0),
            certificate: KindModifier::new(1.35, 0.6, 1.5, 1.5),
            recording: KindModifier::new(0.9, 1.2, 0.7, 3.5),
        }
    }
}

impl ModifierTable {
    pub fn get(&self, kind: DocumentKind) -> &KindModifier {
        match kind {
            DocumentKind::Letter => &self.letter,
            DocumentKind::Journal => &self.journal,
            DocumentKind::Photograph => &self.photograph,
            DocumentKind::Ticket => &self.ticket,
            DocumentKind::Certificate => &self.certificate,
            DocumentKind::Recording => &self.recording,
        }
    }

    pub fn get_mut(&mut self, kind: DocumentKind) -> &mut KindModifier {
        match kind {
            DocumentKind::Letter => &mut self.letter,
            DocumentKind::Journal => &mut self.journal,
            DocumentKind::Photograph => &mut self.photograph,
            DocumentKind::Ticket => &mut self.ticket,
            DocumentKind::Certificate => &mut self.certificate,
            DocumentKind::Recording => &mut self.recording,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LanguageTint {
    pub color: Rgb,
    /// [0,1]
    pub strength: f64,
}

/// 按语言标签给事件着色
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TintTable {
    pub first: LanguageTint,
    pub second: LanguageTint,
    pub mixed: LanguageTint,
}

impl Default for TintTable {
    fn default() -> Self {
        Self {
            first: LanguageTint { color: Rgb::new(0.98, 0.72, 0.45), strength: 0.35 },
            second: LanguageTint { color: Rgb::new(0.45, 0.7, 0.98), strength: 0.35 },
            mixed: LanguageTint { color: Rgb::new(0.8, 0.6, 0.9), strength: 0.25 },
        }
    }
}

impl TintTable {
    pub fn get(&self, tag: LanguageTag) -> &LanguageTint {
        match tag {
            LanguageTag::First => &self.first,
            LanguageTag::Second => &self.second,
            LanguageTag::Mixed => &self.mixed,
        }
    }

    pub fn apply(&self, base: Rgb, tag: Option<LanguageTag>) -> Rgb {
        match tag {
            Some(tag) => {
                let tint = self.get(tag);
                base.lerp(tint.color, tint.strength)
            }
            None => base,
        }
    }
}
