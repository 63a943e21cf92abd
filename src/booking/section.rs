use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ценовая категория зала. Набор фиксированный, порядок - от дорогой к дешёвой.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionId {
    Parterre,
    Mezzanine,
    FirstTier,
    SecondTier,
    ThirdTier,
}

impl SectionId {
    pub const ALL: [SectionId; 5] = [
        SectionId::Parterre,
        SectionId::Mezzanine,
        SectionId::FirstTier,
        SectionId::SecondTier,
        SectionId::ThirdTier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Parterre => "parterre",
            SectionId::Mezzanine => "mezzanine",
            SectionId::FirstTier => "firstTier",
            SectionId::SecondTier => "secondTier",
            SectionId::ThirdTier => "thirdTier",
        }
    }

    pub fn name_en(&self) -> &'static str {
        match self {
            SectionId::Parterre => "Parterre",
            SectionId::Mezzanine => "Mezzanine",
            SectionId::FirstTier => "1st Tier",
            SectionId::SecondTier => "2nd Tier",
            SectionId::ThirdTier => "3rd Tier",
        }
    }

    pub fn name_ua(&self) -> &'static str {
        match self {
            SectionId::Parterre => "Партер",
            SectionId::Mezzanine => "Бельєтаж",
            SectionId::FirstTier => "1-й ярус",
            SectionId::SecondTier => "2-й ярус",
            SectionId::ThirdTier => "3-й ярус",
        }
    }

    /// Цена по умолчанию, если в хранилище цена не задана.
    pub fn default_price(&self) -> f64 {
        match self {
            SectionId::Parterre => 1000.0,
            SectionId::Mezzanine => 800.0,
            SectionId::FirstTier => 600.0,
            SectionId::SecondTier => 400.0,
            SectionId::ThirdTier => 200.0,
        }
    }

    /// (ряды, мест в ряду)
    pub fn dimensions(&self) -> (u8, u32) {
        match self {
            SectionId::Parterre => (10, 20),
            _ => (5, 15),
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section: {0}")]
pub struct UnknownSection(pub String);

impl FromStr for SectionId {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownSection(s.to_string()))
    }
}
