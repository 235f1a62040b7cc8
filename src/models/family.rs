//! Per-user household settings

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FamilySize {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6+")]
    SixOrMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeType {
    Apartment,
    House,
    Villa,
}

/// Boolean kept as the `"yes"` / `"no"` strings the settings form submits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

impl From<YesNo> for bool {
    fn from(value: YesNo) -> Self {
        value == YesNo::Yes
    }
}

/// Konya district
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Merkez,
    Selcuklu,
    Meram,
    Karatay,
    Other,
}

/// Household settings, one document per user, replaced wholesale on update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilySettings {
    pub family_name: String,
    pub family_size: FamilySize,
    pub home_type: HomeType,
    pub has_pets: YesNo,
    pub has_garden: YesNo,
    pub has_car: YesNo,
    pub region: Region,
}

impl Default for FamilySettings {
    fn default() -> Self {
        Self {
            family_name: String::new(),
            family_size: FamilySize::Four,
            home_type: HomeType::Apartment,
            has_pets: YesNo::No,
            has_garden: YesNo::No,
            has_car: YesNo::Yes,
            region: Region::Merkez,
        }
    }
}
