use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unassigned territory (所属未定地) and the Northern Territories.
const EXCLUDED: &[&str] = &[
    "12000", "13000", "23000", "30000", "40000", "46000", "47000",
    "01695", "01696", "01697", "01698", "01699", "01700",
];

/// Designated-city total rows (政令指定都市), which duplicate the sum of their wards.
const CITY_TOTALS: &[&str] = &[
    "01100", "04100", "11100", "12100", "13100",
    "14100", "14130", "14150", "15100",
    "22100", "22130", "23100", "26100",
    "27100", "27140", "28100",
    "33100", "34100", "40100", "40130", "43100",
];

/// One successor ward: predecessors absorbed whole, and predecessors split by ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessorSpec {
    pub name: String,
    #[serde(default)]
    pub full: Vec<String>,
    #[serde(default)]
    pub partial: BTreeMap<String, f64>,
}

/// A ward reorganization as raw codes, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemapData {
    pub retiring: Vec<String>,
    pub aggregates: Vec<String>,
    pub successors: BTreeMap<String, SuccessorSpec>,
}

/// Input to [`CodeRegistry`](super::CodeRegistry): exclusions, city totals and ward reorganizations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryData {
    pub excluded: Vec<String>,
    pub city_totals: Vec<String>,
    pub ward_remap: RemapData,
}

fn strings(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|s| s.to_string()).collect()
}

impl RegistryData {
    /// The built-in dataset, current as of the 2024 Hamamatsu ward reorganization.
    pub fn embedded() -> Self {
        // Hamamatsu (浜松市) moved from 7 wards to 3 on 2024-01-01. The old 北区
        // (22135) was split; its ratios are estimated from October 2023
        // resident-register populations.
        let successors = BTreeMap::from([
            ("22138".to_string(), SuccessorSpec {
                name: "中央区".to_string(),
                full: strings(&["22131", "22132"]),
                partial: BTreeMap::from([("22135".to_string(), 0.384)]),
            }),
            ("22139".to_string(), SuccessorSpec {
                name: "浜名区".to_string(),
                full: strings(&["22133", "22134", "22136"]),
                partial: BTreeMap::from([("22135".to_string(), 0.616)]),
            }),
            ("22140".to_string(), SuccessorSpec {
                name: "天竜区".to_string(),
                full: strings(&["22137"]),
                partial: BTreeMap::new(),
            }),
        ]);

        Self {
            excluded: strings(EXCLUDED),
            city_totals: strings(CITY_TOTALS),
            ward_remap: RemapData {
                retiring: strings(&["22131", "22132", "22133", "22134", "22135", "22136", "22137"]),
                aggregates: strings(&["22130"]),
                successors,
            },
        }
    }
}
