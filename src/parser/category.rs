use serde::{Deserialize, Serialize};

/// Cause list category, named after the listing's PDF filename convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "JUDGE MISCELLANEOUS ADVANCE")]
    JudgeMiscAdvance,
    #[serde(rename = "JUDGE MISCELLANEOUS MAIN")]
    JudgeMiscMain,
    #[serde(rename = "JUDGE MISCELLANEOUS SUPPL")]
    JudgeMiscSuppl,
    #[serde(rename = "JUDGE REGULAR MAIN")]
    JudgeRegularMain,
    #[serde(rename = "JUDGE REGULAR SUPPL")]
    JudgeRegularSuppl,
    #[serde(rename = "CHAMBER MAIN")]
    ChamberMain,
    #[serde(rename = "CHAMBER SUPPL")]
    ChamberSuppl,
    #[serde(rename = "SINGLE JUDGE MAIN")]
    SingleJudgeMain,
    #[serde(rename = "SINGLE JUDGE SUPPL")]
    SingleJudgeSuppl,
    #[serde(rename = "REVIEW & CURATIVE MAIN")]
    ReviewCurativeMain,
    #[serde(rename = "REVIEW & CURATIVE SUPPL")]
    ReviewCurativeSuppl,
    #[serde(rename = "REGISTRAR MAIN")]
    RegistrarMain,
    #[serde(rename = "REGISTRAR SUPPL")]
    RegistrarSuppl,
}

/// Lowercase filename fragment -> category. First match wins.
pub const CATEGORY_TABLE: &[(&str, Category)] = &[
    ("advance", Category::JudgeMiscAdvance),
    ("m_j_1", Category::JudgeMiscMain),
    ("m_j_2", Category::JudgeMiscSuppl),
    ("f_j_1", Category::JudgeRegularMain),
    ("f_j_2", Category::JudgeRegularSuppl),
    ("m_c_1", Category::ChamberMain),
    ("m_c_2", Category::ChamberSuppl),
    ("m_s_1", Category::SingleJudgeMain),
    ("m_s_2", Category::SingleJudgeSuppl),
    ("m_cc_1", Category::ReviewCurativeMain),
    ("m_cc_2", Category::ReviewCurativeSuppl),
    ("m_r_1", Category::RegistrarMain),
    ("m_r_2", Category::RegistrarSuppl),
];

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::JudgeMiscAdvance => "JUDGE MISCELLANEOUS ADVANCE",
            Category::JudgeMiscMain => "JUDGE MISCELLANEOUS MAIN",
            Category::JudgeMiscSuppl => "JUDGE MISCELLANEOUS SUPPL",
            Category::JudgeRegularMain => "JUDGE REGULAR MAIN",
            Category::JudgeRegularSuppl => "JUDGE REGULAR SUPPL",
            Category::ChamberMain => "CHAMBER MAIN",
            Category::ChamberSuppl => "CHAMBER SUPPL",
            Category::SingleJudgeMain => "SINGLE JUDGE MAIN",
            Category::SingleJudgeSuppl => "SINGLE JUDGE SUPPL",
            Category::ReviewCurativeMain => "REVIEW & CURATIVE MAIN",
            Category::ReviewCurativeSuppl => "REVIEW & CURATIVE SUPPL",
            Category::RegistrarMain => "REGISTRAR MAIN",
            Category::RegistrarSuppl => "REGISTRAR SUPPL",
        }
    }
}

pub fn classify(link: &str) -> Option<Category> {
    let lower = link.to_lowercase();
    CATEGORY_TABLE
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, category)| *category)
}

/// Label for an optional category, empty when no pattern matched.
pub fn label_or_empty(category: Option<Category>) -> &'static str {
    category.map(Category::label).unwrap_or("")
}
