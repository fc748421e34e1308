use serde::{Deserialize, Serialize};

/// A single rating within a country's certification entry
/// (e.g. "16" with note "original rating"). Note may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationRating {
    pub rating: String,
    pub note: String,
}

/// Certification ratings for one country. Country uniqueness across a
/// record is not guaranteed and not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationItem {
    pub country: String,
    pub ratings: Vec<CertificationRating>,
}

/// One parental guide category. An empty severity means the section was
/// not found on the page, not "none reported".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub severity: String,
    pub items: Vec<String>,
}

/// Complete parental guide for one title. Produced by a single extraction
/// call, immutable afterwards, serialized to one `<id>_guide.json` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideRecord {
    pub id: String,
    pub title: String,
    pub source_url: String,
    pub content_rating: String,
    pub sex_nudity: CategoryInfo,
    pub violence_gore: CategoryInfo,
    pub profanity: CategoryInfo,
    pub alcohol_drugs_smoking: CategoryInfo,
    pub frightening_intense: CategoryInfo,
    pub certifications: Vec<CertificationItem>,
}

/// One successfully processed id in a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub id: String,
    pub status: String,
    pub title: String,
}

/// One failed id in a batch run, with the error description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub id: String,
    pub error: String,
}

/// Checkpoint written every 10 processed ids and deleted on completion.
/// Presence at startup (with start index 0) triggers a resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchState {
    pub last_completed_index: usize,
    pub results: Vec<ItemResult>,
    pub failed: Vec<FailedItem>,
}

/// Final accounting for a batch run; every input id appears either in
/// `success` (count) or in `failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub total: usize,
    pub success: usize,
    pub failed_count: usize,
    pub failed: Vec<FailedItem>,
}
