use serde::{Deserialize, Serialize};
use std::fmt;

/// Educational level held by a candidate or demanded by a vacancy.
///
/// Labels outside the known set are kept verbatim as [`Qualification::Unrecognized`] so they
/// still reach the scoring model as a categorical value; they simply have no rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Qualification {
    TwelfthGrade,
    Iti,
    Diploma,
    Ba,
    BTech,
    Mba,
    Unrecognized(String),
}

impl Qualification {
    pub const fn known() -> [Self; 6] {
        [
            Self::TwelfthGrade,
            Self::Iti,
            Self::Diploma,
            Self::Ba,
            Self::BTech,
            Self::Mba,
        ]
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "12th" => Self::TwelfthGrade,
            "ITI" => Self::Iti,
            "Diploma" => Self::Diploma,
            "BA" => Self::Ba,
            "B.Tech" => Self::BTech,
            "MBA" => Self::Mba,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::TwelfthGrade => "12th",
            Self::Iti => "ITI",
            Self::Diploma => "Diploma",
            Self::Ba => "BA",
            Self::BTech => "B.Tech",
            Self::Mba => "MBA",
            Self::Unrecognized(label) => label,
        }
    }

    /// Position in the qualification order. BA and B.Tech deliberately share rank 4.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::TwelfthGrade => Some(1),
            Self::Iti => Some(2),
            Self::Diploma => Some(3),
            Self::Ba | Self::BTech => Some(4),
            Self::Mba => Some(5),
            Self::Unrecognized(_) => None,
        }
    }
}

impl From<String> for Qualification {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for Qualification {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<Qualification> for String {
    fn from(value: Qualification) -> Self {
        match value {
            Qualification::Unrecognized(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for Qualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Postal index number used as the location identifier for candidates and vacancies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pincode(pub u32);

impl Pincode {
    /// Placeholder for a candidate who gave no location; no directory holds it.
    pub const UNSPECIFIED: Pincode = Pincode(0);
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Catalog key for a vacancy listing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VacancyId(pub u64);

impl fmt::Display for VacancyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Candidate attributes received with a scoring request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub qualification: Qualification,
    pub branch: String,
    pub interest_emoji: String,
    pub pincode: Pincode,
}

/// Supply-side listing owned by the external vacancy catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyListing {
    pub vacancy_id: VacancyId,
    pub title: String,
    pub required_qualification: Qualification,
    /// `any` in any letter case accepts every branch.
    pub required_branch: String,
    pub pincode: Pincode,
    pub stipend: u32,
}

/// Binary acceptance outcome recorded for a historical candidate/vacancy pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Rejected,
    Accepted,
}

impl Label {
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Self::Rejected),
            1 => Some(Self::Accepted),
            _ => None,
        }
    }

    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Rejected => 0.0,
            Self::Accepted => 1.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Rejected => "not accepted",
            Self::Accepted => "accepted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_round_trip_through_parse() {
        for qualification in Qualification::known() {
            assert_eq!(Qualification::parse(qualification.label()), qualification);
        }
    }

    #[test]
    fn ba_and_btech_share_a_rank() {
        assert_eq!(Qualification::Ba.rank(), Qualification::BTech.rank());
        assert_eq!(Qualification::Ba.rank(), Some(4));
    }

    #[test]
    fn ranks_follow_declared_order() {
        let ranks: Vec<u8> = Qualification::known()
            .iter()
            .filter_map(Qualification::rank)
            .collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 4, 5]);
    }

    #[test]
    fn unknown_labels_are_kept_without_rank() {
        let parsed = Qualification::parse("PhD");
        assert_eq!(parsed, Qualification::Unrecognized("PhD".to_string()));
        assert_eq!(parsed.rank(), None);
        assert_eq!(parsed.label(), "PhD");
    }

    #[test]
    fn qualification_labels_are_case_sensitive() {
        assert!(Qualification::parse("b.tech").rank().is_none());
    }

    #[test]
    fn qualification_serializes_as_label() {
        let json = serde_json::to_string(&Qualification::BTech).expect("serializes");
        assert_eq!(json, "\"B.Tech\"");
        let parsed: Qualification = serde_json::from_str("\"12th\"").expect("deserializes");
        assert_eq!(parsed, Qualification::TwelfthGrade);
    }

    #[test]
    fn label_flags_outside_binary_are_rejected() {
        assert_eq!(Label::from_flag(1), Some(Label::Accepted));
        assert_eq!(Label::from_flag(0), Some(Label::Rejected));
        assert_eq!(Label::from_flag(2), None);
    }
}
