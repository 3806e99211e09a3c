use super::ScoringError;
use crate::recommender::features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Turns a [`FeatureVector`] into the dense numeric row the ensemble consumes.
///
/// Column layout: interest-tag TF-IDF terms, one-hot qualification, one-hot branch, then
/// `distance_km` and the three rule flags. Categories unseen during fitting encode as all
/// zeros instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    qualifications: Vec<String>,
    branches: Vec<String>,
}

impl FeatureEncoder {
    pub fn fit(rows: &[FeatureVector]) -> Self {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        let mut qualifications = BTreeSet::new();
        let mut branches = BTreeSet::new();

        for row in rows {
            let terms: BTreeSet<String> = tokenize(&row.interest_emoji).into_iter().collect();
            for term in terms {
                *document_frequency.entry(term).or_default() += 1;
            }
            qualifications.insert(row.qualification.clone());
            branches.insert(row.branch.clone());
        }

        let documents = rows.len() as f64;
        let (vocabulary, idf): (Vec<String>, Vec<f64>) = document_frequency
            .into_iter()
            .map(|(term, df)| {
                let weight = ((1.0 + documents) / (1.0 + df as f64)).ln() + 1.0;
                (term, weight)
            })
            .unzip();

        Self {
            vocabulary,
            idf,
            qualifications: qualifications.into_iter().collect(),
            branches: branches.into_iter().collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.vocabulary.len() + self.qualifications.len() + self.branches.len() + 4
    }

    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        names.extend(self.vocabulary.iter().map(|term| format!("interest_emoji:{term}")));
        names.extend(
            self.qualifications
                .iter()
                .map(|value| format!("qualification={value}")),
        );
        names.extend(self.branches.iter().map(|value| format!("branch={value}")));
        names.extend(
            [
                "distance_km",
                "rule_qualification_met",
                "rule_distance_ok",
                "rule_branch_match",
            ]
            .map(str::to_string),
        );
        names
    }

    pub fn encode(&self, row: &FeatureVector) -> Result<Vec<f64>, ScoringError> {
        if row.distance_km.is_some_and(|distance| !distance.is_finite()) {
            return Err(ScoringError::NonFiniteFeature {
                name: "distance_km",
            });
        }
        for (name, value) in [
            ("rule_qualification_met", row.rule_qualification_met),
            ("rule_distance_ok", row.rule_distance_ok),
            ("rule_branch_match", row.rule_branch_match),
        ] {
            if value > 1 {
                return Err(ScoringError::NonBinaryFlag { name, value });
            }
        }

        let mut encoded = vec![0.0; self.width()];

        for term in tokenize(&row.interest_emoji) {
            if let Ok(index) = self.vocabulary.binary_search(&term) {
                encoded[index] += self.idf[index];
            }
        }

        let qualification_offset = self.vocabulary.len();
        if let Ok(index) = self.qualifications.binary_search(&row.qualification) {
            encoded[qualification_offset + index] = 1.0;
        }

        let branch_offset = qualification_offset + self.qualifications.len();
        if let Ok(index) = self.branches.binary_search(&row.branch) {
            encoded[branch_offset + index] = 1.0;
        }

        let numeric_offset = branch_offset + self.branches.len();
        encoded[numeric_offset..].copy_from_slice(&row.numeric_columns());

        Ok(encoded)
    }
}

/// Lowercased word tokens of at least two characters.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(qualification: &str, branch: &str, interest: &str) -> FeatureVector {
        FeatureVector {
            qualification: qualification.to_string(),
            branch: branch.to_string(),
            interest_emoji: interest.to_string(),
            distance_km: Some(30.0),
            rule_qualification_met: 1,
            rule_distance_ok: 1,
            rule_branch_match: 0,
        }
    }

    fn fitted() -> FeatureEncoder {
        FeatureEncoder::fit(&[
            row("BA", "Arts", "books"),
            row("B.Tech", "CS", "computer"),
            row("MBA", "Comm", "finance books"),
        ])
    }

    #[test]
    fn tokenize_lowercases_and_drops_single_characters() {
        assert_eq!(
            tokenize("Computer a  DESIGN-tools"),
            vec!["computer", "design", "tools"]
        );
        assert!(tokenize("💻").is_empty());
    }

    #[test]
    fn layout_matches_column_names() {
        let encoder = fitted();
        let names = encoder.column_names();
        assert_eq!(names.len(), encoder.width());
        assert_eq!(names[0], "interest_emoji:books");
        assert!(names.contains(&"qualification=B.Tech".to_string()));
        assert!(names.contains(&"branch=CS".to_string()));
        assert_eq!(names[names.len() - 4], "distance_km");
    }

    #[test]
    fn idf_weights_rare_terms_higher() {
        let encoder = fitted();
        let books = encoder.encode(&row("BA", "Arts", "books")).expect("encodes")[0];
        let computer_index = encoder
            .column_names()
            .iter()
            .position(|name| name == "interest_emoji:computer")
            .expect("term present");
        let computer =
            encoder.encode(&row("BA", "Arts", "computer")).expect("encodes")[computer_index];

        assert!((books - ((4.0f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
        assert!((computer - ((4.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
        assert!(computer > books);
    }

    #[test]
    fn unseen_categories_encode_as_zeros() {
        let encoder = fitted();
        let encoded = encoder
            .encode(&row("PhD", "Aero", "gardening"))
            .expect("unknown values tolerated");
        let categorical = &encoded[..encoded.len() - 4];
        assert!(categorical.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn numeric_tail_passes_through() {
        let encoder = fitted();
        let encoded = encoder.encode(&row("BA", "Arts", "books")).expect("encodes");
        assert_eq!(&encoded[encoded.len() - 4..], &[30.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn missing_distance_encodes_as_nan() {
        let encoder = fitted();
        let mut features = row("BA", "Arts", "books");
        features.distance_km = None;
        let encoded = encoder.encode(&features).expect("encodes");
        assert!(encoded[encoded.len() - 4].is_nan());
    }

    #[test]
    fn infinite_distance_is_rejected() {
        let encoder = fitted();
        let mut features = row("BA", "Arts", "books");
        features.distance_km = Some(f64::INFINITY);
        assert_eq!(
            encoder.encode(&features),
            Err(ScoringError::NonFiniteFeature {
                name: "distance_km"
            })
        );
    }

    #[test]
    fn non_binary_flag_is_rejected() {
        let encoder = fitted();
        let mut features = row("BA", "Arts", "books");
        features.rule_branch_match = 3;
        assert!(matches!(
            encoder.encode(&features),
            Err(ScoringError::NonBinaryFlag {
                name: "rule_branch_match",
                value: 3
            })
        ));
    }
}
