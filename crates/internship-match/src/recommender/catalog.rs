//! CSV sources: the vacancy catalog snapshot, the pincode table and historical training rows.

use super::domain::{
    CandidateProfile, GeoPoint, Label, Pincode, Qualification, VacancyId, VacancyListing,
};
use super::geo::PincodeDirectory;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to access CSV source: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

#[derive(Debug, Serialize, Deserialize)]
struct VacancyRow {
    vacancy_id: u64,
    vacancy_title: String,
    required_qualification: String,
    required_branch: String,
    pincode: u32,
    stipend: u32,
}

impl From<VacancyRow> for VacancyListing {
    fn from(row: VacancyRow) -> Self {
        Self {
            vacancy_id: VacancyId(row.vacancy_id),
            title: row.vacancy_title,
            required_qualification: Qualification::parse(&row.required_qualification),
            required_branch: row.required_branch,
            pincode: Pincode(row.pincode),
            stipend: row.stipend,
        }
    }
}

impl From<&VacancyListing> for VacancyRow {
    fn from(listing: &VacancyListing) -> Self {
        Self {
            vacancy_id: listing.vacancy_id.0,
            vacancy_title: listing.title.clone(),
            required_qualification: listing.required_qualification.label().to_string(),
            required_branch: listing.required_branch.clone(),
            pincode: listing.pincode.0,
            stipend: listing.stipend,
        }
    }
}

/// Reads a vacancy catalog with columns
/// `vacancy_id, vacancy_title, required_qualification, required_branch, pincode, stipend`.
pub fn read_vacancies<R: Read>(reader: R) -> Result<Vec<VacancyListing>, CatalogError> {
    let mut vacancies = Vec::new();
    for row in csv_reader(reader).deserialize::<VacancyRow>() {
        vacancies.push(row?.into());
    }
    Ok(vacancies)
}

pub fn load_vacancies<P: AsRef<Path>>(path: P) -> Result<Vec<VacancyListing>, CatalogError> {
    let file = File::open(path.as_ref())?;
    let vacancies = read_vacancies(file)?;
    info!(
        path = %path.as_ref().display(),
        vacancies = vacancies.len(),
        "loaded vacancy catalog"
    );
    Ok(vacancies)
}

pub fn write_vacancies<W: Write>(
    writer: W,
    vacancies: &[VacancyListing],
) -> Result<(), CatalogError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for listing in vacancies {
        csv_writer.serialize(VacancyRow::from(listing))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn save_vacancies<P: AsRef<Path>>(
    path: P,
    vacancies: &[VacancyListing],
) -> Result<(), CatalogError> {
    let file = File::create(path.as_ref())?;
    write_vacancies(file, vacancies)
}

#[derive(Debug, Deserialize)]
struct PincodeRow {
    pincode: u32,
    latitude: f64,
    longitude: f64,
}

/// Reads a `pincode, latitude, longitude` table. Duplicate pincodes keep the last row.
pub fn read_pincodes<R: Read>(reader: R) -> Result<PincodeDirectory, CatalogError> {
    let mut directory = PincodeDirectory::new();
    for row in csv_reader(reader).deserialize::<PincodeRow>() {
        let row = row?;
        directory.insert(
            Pincode(row.pincode),
            GeoPoint {
                latitude: row.latitude,
                longitude: row.longitude,
            },
        );
    }
    Ok(directory)
}

pub fn load_pincodes<P: AsRef<Path>>(path: P) -> Result<PincodeDirectory, CatalogError> {
    let file = File::open(path.as_ref())?;
    let directory = read_pincodes(file)?;
    info!(
        path = %path.as_ref().display(),
        pincodes = directory.len(),
        "loaded pincode directory"
    );
    Ok(directory)
}

/// One historical candidate/vacancy interaction. Every field is optional because the export
/// may contain blanks or unparsable cells; incomplete rows are filtered by their consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingRecord {
    pub candidate_id: Option<String>,
    pub candidate_name: Option<String>,
    pub qualification: Option<Qualification>,
    pub branch: Option<String>,
    pub district_pin: Option<Pincode>,
    pub interest_emoji: Option<String>,
    pub vacancy_id: Option<VacancyId>,
    pub vacancy_title: Option<String>,
    pub min_qualification: Option<Qualification>,
    pub branch_wanted: Option<String>,
    pub district_pin_vac: Option<Pincode>,
    pub stipend: Option<u32>,
    pub accepted: Option<Label>,
}

impl TrainingRecord {
    pub fn candidate(&self) -> Option<CandidateProfile> {
        Some(CandidateProfile {
            qualification: self.qualification.clone()?,
            branch: self.branch.clone()?,
            interest_emoji: self.interest_emoji.clone()?,
            pincode: self.district_pin?,
        })
    }

    /// The full listing, as needed for a catalog entry.
    pub fn vacancy(&self) -> Option<VacancyListing> {
        Some(VacancyListing {
            vacancy_id: self.vacancy_id?,
            title: self.vacancy_title.clone()?,
            required_qualification: self.min_qualification.clone()?,
            required_branch: self.branch_wanted.clone()?,
            pincode: self.district_pin_vac?,
            stipend: self.stipend?,
        })
    }

    /// Candidate, vacancy and outcome when every feature input is present. Id, title and
    /// stipend never reach the feature vector, so blanks there do not disqualify the row.
    pub fn labelled_pair(&self) -> Option<(CandidateProfile, VacancyListing, Label)> {
        let candidate = self.candidate()?;
        let vacancy = VacancyListing {
            vacancy_id: self.vacancy_id.unwrap_or_default(),
            title: self.vacancy_title.clone().unwrap_or_default(),
            required_qualification: self.min_qualification.clone()?,
            required_branch: self.branch_wanted.clone()?,
            pincode: self.district_pin_vac?,
            stipend: self.stipend.unwrap_or_default(),
        };
        Some((candidate, vacancy, self.accepted?))
    }
}

#[derive(Debug, Deserialize)]
struct TrainingRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    candidate_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    candidate_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    qualification: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    branch: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    district_pin: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    interest_emoji: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    vacancy_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    vacancy_title: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    min_qualification: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    branch_wanted: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    district_pin_vac: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    stipend: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    accepted: Option<String>,
}

impl From<TrainingRow> for TrainingRecord {
    fn from(row: TrainingRow) -> Self {
        Self {
            candidate_id: row.candidate_id,
            candidate_name: row.candidate_name,
            qualification: row.qualification.as_deref().map(Qualification::parse),
            branch: row.branch,
            district_pin: parse_number(row.district_pin.as_deref()).map(Pincode),
            interest_emoji: row.interest_emoji,
            vacancy_id: parse_number(row.vacancy_id.as_deref()).map(VacancyId),
            vacancy_title: row.vacancy_title,
            min_qualification: row.min_qualification.as_deref().map(Qualification::parse),
            branch_wanted: row.branch_wanted,
            district_pin_vac: parse_number(row.district_pin_vac.as_deref()).map(Pincode),
            stipend: parse_number(row.stipend.as_deref()),
            accepted: parse_number(row.accepted.as_deref()).and_then(Label::from_flag),
        }
    }
}

pub fn read_training_records<R: Read>(reader: R) -> Result<Vec<TrainingRecord>, CatalogError> {
    let mut records = Vec::new();
    for row in csv_reader(reader).deserialize::<TrainingRow>() {
        records.push(row?.into());
    }
    Ok(records)
}

pub fn load_training_records<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<TrainingRecord>, CatalogError> {
    let file = File::open(path.as_ref())?;
    let records = read_training_records(file)?;
    info!(
        path = %path.as_ref().display(),
        records = records.len(),
        "loaded training records"
    );
    Ok(records)
}

/// Unique vacancies referenced by the training rows; the first complete row per id wins.
pub fn derive_catalog(records: &[TrainingRecord]) -> Vec<VacancyListing> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(TrainingRecord::vacancy)
        .filter(|listing| seen.insert(listing.vacancy_id))
        .collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Integer cells, tolerating the `110001.0` form spreadsheet exports produce.
fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    let value = value?.trim();
    value
        .parse()
        .ok()
        .or_else(|| value.strip_suffix(".0").and_then(|whole| whole.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommender::geo::DistanceResolver;
    use std::io::Cursor;

    const TRAINING_CSV: &str = "\
candidate_id,candidate_name,qualification,branch,district_pin,interest_emoji,vacancy_id,vacancy_title,min_qualification,branch_wanted,district_pin_vac,stipend,accepted
C1,Asha,B.Tech,CS,110001,computer,101,Data Analyst,BA,any,110001,9000,1
C2,Ravi,ITI,Mech,400001,tools,102,Fitter,ITI,Mech,400001,6000,0
C3,Meena,BA,Arts,110001,books,101,Data Analyst (dup),BA,any,110001,9500,0
C4,,Diploma,,400001,tools,103,Welder,ITI,Mech,400001,,1
C5,Kiran,MBA,Comm,110001.0,finance,104,Analyst,MBA,Comm,110001,12000,yes
";

    #[test]
    fn reads_vacancy_catalog() {
        let data = "\
vacancy_id,vacancy_title,required_qualification,required_branch,pincode,stipend
101, Data Analyst ,BA,any,110001,9000
102,Fitter,ITI,Mech,400001,6000
";
        let vacancies = read_vacancies(Cursor::new(data)).expect("catalog parses");

        assert_eq!(vacancies.len(), 2);
        assert_eq!(vacancies[0].vacancy_id, VacancyId(101));
        assert_eq!(vacancies[0].title, "Data Analyst");
        assert_eq!(vacancies[0].required_qualification, Qualification::Ba);
        assert_eq!(vacancies[1].pincode, Pincode(400001));
        assert_eq!(vacancies[1].stipend, 6000);
    }

    #[test]
    fn malformed_vacancy_row_is_an_error() {
        let data = "\
vacancy_id,vacancy_title,required_qualification,required_branch,pincode,stipend
abc,Fitter,ITI,Mech,400001,6000
";
        let error = read_vacancies(Cursor::new(data)).expect_err("bad id rejected");
        assert!(matches!(error, CatalogError::Csv(_)));
    }

    #[test]
    fn reads_pincode_table() {
        let data = "\
pincode,latitude,longitude
110001,28.6139,77.2090
400001,19.0760,72.8777
";
        let directory = read_pincodes(Cursor::new(data)).expect("table parses");

        assert_eq!(directory.len(), 2);
        assert_eq!(
            directory.lookup(Pincode(110001)),
            Some(GeoPoint {
                latitude: 28.6139,
                longitude: 77.2090,
            })
        );
        assert!(directory
            .distance_km(Pincode(110001), Pincode(400001))
            .is_some());
    }

    #[test]
    fn training_rows_keep_blanks_as_missing() {
        let records = read_training_records(Cursor::new(TRAINING_CSV)).expect("rows parse");

        assert_eq!(records.len(), 5);
        let sparse = &records[3];
        assert_eq!(sparse.candidate_name, None);
        assert_eq!(sparse.branch, None);
        assert_eq!(sparse.stipend, None);
        assert_eq!(sparse.accepted, Some(Label::Accepted));
        assert!(sparse.candidate().is_none());
        assert!(sparse.labelled_pair().is_none());
    }

    #[test]
    fn complete_rows_form_labelled_pairs() {
        let records = read_training_records(Cursor::new(TRAINING_CSV)).expect("rows parse");
        let (candidate, vacancy, label) = records[0].labelled_pair().expect("complete row");

        assert_eq!(candidate.qualification, Qualification::BTech);
        assert_eq!(candidate.pincode, Pincode(110001));
        assert_eq!(vacancy.required_branch, "any");
        assert_eq!(label, Label::Accepted);
    }

    #[test]
    fn blank_vacancy_identity_still_trains() {
        let data = "\
candidate_id,candidate_name,qualification,branch,district_pin,interest_emoji,vacancy_id,vacancy_title,min_qualification,branch_wanted,district_pin_vac,stipend,accepted
C9,Noor,Diploma,Civil,400001,tools,,,ITI,any,400002,,0
";
        let records = read_training_records(Cursor::new(data)).expect("rows parse");
        let (_, vacancy, label) = records[0].labelled_pair().expect("feature inputs present");

        assert_eq!(vacancy.vacancy_id, VacancyId::default());
        assert_eq!(vacancy.pincode, Pincode(400002));
        assert_eq!(label, Label::Rejected);
        assert!(records[0].vacancy().is_none());
        assert!(derive_catalog(&records).is_empty());
    }

    #[test]
    fn unparsable_label_is_missing_but_float_pincode_is_accepted() {
        let records = read_training_records(Cursor::new(TRAINING_CSV)).expect("rows parse");
        let row = &records[4];

        assert_eq!(row.district_pin, Some(Pincode(110001)));
        assert_eq!(row.accepted, None);
        assert!(row.labelled_pair().is_none());
    }

    #[test]
    fn derive_catalog_keeps_first_occurrence_per_vacancy() {
        let records = read_training_records(Cursor::new(TRAINING_CSV)).expect("rows parse");
        let catalog = derive_catalog(&records);

        let ids: Vec<u64> = catalog.iter().map(|listing| listing.vacancy_id.0).collect();
        assert_eq!(ids, vec![101, 102, 104]);
        assert_eq!(catalog[0].title, "Data Analyst");
        assert_eq!(catalog[0].stipend, 9000);
    }

    #[test]
    fn written_catalog_reads_back() {
        let records = read_training_records(Cursor::new(TRAINING_CSV)).expect("rows parse");
        let catalog = derive_catalog(&records);

        let mut buffer = Vec::new();
        write_vacancies(&mut buffer, &catalog).expect("catalog written");
        let header = String::from_utf8(buffer.clone()).expect("utf8");
        assert!(header.starts_with(
            "vacancy_id,vacancy_title,required_qualification,required_branch,pincode,stipend"
        ));

        let reread = read_vacancies(Cursor::new(buffer)).expect("catalog parses");
        assert_eq!(reread, catalog);
    }
}
