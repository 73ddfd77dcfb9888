//! Load the candidate table (CSV). Columns are matched by header name, so column order
//! and extra columns (e.g. a leading index) do not matter.
//!
//! Required: `type`, `name`, `salary`, `score`. Optional: `contract` (non-empty means
//! locked), `include` (1 means forced), `exclude` (1 means excluded).

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::data::candidate::{Candidate, CandidateId, CandidatePool, Category};

pub const DEFAULT_CANDIDATES_PATH: &str = "data/gridrival_stats.csv";

#[derive(Debug)]
pub enum DataError {
    Read(std::io::Error),
    Csv(csv::Error),
    UnknownCategory { row: usize, value: String },
    Write(std::io::Error),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to read candidate table: {err}"),
            Self::Csv(err) => write!(f, "malformed candidate table: {err}"),
            Self::UnknownCategory { row, value } => write!(
                f,
                "row {row}: unknown type '{value}' (expected 'driver' or 'team')"
            ),
            Self::Write(err) => write!(f, "failed to write result table: {err}"),
        }
    }
}

impl std::error::Error for DataError {}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct CandidateRow {
    #[serde(rename = "type")]
    category: String,
    name: String,
    salary: f64,
    score: f64,
    #[serde(default)]
    contract: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    include: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    exclude: Option<f64>,
}

impl CandidateRow {
    fn into_candidate(self, row: usize) -> Result<Candidate, DataError> {
        let category = Category::parse(&self.category).ok_or_else(|| DataError::UnknownCategory {
            row,
            value: self.category.clone(),
        })?;
        Ok(Candidate {
            id: CandidateId(row),
            name: self.name.trim().to_string(),
            category,
            cost: self.salary,
            score: self.score,
            excluded: is_flag_set(self.exclude),
            locked: self
                .contract
                .as_deref()
                .is_some_and(|value| !value.trim().is_empty()),
            force_include: is_flag_set(self.include),
        })
    }
}

fn is_flag_set(value: Option<f64>) -> bool {
    value.is_some_and(|flag| flag == 1.0)
}

pub fn load_candidates(path: impl AsRef<Path>) -> Result<CandidatePool, DataError> {
    let raw = fs::read_to_string(path).map_err(DataError::Read)?;
    load_candidates_from_reader(raw.as_bytes())
}

pub fn load_candidates_from_reader<R: Read>(reader: R) -> Result<CandidatePool, DataError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candidates = Vec::new();
    for (row, record) in reader.deserialize::<CandidateRow>().enumerate() {
        candidates.push(record?.into_candidate(row)?);
    }
    Ok(CandidatePool::new(candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
,type,name,salary,score,contract,include,exclude
0,driver,Ace,10,50,,,
1,Driver,Bolt,12.5,60,2 races,,
2,driver,Crash,20,80,,1.0,
3,team,Works,15,40,,,1
";

    #[test]
    fn parses_flags_and_categories() {
        let pool = load_candidates_from_reader(TABLE.as_bytes()).expect("valid table");
        let candidates = pool.candidates();
        assert_eq!(candidates.len(), 4);

        assert_eq!(candidates[0].name, "Ace");
        assert!(!candidates[0].is_committed() && !candidates[0].excluded);
        assert!(candidates[1].locked);
        assert_eq!(candidates[1].cost, 12.5);
        assert!(candidates[2].force_include);
        assert_eq!(candidates[3].category, Category::Team);
        assert!(candidates[3].excluded);
        assert_eq!(candidates[3].id, CandidateId(3));
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let table = "type,name,salary,score\ndriver,Solo,5,10\n";
        let pool = load_candidates_from_reader(table.as_bytes()).expect("valid table");
        assert_eq!(pool.len(), 1);
        assert!(!pool.candidates()[0].is_committed());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let table = "type,name,salary,score\nconstructor,X,5,10\n";
        let err = load_candidates_from_reader(table.as_bytes()).expect_err("bad type");
        assert!(matches!(err, DataError::UnknownCategory { row: 0, .. }));
    }

    #[test]
    fn non_numeric_salary_is_a_csv_error() {
        let table = "type,name,salary,score\ndriver,X,cheap,10\n";
        let err = load_candidates_from_reader(table.as_bytes()).expect_err("bad salary");
        assert!(matches!(err, DataError::Csv(_)));
    }
}
