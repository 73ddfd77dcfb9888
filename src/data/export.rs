//! Result tables. Written once per run, after the final roster is settled, to
//! `results_<YYYY_MM_DD_HH_MM>.csv` in the output directory. The stamp is local wall-clock
//! time.
//!
//! Rows go to a hidden temp file first, which is renamed into place only once every row
//! is flushed, so a failed run leaves no partial table behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::data::candidate::{Candidate, CandidatePool, Category};
use crate::data::loader::DataError;
use crate::optimizer::reconcile::Roster;
use crate::optimizer::sampling::TrialOutcome;
use crate::optimizer::star::STAR_MULTIPLIER;

#[derive(Debug, Serialize)]
struct RosterRow<'a> {
    #[serde(rename = "type")]
    category: Category,
    name: &'a str,
    salary: f64,
    score: f64,
    starred: u8,
    include: u8,
}

#[derive(Debug, Serialize)]
struct TrialRow<'a> {
    #[serde(rename = "type")]
    category: Category,
    name: &'a str,
    salary: f64,
    score: f64,
    starred: u8,
    include: u8,
    points: f64,
    trial: usize,
}

pub fn results_file_name(stamp: NaiveDateTime) -> String {
    format!("results_{}.csv", stamp.format("%Y_%m_%d_%H_%M"))
}

fn write_atomically<F>(dir: &Path, stamp: NaiveDateTime, fill: F) -> Result<PathBuf, DataError>
where
    F: FnOnce(&mut csv::Writer<fs::File>) -> Result<(), DataError>,
{
    fs::create_dir_all(dir).map_err(DataError::Write)?;
    let name = results_file_name(stamp);
    let path = dir.join(&name);
    let staging = dir.join(format!(".{name}.tmp"));

    let written = fs::File::create(&staging)
        .map_err(DataError::Write)
        .and_then(|file| {
            let mut writer = csv::Writer::from_writer(file);
            fill(&mut writer)?;
            writer.flush().map_err(DataError::Write)
        })
        .and_then(|()| fs::rename(&staging, &path).map_err(DataError::Write));
    if let Err(err) = written {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    Ok(path)
}

/// Write the final roster; scores are post-star.
pub fn write_roster_csv(
    dir: impl AsRef<Path>,
    roster: &Roster,
    stamp: NaiveDateTime,
) -> Result<PathBuf, DataError> {
    write_atomically(dir.as_ref(), stamp, |writer| {
        for entry in &roster.entries {
            writer.serialize(RosterRow {
                category: entry.category,
                name: &entry.name,
                salary: entry.cost,
                score: entry.score,
                starred: u8::from(entry.starred),
                include: u8::from(entry.forced),
            })?;
        }
        Ok(())
    })
}

/// Write every retained sampling trial, best first, one row per roster member.
/// Committed entities are repeated in each trial. The trial's star has its score doubled.
pub fn write_sampling_csv(
    dir: impl AsRef<Path>,
    trials: &[TrialOutcome],
    free_members: &[Candidate],
    pool: &CandidatePool,
    stamp: NaiveDateTime,
) -> Result<PathBuf, DataError> {
    write_atomically(dir.as_ref(), stamp, |writer| {
        for trial in trials {
            let members = trial
                .picks
                .iter()
                .filter_map(|&index| free_members.get(index))
                .chain(pool.committed());
            for candidate in members {
                let starred = trial.star == Some(candidate.id);
                writer.serialize(TrialRow {
                    category: candidate.category,
                    name: &candidate.name,
                    salary: candidate.cost,
                    score: if starred {
                        candidate.score * STAR_MULTIPLIER
                    } else {
                        candidate.score
                    },
                    starred: u8::from(starred),
                    include: u8::from(candidate.force_include),
                    points: trial.points,
                    trial: trial.trial,
                })?;
            }
        }
        Ok(())
    })
}
