use super::{PreassignedRecord, ResponseRecord, Roster, WorkshopRecord};
use crate::config::CsvConfig;
use crate::report::{Report, SlotEntry};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use eyre::{Result, WrapErr, bail, ensure};
use serde::Deserialize;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Reads the roster from CSV files and writes the schedule back as CSV.
///
/// Workshops are identified by their row number in the workshops file,
/// starting from 1, and students by their row number in the responses
/// file. Pre-assigned students are numbered after the respondents.
pub struct CsvLoader {
    config: CsvConfig,
}

#[derive(Deserialize)]
struct WorkshopRow {
    name: String,
    capacity: u32,
    #[serde(default)]
    location: Option<String>,
}

impl CsvLoader {
    pub fn new(config: CsvConfig) -> CsvLoader {
        CsvLoader { config }
    }

    pub fn load(&mut self) -> Result<Roster> {
        let workshops = read_workshops(open(&self.config.workshops)?)
            .wrap_err_with(|| format!("cannot load {}", self.config.workshops.display()))?;
        let responses = read_responses(open(&self.config.responses)?)
            .wrap_err_with(|| format!("cannot load {}", self.config.responses.display()))?;
        let preassigned = match &self.config.preassigned {
            Some(path) => read_preassigned(open(path)?, responses.len() as i64)
                .wrap_err_with(|| format!("cannot load {}", path.display()))?,
            None => Vec::new(),
        };
        info!(
            workshops = workshops.len(),
            responses = responses.len(),
            preassigned = preassigned.len(),
            "Loaded CSV files"
        );
        Ok(Roster {
            workshops,
            responses,
            preassigned,
        })
    }

    pub fn save(&mut self, report: &Report) -> Result<()> {
        let path = &self.config.schedule;
        write_schedule(report, create(path)?)
            .wrap_err_with(|| format!("cannot write schedule to {}", path.display()))?;
        info!(file = %path.display(), "Schedule saved");
        if let Some(path) = &self.config.fill_report {
            write_fill_report(report, create(path)?)
                .wrap_err_with(|| format!("cannot write fill report to {}", path.display()))?;
            info!(file = %path.display(), "Fill report saved");
        }
        Ok(())
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).wrap_err_with(|| format!("cannot open {}", path.display()))
}

fn create(path: &Path) -> Result<File> {
    File::create(path).wrap_err_with(|| format!("cannot create {}", path.display()))
}

/// Parse a workshop reference, either a bare number or a label ending
/// with a number between parentheses such as `Robotics (3)`.
pub fn parse_workshop_reference(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if let Ok(n) = cell.parse() {
        return Some(n);
    }
    let inner = cell.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    inner[open + 1..].trim().parse().ok()
}

fn optional(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
}

fn identity(record: &StringRecord, row: usize) -> Result<(String, String, Option<String>)> {
    let first_name = record.get(0).unwrap_or_default().trim();
    let last_name = record.get(1).unwrap_or_default().trim();
    ensure!(
        !first_name.is_empty() || !last_name.is_empty(),
        "missing student name at row {row}"
    );
    Ok((first_name.to_owned(), last_name.to_owned(), optional(record.get(2))))
}

fn reader<R: io::Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input)
}

pub(super) fn read_workshops<R: io::Read>(input: R) -> Result<Vec<WorkshopRecord>> {
    let mut workshops = Vec::new();
    for (i, row) in reader(input).deserialize::<WorkshopRow>().enumerate() {
        let row = row.wrap_err_with(|| format!("invalid workshop at row {}", i + 2))?;
        ensure!(
            row.capacity > 0,
            "workshop {} at row {} has no capacity",
            row.name,
            i + 2
        );
        workshops.push(WorkshopRecord {
            source_id: i as i64 + 1,
            name: row.name,
            capacity: row.capacity,
            location: optional(row.location.as_deref()),
        });
    }
    Ok(workshops)
}

fn reference(cell: &str, row: usize, col: usize) -> Result<Option<i64>> {
    if cell.is_empty() {
        return Ok(None);
    }
    match parse_workshop_reference(cell) {
        Some(n) => Ok(Some(n)),
        None => bail!("invalid workshop reference {cell:?} at row {row} column {col}"),
    }
}

pub(super) fn read_responses<R: io::Read>(input: R) -> Result<Vec<ResponseRecord>> {
    let mut responses = Vec::new();
    for (i, record) in reader(input).records().enumerate() {
        let row = i + 2;
        let record = record.wrap_err_with(|| format!("invalid response at row {row}"))?;
        let (first_name, last_name, grade) = identity(&record, row)?;
        let mut preferences = Vec::new();
        for (col, cell) in record.iter().enumerate().skip(3) {
            if let Some(n) = reference(cell, row, col + 1)? {
                preferences.push(n);
            }
        }
        debug!(%first_name, %last_name, ?preferences, "Read response");
        responses.push(ResponseRecord {
            source_id: i as i64 + 1,
            first_name,
            last_name,
            grade,
            preferences,
        });
    }
    Ok(responses)
}

pub(super) fn read_preassigned<R: io::Read>(
    input: R,
    first_id: i64,
) -> Result<Vec<PreassignedRecord>> {
    let mut students = Vec::new();
    for (i, record) in reader(input).records().enumerate() {
        let row = i + 2;
        let record = record.wrap_err_with(|| format!("invalid pre-assignment at row {row}"))?;
        let (first_name, last_name, grade) = identity(&record, row)?;
        let sessions = record
            .iter()
            .enumerate()
            .skip(3)
            .map(|(col, cell)| reference(cell, row, col + 1))
            .collect::<Result<Vec<_>>>()?;
        students.push(PreassignedRecord {
            source_id: first_id + i as i64 + 1,
            first_name,
            last_name,
            grade,
            sessions,
        });
    }
    Ok(students)
}

fn slot_cells(slot: Option<&SlotEntry>) -> [String; 2] {
    match slot {
        Some(slot) => [
            format!("{} ({})", slot.name, slot.number),
            slot.location.clone().unwrap_or_default(),
        ],
        None => [String::new(), String::new()],
    }
}

pub(super) fn write_schedule<W: io::Write>(report: &Report, output: W) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(output);
    let mut header = vec![
        "first_name".to_owned(),
        "last_name".to_owned(),
        "grade".to_owned(),
    ];
    for session in 1..=report.sessions {
        header.push(format!("session {session}"));
        header.push(format!("location {session}"));
    }
    writer.write_record(&header)?;
    for entry in &report.schedule {
        let mut record = vec![
            entry.first_name.clone(),
            entry.last_name.clone(),
            entry.grade.clone().unwrap_or_default(),
        ];
        for slot in &entry.slots {
            record.extend(slot_cells(slot.as_ref()));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub(super) fn write_fill_report<W: io::Write>(report: &Report, output: W) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(output);
    let mut header = vec!["workshop".to_owned(), "minimum".to_owned()];
    header.extend((1..=report.sessions).map(|session| format!("session {session}")));
    header.push("total".to_owned());
    writer.write_record(&header)?;
    for entry in &report.fill {
        let mut record = vec![
            format!("{} ({})", entry.name, entry.number),
            entry.minimum.to_string(),
        ];
        record.extend(
            entry
                .sessions
                .iter()
                .map(|(filled, capacity)| format!("{filled}/{capacity}")),
        );
        let (filled, capacity) = entry
            .sessions
            .iter()
            .fold((0, 0), |(f, c), &(filled, capacity)| (f + filled, c + capacity));
        record.push(format!("{filled}/{capacity}"));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
