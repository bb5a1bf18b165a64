use crate::config::LoaderConfig;
use crate::report::Report;
use eyre::Result;

pub use self::csv_loader::CsvLoader;
pub use self::sql_loader::SqlLoader;

mod csv_loader;
mod sql_loader;

/// A workshop as described by the data source. `source_id` is the
/// identifier used by the source, which preferences refer to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkshopRecord {
    pub source_id: i64,
    pub name: String,
    pub capacity: u32,
    pub location: Option<String>,
}

/// A student and their preferences, most preferred first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseRecord {
    pub source_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub grade: Option<String>,
    pub preferences: Vec<i64>,
}

/// A student whose workshop at each time slot is imposed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreassignedRecord {
    pub source_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub grade: Option<String>,
    pub sessions: Vec<Option<i64>>,
}

#[derive(Clone, Debug, Default)]
pub struct Roster {
    pub workshops: Vec<WorkshopRecord>,
    pub responses: Vec<ResponseRecord>,
    pub preassigned: Vec<PreassignedRecord>,
}

pub enum Loader {
    Csv(CsvLoader),
    Database(SqlLoader),
}

impl Loader {
    pub async fn new(config: &LoaderConfig) -> Result<Loader> {
        Ok(match config {
            LoaderConfig::Csv(csv) => Loader::Csv(CsvLoader::new(csv.clone())),
            LoaderConfig::Database(db) => Loader::Database(SqlLoader::new(&db.url).await?),
        })
    }

    pub async fn load(&mut self) -> Result<Roster> {
        match self {
            Loader::Csv(loader) => loader.load(),
            Loader::Database(loader) => loader.load().await,
        }
    }

    pub async fn save(&mut self, report: &Report) -> Result<()> {
        match self {
            Loader::Csv(loader) => loader.save(report),
            Loader::Database(loader) => loader.save(report).await,
        }
    }
}
