pub mod care_team;
pub mod ics_import;
pub mod schedule;

pub use care_team::CareTeamService;
pub use ics_import::IcsImportService;
pub use schedule::ScheduleService;
