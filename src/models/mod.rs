mod balance;
mod nav;
mod pm;
mod report;
mod shares;
mod table;

pub use balance::{latest_per_pm, BalanceObservation, EnhancedBalanceRow};
pub use nav::{compute_nav, AggregationRow, NavRecord};
pub use pm::PmConfigEntry;
pub use report::{
    ActivePmStatus, FallbackUse, InactivePmStatus, ReportSummary, ValidationReport,
    ValidationReportBuilder,
};
pub use shares::SharesRecord;
pub use table::{TableName, TableNameError};
