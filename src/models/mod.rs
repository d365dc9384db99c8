pub mod naming;
pub mod record;
pub mod table;
pub mod variable;
pub mod zone;

pub use naming::{DateFormat, DateOffsets, DateRule, NamingClass};
pub use record::{Statistic, ZonalStatRecord, ZoneStatistics};
pub use table::ZonalStatsTable;
pub use variable::{VariableDefinition, VariableId, VariableRegistry};
pub use zone::{Zone, ZoneGeometry, ZoneSet};
