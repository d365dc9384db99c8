use crate::models::{Statistic, VariableDefinition, VariableId, ZonalStatsTable};
use tracing::debug;

/// Convert the scaled-integer statistics of `table` to physical units.
///
/// Every value in the scaled statistics that is exactly `0` is a "no real
/// zero" sentinel and becomes missing; everything else becomes
/// `value * scale + offset`. Count and std are not touched.
///
/// Not idempotent: a second call rescales already corrected values. Call it
/// exactly once per table.
pub fn correct(table: &mut ZonalStatsTable, variable: VariableId, definition: &VariableDefinition) {
    debug!(
        "Correcting {} rows of {} ({}): x * {} + {}",
        table.len(),
        table.data_type(),
        variable,
        definition.scale,
        definition.offset
    );

    for row in table.rows_mut() {
        for statistic in Statistic::SCALED {
            if let Some(slot) = row.stats.slot_mut(statistic) {
                *slot = slot.and_then(|v| (v != 0.0).then(|| definition.apply(v)));
            }
        }
    }
}
