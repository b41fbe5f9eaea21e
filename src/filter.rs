use crate::record::CarrierRecord;

pub const REQUIRED_POWER_UNITS: i64 = 1;
pub const REQUIRED_STATUS: &str = "authorized for property";

/// Single power unit carriers authorized to haul property. A missing record
/// never reaches this check, so it never qualifies.
pub fn qualifies(record: &CarrierRecord) -> bool {
    record.power_units == REQUIRED_POWER_UNITS
        && record.operating_status.to_lowercase().contains(REQUIRED_STATUS)
}
