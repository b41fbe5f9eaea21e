//! Carrier snapshot records and the per-item lookup outcome type.

use serde_json::Value;

/// Outcome of a best-effort lookup against an external source.
///
/// `Absent` is a normal result (nothing there); `Failed` means the source
/// could not be asked. Neither stops a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
    Failed(String),
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent | Lookup::Failed(_) => None,
        }
    }
}

/// One carrier snapshot as returned by the record API.
///
/// Built leniently: missing keys, nulls and mistyped scalars fall back to
/// empty values rather than rejecting the whole record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarrierRecord {
    /// MC number this record was looked up by.
    pub mc_number: u64,
    pub legal_name: String,
    pub usdot: String,
    pub mc_mx_ff_numbers: String,
    pub entity_type: String,
    pub physical_address: String,
    pub phone: String,
    pub power_units: i64,
    pub drivers: String,
    pub mcs_150_form_date: String,
    pub mcs_150_mileage: String,
    pub mcs_150_mileage_year: String,
    pub out_of_service_date: String,
    pub operating_status: String,
    pub operation_classification: Vec<String>,
    pub carrier_operation: Vec<String>,
    pub cargo_carried: Vec<String>,
    /// Filled in after scraping; empty when no public email was found.
    pub email: String,
}

impl CarrierRecord {
    pub fn from_json(mc_number: u64, data: &Value) -> Self {
        let mileage = data.get("mcs_150_mileage_year").unwrap_or(&Value::Null);

        CarrierRecord {
            mc_number,
            legal_name: text(data, "legal_name"),
            usdot: text(data, "usdot"),
            mc_mx_ff_numbers: text(data, "mc_mx_ff_numbers"),
            entity_type: text(data, "entity_type"),
            physical_address: text(data, "physical_address"),
            phone: text(data, "phone"),
            power_units: integer(data, "power_units"),
            drivers: text(data, "drivers"),
            mcs_150_form_date: text(data, "mcs_150_form_date"),
            mcs_150_mileage: text(mileage, "mileage"),
            mcs_150_mileage_year: text(mileage, "year"),
            out_of_service_date: text(data, "out_of_service_date"),
            operating_status: text(data, "operating_status"),
            operation_classification: list(data, "operation_classification"),
            carrier_operation: list(data, "carrier_operation"),
            cargo_carried: list(data, "cargo_carried"),
            email: String::new(),
        }
    }

    pub fn with_email(mut self, email: String) -> Self {
        self.email = email;
        self
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn text(data: &Value, key: &str) -> String {
    data.get(key).and_then(scalar_text).unwrap_or_default()
}

fn integer(data: &Value, key: &str) -> i64 {
    match data.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn list(data: &Value, key: &str) -> Vec<String> {
    match data.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_snapshot_maps_every_field() {
        let data = json!({
            "legal_name": "ACME HAULING LLC",
            "usdot": 3456789,
            "mc_mx_ff_numbers": "MC-1560042",
            "entity_type": "CARRIER",
            "physical_address": "1 MAIN ST, SPRINGFIELD, IL 62701",
            "phone": "(555) 123-4567",
            "power_units": 1,
            "drivers": 2,
            "mcs_150_form_date": "01/15/2024",
            "mcs_150_mileage_year": { "mileage": 45000, "year": 2023 },
            "out_of_service_date": "None",
            "operating_status": "AUTHORIZED FOR Property",
            "operation_classification": ["Auth. For Hire"],
            "carrier_operation": ["Interstate"],
            "cargo_carried": ["General Freight", "Household Goods"]
        });

        let record = CarrierRecord::from_json(1560042, &data);
        assert_eq!(record.mc_number, 1560042);
        assert_eq!(record.legal_name, "ACME HAULING LLC");
        assert_eq!(record.usdot, "3456789");
        assert_eq!(record.power_units, 1);
        assert_eq!(record.drivers, "2");
        assert_eq!(record.mcs_150_mileage, "45000");
        assert_eq!(record.mcs_150_mileage_year, "2023");
        assert_eq!(record.cargo_carried, vec!["General Freight", "Household Goods"]);
        assert!(record.email.is_empty());
    }

    #[test]
    fn empty_object_yields_defaults() {
        let record = CarrierRecord::from_json(7, &json!({}));
        assert_eq!(record, CarrierRecord { mc_number: 7, ..Default::default() });
    }

    #[test]
    fn mistyped_fields_do_not_poison_the_record() {
        let data = json!({
            "legal_name": null,
            "power_units": "1",
            "mcs_150_mileage_year": "n/a",
            "cargo_carried": "General Freight",
            "carrier_operation": [null, "Interstate", ""],
            "operation_classification": { "unexpected": true }
        });
        let record = CarrierRecord::from_json(1, &data);
        assert_eq!(record.legal_name, "");
        assert_eq!(record.power_units, 1);
        assert_eq!(record.mcs_150_mileage, "");
        assert_eq!(record.cargo_carried, vec!["General Freight"]);
        assert_eq!(record.carrier_operation, vec!["Interstate"]);
        assert!(record.operation_classification.is_empty());
    }

    #[test]
    fn non_object_payload_is_tolerated() {
        let record = CarrierRecord::from_json(3, &json!([1, 2, 3]));
        assert_eq!(record.power_units, 0);
        assert_eq!(record.operating_status, "");
    }

    #[test]
    fn lookup_found_unwraps_only_found() {
        assert_eq!(Lookup::Found(3).found(), Some(3));
        assert_eq!(Lookup::<i32>::Absent.found(), None);
        assert_eq!(Lookup::<i32>::Failed("boom".into()).found(), None);
    }
}
