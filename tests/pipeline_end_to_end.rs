use std::time::Duration;

use carrier_scraper_lib::{
    AppConfig, BatchOutcome, BatchRun, EmailSource, Lookup, McRange, OutputLayout, SaferApiClient,
};
use httpmock::prelude::*;
use serde_json::json;

struct StubScraper;

impl EmailSource for StubScraper {
    fn scrape_email(&self, usdot: &str) -> Lookup<String> {
        if usdot == "3456789" {
            Lookup::Found("carrier42@example.com".to_string())
        } else {
            Lookup::Absent
        }
    }
}

fn config_for(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::from_lookup(|name| match name {
        "SAFER_API_KEY" => Some("e2e-key".to_string()),
        _ => None,
    })
    .unwrap();
    config.api_base_url = server.url("/v2/mcmx/snapshot/");
    config.item_delay = Duration::ZERO;
    config
}

#[test]
fn one_qualifier_in_default_range_yields_one_enriched_row() {
    let server = MockServer::start();
    let hit = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/mcmx/snapshot/1560042")
            .header("x-api-key", "e2e-key");
        then.status(200).json_body(json!({
            "legal_name": "ACME HAULING LLC",
            "usdot": 3456789,
            "mc_mx_ff_numbers": "MC-1560042",
            "entity_type": "CARRIER",
            "physical_address": "1 MAIN ST, SPRINGFIELD, IL 62701",
            "phone": "(555) 123-4567",
            "power_units": 1,
            "drivers": 1,
            "mcs_150_form_date": "01/15/2024",
            "mcs_150_mileage_year": { "mileage": 45000, "year": 2023 },
            "out_of_service_date": "None",
            "operating_status": "AUTHORIZED FOR Property",
            "operation_classification": ["Auth. For Hire"],
            "carrier_operation": ["Interstate"],
            "cargo_carried": ["General Freight"]
        }));
    });
    let misses = server.mock(|when, then| {
        when.method(GET)
            .path_includes("/v2/mcmx/snapshot/")
            .path_excludes("1560042");
        then.status(404);
    });

    let config = config_for(&server);
    let records = SaferApiClient::new(&config).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let run = BatchRun::new(
        McRange::new(1_560_000, 1_560_100).unwrap(),
        OutputLayout::WithScrapedEmail,
        dir.path(),
    );

    let outcome = run.execute(&records, &StubScraper, config.item_delay).unwrap();

    hit.assert_calls(1);
    misses.assert_calls(100);

    let BatchOutcome::Rows(artifact) = outcome else {
        panic!("expected one qualifying row");
    };
    assert_eq!(artifact.rows(), 1);

    let mut reader = csv::Reader::from_path(artifact.path()).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 17);
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 1);

    let row = &rows[0];
    assert_eq!(&row[0], "ACME HAULING LLC");
    assert_eq!(&row[1], "3456789");
    assert_eq!(&row[5], "+15551234567");
    assert_eq!(&row[15], "General Freight");
    assert_eq!(&row[16], "carrier42@example.com");
}

#[test]
fn range_with_no_qualifiers_reports_no_data() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path_includes("/v2/mcmx/snapshot/");
        then.status(200).json_body(json!({
            "legal_name": "BIG FLEET INC",
            "usdot": "1",
            "power_units": 40,
            "operating_status": "AUTHORIZED FOR Property"
        }));
    });

    let config = config_for(&server);
    let records = SaferApiClient::new(&config).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("none.csv");
    let run = BatchRun::with_path(
        McRange::new(10, 14).unwrap(),
        OutputLayout::WithScrapedEmail,
        path.clone(),
    );

    let outcome = run.execute(&records, &StubScraper, config.item_delay).unwrap();
    assert!(matches!(outcome, BatchOutcome::NoData));
    assert!(!path.exists());
}
