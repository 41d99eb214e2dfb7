//! Download payloads for the details panel.
//!
//! CSV cells are joined with bare commas and are not quoted, so an address
//! containing a comma shifts the columns of its row. Consumers that need a
//! strict CSV should use the GeoJSON export instead.

use serde::Serialize;

use crate::parcel::ParcelRecord;

pub const CSV_HEADERS: [&str; 7] = [
    "Parcel ID",
    "Owner Name",
    "Area (m²)",
    "Address",
    "Land Use",
    "Zoning",
    "Valuation",
];

/// Pretty-printed GeoJSON of a record or a collection.
pub fn to_geojson<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

pub fn to_csv<'a>(records: impl IntoIterator<Item = &'a ParcelRecord>) -> String {
    let mut lines = vec![CSV_HEADERS.join(",")];
    lines.extend(records.into_iter().map(csv_row));
    lines.join("\n")
}

fn csv_row(record: &ParcelRecord) -> String {
    let p = &record.properties;
    [
        p.parcel_id.clone(),
        text_cell(p.owner_name.as_deref()),
        number_cell(p.area_sqm),
        text_cell(p.address.as_deref()),
        text_cell(p.land_use.as_deref()),
        text_cell(p.zoning.as_deref()),
        number_cell(p.valuation),
    ]
    .join(",")
}

fn text_cell(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// Missing and zero both export as an empty cell.
fn number_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v != 0.0 && !v.is_nan() => v.to_string(),
        _ => String::new(),
    }
}

/// `parcel_DSM001.csv` / `parcel_DSM001.geojson`.
pub fn export_file_name(record: &ParcelRecord, extension: &str) -> String {
    format!("parcel_{}.{extension}", record.properties.parcel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcel::ParcelCollection;
    use crate::parcel::fixtures::record;

    #[test]
    fn csv_header_and_row() {
        let mut r = record("DSM001", "Dar es Salaam");
        r.properties.owner_name = Some("John Mwalimu".into());
        r.properties.area_sqm = Some(2450.0);
        r.properties.land_use = Some("Residential".into());
        r.properties.zoning = Some("R1".into());
        r.properties.valuation = Some(125_000.0);

        let csv = to_csv([&r]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Parcel ID,Owner Name,Area (m²),Address,Land Use,Zoning,Valuation")
        );
        assert_eq!(
            lines.next(),
            Some("DSM001,John Mwalimu,2450,,Residential,R1,125000")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn csv_zero_and_missing_numbers_are_blank() {
        let mut r = record("P9", "Arusha");
        r.properties.area_sqm = Some(0.0);
        let csv = to_csv([&r]);
        assert_eq!(csv.lines().nth(1), Some("P9,,,,,,"));
    }

    #[test]
    fn csv_does_not_quote_embedded_commas() {
        let mut r = record("P1", "Arusha");
        r.properties.address = Some("Plot 1, Njiro".into());
        let row = to_csv([&r]).lines().nth(1).map(str::to_string);
        assert_eq!(row.as_deref(), Some("P1,,,Plot 1, Njiro,,,"));
    }

    #[test]
    fn geojson_export_is_pretty_and_parseable() {
        let collection = ParcelCollection::new(vec![record("P1", "Arusha")], 1);
        let text = to_geojson(&collection).expect("serialize");
        assert!(text.contains("\n  \"features\""));
        let back: ParcelCollection = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, collection);
    }

    #[test]
    fn single_record_geojson_parses_back_unchanged() {
        let mut r = record("DSM-0003", "Dar es Salaam");
        r.geometry = crate::parcel::Polygon::new(vec![
            vec![
                [39.27, -6.82],
                [39.272, -6.82],
                [39.272, -6.818],
                [39.27, -6.818],
                [39.27, -6.82],
            ],
            vec![
                [39.2705, -6.8195],
                [39.2708, -6.8195],
                [39.2708, -6.8192],
                [39.2705, -6.8195],
            ],
        ]);
        let p = &mut r.properties;
        p.district = Some("Kinondoni".into());
        p.ward = Some("Msasani".into());
        p.area_sqm = Some(48_210.5);
        p.perimeter_m = Some(880.25);
        p.owner_name = Some("Amina Juma".into());
        p.owner_id = Some("OWN-118".into());
        p.address = Some("Plot 12, Haile Selassie Rd".into());
        p.land_use = Some("Commercial".into());
        p.zoning = Some("C2".into());
        p.valuation = Some(1_250_000.0);
        p.created_at = Some("2023-04-11T08:30:00Z".into());
        p.updated_at = None;

        let text = to_geojson(&r).expect("serialize");
        assert!(text.starts_with("{\n  \"type\": \"Feature\""));
        let back: ParcelRecord = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, r);
    }

    #[test]
    fn file_names_use_parcel_id() {
        let r = record("ARU042", "Arusha");
        assert_eq!(export_file_name(&r, "csv"), "parcel_ARU042.csv");
    }
}
