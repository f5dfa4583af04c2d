use crate::error::CoaError;
use std::collections::BTreeMap;
use std::fmt;

/// Upper bound on tested-property rows per certificate.
pub const MAX_TEST_ROWS: usize = 8;

/// The recognized certificate fields. Everything else arriving from a form
/// or spreadsheet is ignored by layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    CustomerName,
    AccountNumber,
    PoNumber,
    QuoteNumber,
    OrderDate,
    QuantityShipped,
    ShippedDate,
    ShippedLocation,
    ItemName,
    ItemSku,
    LotNumber,
    ManufacturingLocation,
    ManufacturingDate,
    TestDate,
    ExpirationDate,
    PrintDate,
}

impl FieldKey {
    pub const ALL: [FieldKey; 16] = [
        FieldKey::CustomerName,
        FieldKey::AccountNumber,
        FieldKey::PoNumber,
        FieldKey::QuoteNumber,
        FieldKey::OrderDate,
        FieldKey::QuantityShipped,
        FieldKey::ShippedDate,
        FieldKey::ShippedLocation,
        FieldKey::ItemName,
        FieldKey::ItemSku,
        FieldKey::LotNumber,
        FieldKey::ManufacturingLocation,
        FieldKey::ManufacturingDate,
        FieldKey::TestDate,
        FieldKey::ExpirationDate,
        FieldKey::PrintDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::CustomerName => "customerName",
            FieldKey::AccountNumber => "accountNumber",
            FieldKey::PoNumber => "poNumber",
            FieldKey::QuoteNumber => "quoteNumber",
            FieldKey::OrderDate => "orderDate",
            FieldKey::QuantityShipped => "quantityShipped",
            FieldKey::ShippedDate => "shippedDate",
            FieldKey::ShippedLocation => "shippedLocation",
            FieldKey::ItemName => "itemName",
            FieldKey::ItemSku => "itemSKU",
            FieldKey::LotNumber => "lotNumber",
            FieldKey::ManufacturingLocation => "manufacturingLocation",
            FieldKey::ManufacturingDate => "manufacturingDate",
            FieldKey::TestDate => "testDate",
            FieldKey::ExpirationDate => "expirationDate",
            FieldKey::PrintDate => "printDate",
        }
    }

    pub fn parse(raw: &str) -> Option<FieldKey> {
        FieldKey::ALL.iter().copied().find(|key| key.as_str() == raw)
    }

    /// The explicit set of date-bearing fields. Deciding this at the data
    /// model level replaces the label-substring guessing the layout would
    /// otherwise have to do.
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            FieldKey::OrderDate
                | FieldKey::ShippedDate
                | FieldKey::ManufacturingDate
                | FieldKey::TestDate
                | FieldKey::ExpirationDate
                | FieldKey::PrintDate
        )
    }
}

/// Field values for one generation request. Constructed once, then read-only;
/// missing keys render as empty strings.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    values: BTreeMap<FieldKey, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: FieldKey, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return;
        }
        self.values.insert(key, trimmed.to_string());
    }

    pub fn get(&self, key: FieldKey) -> &str {
        self.values.get(&key).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(FieldKey, String)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (FieldKey, String)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// One tested-property row. All values stay strings; formatting policy is
/// applied at layout time, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRow {
    pub property: String,
    pub test_method: String,
    pub unit: String,
    pub lower_limit: String,
    pub upper_limit: String,
    pub result: String,
}

impl TestRow {
    pub fn is_empty(&self) -> bool {
        self.property.is_empty()
            && self.test_method.is_empty()
            && self.unit.is_empty()
            && self.lower_limit.is_empty()
            && self.upper_limit.is_empty()
            && self.result.is_empty()
    }

    fn trimmed(&self) -> TestRow {
        TestRow {
            property: self.property.trim().to_string(),
            test_method: self.test_method.trim().to_string(),
            unit: self.unit.trim().to_string(),
            lower_limit: self.lower_limit.trim().to_string(),
            upper_limit: self.upper_limit.trim().to_string(),
            result: self.result.trim().to_string(),
        }
    }
}

/// Trim every sub-field, drop rows that end up entirely empty, keep input
/// order, cap at [`MAX_TEST_ROWS`].
pub fn assemble_test_rows<I>(rows: I) -> Vec<TestRow>
where
    I: IntoIterator<Item = TestRow>,
{
    rows.into_iter()
        .map(|row| row.trimmed())
        .filter(|row| !row.is_empty())
        .take(MAX_TEST_ROWS)
        .collect()
}

#[derive(Debug, Clone)]
pub struct ImportWarning {
    pub record: usize,
    pub message: String,
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.record, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportedData {
    pub fields: FieldMap,
    pub rows: Vec<TestRow>,
    pub warnings: Vec<ImportWarning>,
}

/// Spreadsheet keys for the indexed test-row groups (`property1` ..
/// `result8`) map onto fixed row records; nothing downstream ever sees the
/// stringly-typed names.
fn test_row_slot(key: &str) -> Option<(usize, fn(&mut TestRow) -> &mut String)> {
    let digit_at = key.find(|c: char| c.is_ascii_digit())?;
    let (name, index) = key.split_at(digit_at);
    let index: usize = index.parse().ok()?;
    if !(1..=MAX_TEST_ROWS).contains(&index) {
        return None;
    }
    let slot: fn(&mut TestRow) -> &mut String = match name {
        "property" => |row| &mut row.property,
        "testMethod" => |row| &mut row.test_method,
        "unit" => |row| &mut row.unit,
        "lowerLimit" => |row| &mut row.lower_limit,
        "upperLimit" => |row| &mut row.upper_limit,
        "result" => |row| &mut row.result,
        _ => return None,
    };
    Some((index - 1, slot))
}

/// Parse a two-column (key, value) delimited file into a field map plus test
/// rows. A header row whose first cell is literally "field" is skipped; rows
/// with a blank key or blank value are dropped; anything malformed or
/// unrecognized is skipped with a warning and the import proceeds with the
/// rest. Only non-UTF-8 payloads fail the import outright.
pub fn parse_import(bytes: &[u8]) -> Result<ImportedData, CoaError> {
    let text = std::str::from_utf8(bytes).map_err(|_| {
        CoaError::Import("unsupported file type (expected UTF-8 delimited text)".to_string())
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut fields = FieldMap::new();
    let mut groups: Vec<TestRow> = vec![TestRow::default(); MAX_TEST_ROWS];
    let mut warnings = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let number = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(row = number, error = %err, "skipping malformed import row");
                warnings.push(ImportWarning {
                    record: number,
                    message: format!("malformed row: {}", err),
                });
                continue;
            }
        };
        let key = record.get(0).unwrap_or("").trim();
        if key.is_empty() {
            continue;
        }
        if key.eq_ignore_ascii_case("field") {
            continue;
        }
        let value = record.get(1).unwrap_or("").trim();
        if value.is_empty() {
            continue;
        }
        if let Some(field_key) = FieldKey::parse(key) {
            fields.insert(field_key, value);
        } else if let Some((group, slot)) = test_row_slot(key) {
            *slot(&mut groups[group]) = value.to_string();
        } else {
            tracing::warn!(row = number, key, "unrecognized import key");
            warnings.push(ImportWarning {
                record: number,
                message: format!("unrecognized key \"{}\"", key),
            });
        }
    }

    Ok(ImportedData {
        fields,
        rows: assemble_test_rows(groups),
        warnings,
    })
}

/// `{itemSKU}_{lotNumber}_{poNumber}.pdf`, with placeholder tokens standing
/// in for blank fields.
pub fn suggested_filename(fields: &FieldMap) -> String {
    let part = |key: FieldKey, fallback: &str| {
        let value = fields.get(key).trim();
        if value.is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };
    format!(
        "{}_{}_{}.pdf",
        part(FieldKey::ItemSku, "ITEMSKU"),
        part(FieldKey::LotNumber, "LOTNUMBER"),
        part(FieldKey::PoNumber, "CUSTOMERPO"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(property: &str, result: &str) -> TestRow {
        TestRow {
            property: property.to_string(),
            result: result.to_string(),
            ..TestRow::default()
        }
    }

    #[test]
    fn all_empty_rows_are_filtered() {
        let rows = assemble_test_rows(vec![
            row("Viscosity", "12"),
            TestRow::default(),
            row("  ", " "),
            row("Density", ""),
        ]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].property, "Viscosity");
        assert_eq!(rows[1].property, "Density");
        assert_eq!(rows[1].result, "");
    }

    #[test]
    fn row_order_is_preserved_and_capped() {
        let rows: Vec<TestRow> = (0..12).map(|i| row(&format!("p{}", i), "1")).collect();
        let assembled = assemble_test_rows(rows);
        assert_eq!(assembled.len(), MAX_TEST_ROWS);
        assert_eq!(assembled[0].property, "p0");
        assert_eq!(assembled[7].property, "p7");
    }

    #[test]
    fn import_skips_header_and_blank_values() {
        let csv = b"field,value\ncustomerName,Acme Corp\npoNumber,\nlotNumber,L-100\n";
        let imported = parse_import(csv).expect("import");
        assert_eq!(imported.fields.get(FieldKey::CustomerName), "Acme Corp");
        assert_eq!(imported.fields.get(FieldKey::PoNumber), "");
        assert_eq!(imported.fields.get(FieldKey::LotNumber), "L-100");
        assert_eq!(imported.fields.len(), 2);
        assert!(imported.warnings.is_empty());
    }

    #[test]
    fn import_routes_indexed_keys_into_rows() {
        let csv =
            b"property1,Viscosity\nresult1,1500\nproperty3,Density\nunit3,g/mL\nresult8,42\n";
        let imported = parse_import(csv).expect("import");
        // Groups 2 and 4..7 are all-empty and vanish; order is preserved.
        assert_eq!(imported.rows.len(), 3);
        assert_eq!(imported.rows[0].property, "Viscosity");
        assert_eq!(imported.rows[0].result, "1500");
        assert_eq!(imported.rows[1].property, "Density");
        assert_eq!(imported.rows[1].unit, "g/mL");
        assert_eq!(imported.rows[2].result, "42");
    }

    #[test]
    fn import_warns_on_unknown_keys_but_continues() {
        let csv = b"notAField,oops\ncustomerName,Acme\n";
        let imported = parse_import(csv).expect("import");
        assert_eq!(imported.warnings.len(), 1);
        assert_eq!(imported.fields.get(FieldKey::CustomerName), "Acme");
    }

    #[test]
    fn import_rejects_non_utf8() {
        let err = parse_import(&[0xff, 0xfe, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, CoaError::Import(_)));
    }

    #[test]
    fn filename_uses_placeholders_for_blank_fields() {
        let mut fields = FieldMap::new();
        fields.insert(FieldKey::ItemSku, "SKU-1");
        assert_eq!(suggested_filename(&fields), "SKU-1_LOTNUMBER_CUSTOMERPO.pdf");
        fields.insert(FieldKey::LotNumber, "L9");
        fields.insert(FieldKey::PoNumber, "PO7");
        assert_eq!(suggested_filename(&fields), "SKU-1_L9_PO7.pdf");
    }

    #[test]
    fn date_keys_are_exactly_the_six_date_fields() {
        let dates: Vec<&str> = FieldKey::ALL
            .iter()
            .filter(|key| key.is_date())
            .map(|key| key.as_str())
            .collect();
        assert_eq!(
            dates,
            vec![
                "orderDate",
                "shippedDate",
                "manufacturingDate",
                "testDate",
                "expirationDate",
                "printDate"
            ]
        );
    }
}
