//! Bank registry records and line normalization.

use serde::Serialize;

/// Number of `;`-separated fields a data line must carry.
pub const FIELD_COUNT: usize = 13;

pub const FIELD_DELIMITER: char = ';';

/// One branch entry of the routing code registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankRecord {
    pub routing_code: String,
    pub record_marker: String,
    pub name: String,
    pub postal_code: String,
    pub city: String,
    pub short_name: String,
    pub pan: String,
    pub bic: String,
    pub checksum_method: String,
    pub record_sequence: String,
    pub change_flag: String,
    pub deleted_routing_code: String,
    pub successor_routing_code: String,
}

/// Why a line did not produce a record. None of these count as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    TooFewFields { found: usize },
    MissingRoutingCode,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "blank line"),
            Self::TooFewFields { found } => {
                write!(f, "expected {} fields, found {}", FIELD_COUNT, found)
            }
            Self::MissingRoutingCode => write!(f, "routing code is empty"),
        }
    }
}

impl BankRecord {
    /// Decode already normalized fields in registry column order.
    /// Fields beyond the thirteenth are ignored.
    pub fn from_fields(fields: &[String]) -> Result<Self, SkipReason> {
        let [
            routing_code,
            record_marker,
            name,
            postal_code,
            city,
            short_name,
            pan,
            bic,
            checksum_method,
            record_sequence,
            change_flag,
            deleted_routing_code,
            successor_routing_code,
            ..,
        ] = fields
        else {
            return Err(SkipReason::TooFewFields {
                found: fields.len(),
            });
        };
        if routing_code.is_empty() {
            return Err(SkipReason::MissingRoutingCode);
        }
        Ok(Self {
            routing_code: routing_code.clone(),
            record_marker: record_marker.clone(),
            name: name.clone(),
            postal_code: postal_code.clone(),
            city: city.clone(),
            short_name: short_name.clone(),
            pan: pan.clone(),
            bic: bic.clone(),
            checksum_method: checksum_method.clone(),
            record_sequence: record_sequence.clone(),
            change_flag: change_flag.clone(),
            deleted_routing_code: deleted_routing_code.clone(),
            successor_routing_code: successor_routing_code.clone(),
        })
    }

    pub fn has_bic(&self) -> bool {
        !self.bic.is_empty()
    }
}

/// Strip one leading and one trailing `"`, then trim.
pub fn normalize_field(raw: &str) -> String {
    let s = raw.strip_prefix('"').unwrap_or(raw);
    let s = s.strip_suffix('"').unwrap_or(s);
    s.trim().to_string()
}

/// Parse one data line. Embedded semicolons inside quotes are not supported.
pub fn parse_line(line: &str) -> Result<BankRecord, SkipReason> {
    let line = line.trim();
    if line.is_empty() {
        return Err(SkipReason::Blank);
    }
    let fields: Vec<String> = line.split(FIELD_DELIMITER).map(normalize_field).collect();
    BankRecord::from_fields(&fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDESBANK: &str = r#""10000000";"1";"Deutsche Bundesbank";"10591";"Berlin";"";"";"";"";"";"";"";"""#;

    #[test]
    fn parses_quoted_bundesbank_line() {
        let rec = parse_line(BUNDESBANK).unwrap();
        assert_eq!(rec.routing_code, "10000000");
        assert_eq!(rec.record_marker, "1");
        assert_eq!(rec.name, "Deutsche Bundesbank");
        assert_eq!(rec.postal_code, "10591");
        assert_eq!(rec.city, "Berlin");
        assert_eq!(rec.bic, "");
        assert!(!rec.has_bic());
        assert_eq!(rec.successor_routing_code, "");
    }

    #[test]
    fn maps_fields_by_position() {
        let line = "10020890;1;UniCredit Bank - HypoVereinsbank;10896;Berlin;UniCredit Bank-HypoVereinsbank;22014;HYVEDEMM488;99;0001;U;0;00000000";
        let rec = parse_line(line).unwrap();
        assert_eq!(rec.short_name, "UniCredit Bank-HypoVereinsbank");
        assert_eq!(rec.pan, "22014");
        assert_eq!(rec.bic, "HYVEDEMM488");
        assert_eq!(rec.checksum_method, "99");
        assert_eq!(rec.record_sequence, "0001");
        assert_eq!(rec.change_flag, "U");
        assert_eq!(rec.deleted_routing_code, "0");
        assert_eq!(rec.successor_routing_code, "00000000");
    }

    #[test]
    fn twelve_fields_is_too_few() {
        let line = "10000000;1;Bank;10591;Berlin;;;;;;;";
        assert_eq!(
            parse_line(line),
            Err(SkipReason::TooFewFields { found: 12 })
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        let line = "10000000;1;Bank;10591;Berlin;;;;;;;;;extra;more";
        let rec = parse_line(line).unwrap();
        assert_eq!(rec.routing_code, "10000000");
        assert_eq!(rec.successor_routing_code, "");
    }

    #[test]
    fn empty_routing_code_is_skipped() {
        let line = r#""";1;Bank;10591;Berlin;;;;;;;;"#;
        assert_eq!(parse_line(line), Err(SkipReason::MissingRoutingCode));
    }

    #[test]
    fn blank_and_whitespace_lines() {
        assert_eq!(parse_line(""), Err(SkipReason::Blank));
        assert_eq!(parse_line("   \t "), Err(SkipReason::Blank));
    }

    #[test]
    fn normalize_strips_single_quote_pair_then_trims() {
        assert_eq!(normalize_field("\" Berlin \""), "Berlin");
        assert_eq!(normalize_field("\"\"Quoted\"\""), "\"Quoted\"");
        assert_eq!(normalize_field("plain"), "plain");
        assert_eq!(normalize_field("\""), "");
        assert_eq!(normalize_field("  spaced  "), "spaced");
    }

    #[test]
    fn surrounding_whitespace_on_line_is_trimmed() {
        let line = format!("  {}  \r", BUNDESBANK);
        let rec = parse_line(&line).unwrap();
        assert_eq!(rec.routing_code, "10000000");
    }
}
