use serde::Deserialize;
use thiserror::Error;

/// The expected CSV structure. Columns other than these are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Record {
    pub province: Option<String>,
    pub city: Option<String>,
}

/// Why a record cannot be turned into an address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("the {0} field is missing or blank")]
    MissingField(&'static str),
}

impl Record {
    pub fn new(province: &str, city: &str) -> Self {
        Self {
            province: Some(province.to_owned()),
            city: Some(city.to_owned()),
        }
    }

    /// Join province and city with a single space, e.g. "서울특별시 강남구".
    ///
    /// The values are used verbatim. A blank field would produce a malformed
    /// query, so it is rejected instead.
    pub fn short_address(&self) -> Result<String, AddressError> {
        let province = non_blank(self.province.as_deref(), "province")?;
        let city = non_blank(self.city.as_deref(), "city")?;
        Ok(format!("{province} {city}"))
    }
}

/// Build the short address of every record, skipping invalid ones.
pub fn short_addresses(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| match record.short_address() {
            Ok(address) => Some(address),
            Err(e) => {
                log::warn!("Skipping record {} because {e}", i + 1);
                None
            }
        })
        .collect()
}

fn non_blank<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, AddressError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AddressError::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_province_and_city_with_one_space() {
        let record = Record::new("Seoul", "Gangnam-gu");
        assert_eq!(record.short_address().unwrap(), "Seoul Gangnam-gu");

        let record = Record::new("경기도", "수원시");
        assert_eq!(record.short_address().unwrap(), "경기도 수원시");
    }

    #[test]
    fn keeps_values_verbatim() {
        let record = Record::new(" Busan", "Haeundae-gu ");
        assert_eq!(record.short_address().unwrap(), " Busan Haeundae-gu ");
    }

    #[test]
    fn rejects_missing_or_blank_fields() {
        let record = Record {
            province: None,
            city: Some("Jung-gu".into()),
        };
        assert_eq!(
            record.short_address(),
            Err(AddressError::MissingField("province"))
        );

        let record = Record::new("Incheon", "   ");
        assert_eq!(
            record.short_address(),
            Err(AddressError::MissingField("city"))
        );
    }

    #[test]
    fn skips_invalid_records() {
        let records = vec![
            Record::new("Seoul", "Gangnam-gu"),
            Record::new("", "Suwon-si"),
            Record::default(),
            Record::new("Jeju-do", "Seogwipo-si"),
        ];
        assert_eq!(
            short_addresses(&records),
            vec!["Seoul Gangnam-gu", "Jeju-do Seogwipo-si"]
        );
    }
}
