//! Annual atmospheric CO2 record

use log::warn;
use rscf_core::errors::{ForcingError, ForcingResult};
use rscf_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Annual CO2 concentrations keyed by calendar year.
///
/// Years before the record use the spin-up value, years after it repeat the last value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Co2Record {
    first_year: i32,
    /// One value per year from `first_year`
    /// unit: ppm
    values: Vec<FloatValue>,
    spinup_value: FloatValue,
}

impl Co2Record {
    /// Build a record from consecutive years
    pub fn new(first_year: i32, values: Vec<FloatValue>) -> ForcingResult<Self> {
        let Some(first) = values.first().copied() else {
            return Err(ForcingError::Parse {
                what: "CO2 record".to_string(),
                reason: "no values".to_string(),
            });
        };
        if let Some(bad) = values.iter().find(|v| v.is_nan() || **v <= 0.0) {
            return Err(ForcingError::Parse {
                what: "CO2 record".to_string(),
                reason: format!("non-positive concentration {bad}"),
            });
        }
        Ok(Self {
            first_year,
            values,
            spinup_value: first,
        })
    }

    /// A constant concentration for every year
    pub fn constant(value: FloatValue) -> ForcingResult<Self> {
        Self::new(0, vec![value])
    }

    /// Parse `year value` lines. Blank lines and `#` comments are ignored, years must be
    /// consecutive.
    pub fn parse(input: &str) -> ForcingResult<Self> {
        let parse_error = |line: usize, reason: String| ForcingError::Parse {
            what: "CO2 record".to_string(),
            reason: format!("line {}: {}", line + 1, reason),
        };

        let mut first_year = None;
        let mut values = Vec::new();
        for (number, line) in input.lines().enumerate() {
            let content = line.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }
            let mut fields = content.split_whitespace();
            let (Some(year), Some(value), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(parse_error(number, format!("expected 'year value', got '{content}'")));
            };
            let year: i32 = year
                .parse()
                .map_err(|_| parse_error(number, format!("invalid year '{year}'")))?;
            let value: FloatValue = value
                .parse()
                .map_err(|_| parse_error(number, format!("invalid concentration '{value}'")))?;

            let expected = *first_year.get_or_insert(year) + values.len() as i32;
            if year != expected {
                return Err(parse_error(number, format!("expected year {expected}, got {year}")));
            }
            values.push(value);
        }

        Self::new(first_year.unwrap_or_default(), values)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> ForcingResult<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Use `value` for years before the record instead of its first value
    pub fn with_spinup_value(mut self, value: FloatValue) -> Self {
        self.spinup_value = value;
        self
    }

    pub fn first_year(&self) -> i32 {
        self.first_year
    }

    pub fn last_year(&self) -> i32 {
        self.first_year + self.values.len() as i32 - 1
    }

    pub fn spinup_value(&self) -> FloatValue {
        self.spinup_value
    }

    /// Concentration in `calendar_year`
    pub fn value(&self, calendar_year: i32) -> FloatValue {
        if calendar_year < self.first_year {
            return self.spinup_value;
        }
        let index = (calendar_year - self.first_year) as usize;
        match self.values.get(index) {
            Some(value) => *value,
            None => *self.values.last().unwrap_or(&self.spinup_value),
        }
    }

    /// Warn once the simulation runs past the end of the record
    pub(crate) fn check_coverage(&self, calendar_year: i32) {
        if calendar_year == self.last_year() + 1 && self.values.len() > 1 {
            warn!(
                "CO2 record ends in {}; holding {} ppm",
                self.last_year(),
                self.value(self.last_year())
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = "
# year ppm
1901 296.1
1902 296.5   # trailing comment

1903 296.8
";

    #[test]
    fn parse_and_lookup() {
        let record = Co2Record::parse(RECORD).unwrap();
        assert_eq!(record.first_year(), 1901);
        assert_eq!(record.last_year(), 1903);
        assert_eq!(record.value(1902), 296.5);
        assert_eq!(record.value(1850), 296.1);
        assert_eq!(record.value(2020), 296.8);

        let record = record.with_spinup_value(280.0);
        assert_eq!(record.value(1850), 280.0);
        assert_eq!(record.value(1901), 296.1);
    }

    #[test]
    fn constant_record() {
        let record = Co2Record::constant(350.0).unwrap();
        assert_eq!(record.value(-21000), 350.0);
        assert_eq!(record.value(2100), 350.0);
    }

    #[test]
    fn malformed_records() {
        assert!(Co2Record::parse("").is_err());
        assert!(Co2Record::parse("1901 abc").is_err());
        assert!(Co2Record::parse("1901").is_err());
        assert!(Co2Record::parse("1901 296.1\n1903 297.0").is_err());
        assert!(Co2Record::parse("1901 -5.0").is_err());
    }
}
