//! Command implementations.

use std::fmt::Write as _;
use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::debug;

use telarch_common::config::ArchiveConfig;
use telarch_common::types::TimeInterval;
use telarch_sql::histogram::HistogramInterval;
use telarch_sql::schema::TupleSchema;
use telarch_sql::storage::{InsertMode, StorageEngine, TableDefinition};
use telarch_sql::tuple::Tuple;
use telarch_sql::types::{DataType, Value};

const TABLE: &str = "samples";
const TIME_COLUMN: &str = "gentime";

/// A `VALUE@TIME` seek position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeekTarget {
    pub value: String,
    pub time: i64,
}

impl SeekTarget {
    pub fn new(value: impl Into<String>, time: i64) -> Self {
        Self {
            value: value.into(),
            time,
        }
    }
}

impl FromStr for SeekTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, time) = s
            .rsplit_once('@')
            .ok_or_else(|| format!("expected VALUE@TIME, got {s:?}"))?;
        let time = time
            .trim()
            .parse()
            .map_err(|e| format!("invalid seek time {time:?}: {e}"))?;
        Ok(Self::new(value, time))
    }
}

/// What to print from the histogram.
#[derive(Debug, Clone)]
pub struct HistogramRequest {
    pub column: String,
    pub seek: Option<SeekTarget>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl HistogramRequest {
    fn time_interval(&self) -> TimeInterval {
        match (self.start, self.end) {
            (Some(start), Some(end)) => TimeInterval::new(start, end),
            (Some(start), None) => TimeInterval::starting_at(start),
            (None, Some(end)) => TimeInterval::ending_at(end),
            (None, None) => TimeInterval::unbounded(),
        }
    }
}

/// Parses one `time,value` line. Blank lines and `#` comments yield `None`.
pub fn parse_sample(line: &str) -> Result<Option<(i64, String)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let Some((time, value)) = line.split_once(',') else {
        bail!("expected time,value");
    };
    let time = time
        .trim()
        .parse()
        .with_context(|| format!("invalid time {:?}", time.trim()))?;
    let value = value.trim();
    if value.is_empty() {
        bail!("empty value");
    }
    Ok(Some((time, value.to_string())))
}

/// Ingests the samples of `input` into an in-memory archive and returns the
/// histogram intervals selected by `request`.
pub fn histogram(
    input: impl BufRead,
    config: ArchiveConfig,
    request: &HistogramRequest,
) -> Result<Vec<HistogramInterval>> {
    let engine = StorageEngine::in_memory(config)?;
    let schema = TupleSchema::empty()
        .with_column(TIME_COLUMN, DataType::Timestamp)?
        .with_column(request.column.as_str(), DataType::String)?;
    let table = engine.create_table(
        TableDefinition::new(TABLE, schema, TIME_COLUMN)
            .with_primary_key([TIME_COLUMN, request.column.as_str()])
            .with_histogram(request.column.as_str()),
    )?;

    let mut writer = engine.open_table_writer(TABLE, InsertMode::Upsert)?;
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        let Some((time, value)) =
            parse_sample(&line).with_context(|| format!("line {}", i + 1))?
        else {
            continue;
        };
        let tuple = Tuple::new(
            Arc::clone(table.schema()),
            vec![Value::Timestamp(time), Value::string(value)],
        )?;
        writer.write(&tuple)?;
    }
    writer.close()?;
    debug!(samples = writer.written(), "ingested samples");

    let mut iter =
        engine.get_histogram_iterator(TABLE, &request.column, request.time_interval())?;
    if let Some(seek) = &request.seek {
        iter.seek(&Value::string(seek.value.as_str()), seek.time)?;
    }
    Ok(iter.collect::<Result<Vec<_>, _>>()?)
}

/// Formats intervals as tab-separated lines under a header.
pub fn format_intervals(column: &str, intervals: &[HistogramInterval]) -> String {
    let mut out = format!("{column}\tstart\tstop\tcount\n");
    for interval in intervals {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            interval.value(),
            interval.start(),
            interval.stop(),
            interval.count()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HistogramRequest {
        HistogramRequest {
            column: "value".to_string(),
            seek: None,
            start: None,
            end: None,
        }
    }

    const SAMPLES: &str = "\
# time,value
1000,p1
2000,p1
40000,p1

40001, p1
100000000000,p1
1500,p2
";

    fn spans(intervals: &[HistogramInterval]) -> Vec<(String, i64, i64)> {
        intervals
            .iter()
            .map(|i| (i.value().to_string(), i.start(), i.stop()))
            .collect()
    }

    #[test]
    fn test_parse_sample() {
        assert_eq!(parse_sample(" 5, x ").unwrap(), Some((5, "x".to_string())));
        assert_eq!(parse_sample("# comment").unwrap(), None);
        assert_eq!(parse_sample("").unwrap(), None);
        assert!(parse_sample("5").is_err());
        assert!(parse_sample("x,y").is_err());
        assert!(parse_sample("5,").is_err());
    }

    #[test]
    fn test_parse_seek_target() {
        assert_eq!("p1@2000".parse::<SeekTarget>(), Ok(SeekTarget::new("p1", 2000)));
        assert_eq!("a@b@-1".parse::<SeekTarget>(), Ok(SeekTarget::new("a@b", -1)));
        assert!("p1".parse::<SeekTarget>().is_err());
        assert!("p1@x".parse::<SeekTarget>().is_err());
    }

    #[test]
    fn test_histogram() {
        let intervals = histogram(SAMPLES.as_bytes(), ArchiveConfig::default(), &request()).unwrap();
        assert_eq!(
            spans(&intervals),
            vec![
                ("p1".to_string(), 1000, 2000),
                ("p1".to_string(), 40_000, 40_001),
                ("p1".to_string(), 100_000_000_000, 100_000_000_000),
                ("p2".to_string(), 1500, 1500),
            ]
        );
    }

    #[test]
    fn test_histogram_seek_and_gap() {
        let mut req = request();
        req.seek = Some(SeekTarget::new("p1", 2000));
        let intervals = histogram(SAMPLES.as_bytes(), ArchiveConfig::default(), &req).unwrap();
        assert_eq!(intervals.len(), 3);
        assert_eq!(intervals[0].start(), 40_000);

        let wide = ArchiveConfig::with_merge_gap(50_000);
        let intervals = histogram(SAMPLES.as_bytes(), wide, &request()).unwrap();
        assert_eq!(intervals[0].count(), 4);
    }

    #[test]
    fn test_histogram_reports_bad_lines() {
        let err = histogram("1000,p1\nbad\n".as_bytes(), ArchiveConfig::default(), &request())
            .unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_format_intervals() {
        let intervals = vec![HistogramInterval::new(Value::string("p1"), 1, 2, 3)];
        assert_eq!(
            format_intervals("name", &intervals),
            "name\tstart\tstop\tcount\np1\t1\t2\t3\n"
        );
    }
}
