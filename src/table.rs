use ganglioside::CompoundRecord;
use itertools::{Itertools, izip};
use miette::Diagnostic;
use polars::prelude::*;
use thiserror::Error;

use crate::AnalysisResult;

// Constants ===========================================================================================================

struct InputColumns;
impl InputColumns {
    const REQUIRED: [&str; 5] = [
        Self::NAME,
        Self::RT,
        Self::VOLUME,
        Self::LOG_P,
        Self::ANCHOR,
    ];
    const NAME: &str = "Name";
    const RT: &str = "RT";
    const VOLUME: &str = "Volume";
    const LOG_P: &str = "Log P";
    const ANCHOR: &str = "Anchor";
}

struct OutputColumns;
impl OutputColumns {
    const NAME: &str = "Name";
    const SERIES_PREFIX: &str = "Series Prefix";
    const SUFFIX_KEY: &str = "Lipid Chain";
    const RT: &str = "RT";
    const VOLUME: &str = "Volume";
    const LOG_P: &str = "Log P";
    const ANCHOR: &str = "Anchor";
    const PREDICTED_RT: &str = "Predicted RT";
    const RESIDUAL: &str = "Residual";
    const STANDARDIZED_RESIDUAL: &str = "Standardized Residual";
    const RETENTION_OUTCOME: &str = "Retention Outcome";
    const REGRESSION_SCOPE: &str = "Regression Scope";
    const SUGAR_COUNT: &str = "Sugar Count";
    const ISOMER: &str = "Isomer";
    const OACETYL_STATUS: &str = "O-Acetylation";
    const OACETYL_BASE: &str = "O-Acetylation Base";
    const RT_INCREASE: &str = "RT Increase";
    const FRAGMENTATION_ROLE: &str = "Fragmentation Role";
    const CONSOLIDATED_VOLUME: &str = "Consolidated Volume";
    const MERGED_FRAGMENTS: &str = "Merged Fragments";
    const STATUS: &str = "Status";
    const OUTLIER: &str = "Outlier";
    const OUTLIER_REASON: &str = "Outlier Reason";
}

const TRUTHY_FLAGS: [&str; 4] = ["t", "true", "y", "yes"];

#[derive(Debug, Diagnostic, Error)]
pub enum SchemaError {
    #[diagnostic(help("every input table needs the columns: Name, RT, Volume, Log P, and Anchor"))]
    #[error("the input table is missing the required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("column {column:?} has type {dtype}, which can't be read as {expected}")]
    UnreadableColumn {
        column: String,
        dtype: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

// Public API ==========================================================================================================

/// Reads one `CompoundRecord` per row of `df`
///
/// Missing or non-finite `RT` and `Log P` values are kept as `None`, a missing `Volume` counts as zero, and a missing
/// `Anchor` flag counts as `false`. Anchor flags may be booleans, numbers (non-zero is true), or text (`T`, `True`, `Y`,
/// `Yes`, or `1`).
///
/// # Errors
///
/// Fails with every missing column at once, or if a column can't be interpreted as the type it should hold
pub fn records_from_dataframe(df: &DataFrame) -> Result<Vec<CompoundRecord>, SchemaError> {
    let missing: Vec<_> = InputColumns::REQUIRED
        .into_iter()
        .filter(|&column| df.column(column).is_err())
        .map(str::to_owned)
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns(missing));
    }

    let names = text_column(df, InputColumns::NAME)?;
    let retention_times = float_column(df, InputColumns::RT)?;
    let volumes = float_column(df, InputColumns::VOLUME)?;
    let log_ps = float_column(df, InputColumns::LOG_P)?;
    let anchors = flag_column(df, InputColumns::ANCHOR)?;

    Ok(izip!(names, retention_times, volumes, log_ps, anchors)
        .map(
            |(name, retention_time, volume, log_p, is_anchor)| CompoundRecord {
                name: name.unwrap_or_default(),
                retention_time,
                volume: volume.unwrap_or_default(),
                log_p,
                is_anchor: is_anchor.unwrap_or_default(),
            },
        )
        .collect())
}

/// One row per retained compound, with a column for every part of its verdict
///
/// # Errors
///
/// Only fails if polars can't assemble the columns into a frame
pub fn result_to_dataframe(result: &AnalysisResult) -> PolarsResult<DataFrame> {
    let verdicts = &result.compounds;
    let labels = |label: fn(&crate::ClassificationVerdict) -> String| -> Vec<String> {
        verdicts.iter().map(label).collect()
    };

    df!(
        OutputColumns::NAME => labels(|v| v.name.clone()),
        OutputColumns::SERIES_PREFIX => labels(|v| v.series_prefix.clone()),
        OutputColumns::SUFFIX_KEY => verdicts.iter().map(|v| v.suffix_key.clone()).collect::<Vec<_>>(),
        OutputColumns::RT => verdicts.iter().map(|v| v.retention_time).collect::<Vec<_>>(),
        OutputColumns::VOLUME => verdicts.iter().map(|v| v.volume).collect::<Vec<_>>(),
        OutputColumns::LOG_P => verdicts.iter().map(|v| v.log_p).collect::<Vec<_>>(),
        OutputColumns::ANCHOR => verdicts.iter().map(|v| v.is_anchor).collect::<Vec<_>>(),
        OutputColumns::PREDICTED_RT => verdicts.iter().map(|v| v.predicted_rt).collect::<Vec<_>>(),
        OutputColumns::RESIDUAL => verdicts.iter().map(|v| v.residual).collect::<Vec<_>>(),
        OutputColumns::STANDARDIZED_RESIDUAL => verdicts.iter().map(|v| v.standardized_residual).collect::<Vec<_>>(),
        OutputColumns::RETENTION_OUTCOME => labels(|v| v.retention_outcome.to_string()),
        OutputColumns::REGRESSION_SCOPE => verdicts.iter().map(|v| v.regression_scope.map(|s| s.to_string())).collect::<Vec<_>>(),
        OutputColumns::SUGAR_COUNT => verdicts.iter().map(|v| v.sugar_count).collect::<Vec<_>>(),
        OutputColumns::ISOMER => verdicts.iter().map(|v| v.isomer_label.clone()).collect::<Vec<_>>(),
        OutputColumns::OACETYL_STATUS => labels(|v| v.oacetyl_status.to_string()),
        OutputColumns::OACETYL_BASE => verdicts.iter().map(|v| v.oacetyl_base.clone()).collect::<Vec<_>>(),
        OutputColumns::RT_INCREASE => verdicts.iter().map(|v| v.rt_increase).collect::<Vec<_>>(),
        OutputColumns::FRAGMENTATION_ROLE => labels(|v| v.fragmentation_role.to_string()),
        OutputColumns::CONSOLIDATED_VOLUME => verdicts.iter().map(|v| v.consolidated_volume).collect::<Vec<_>>(),
        OutputColumns::MERGED_FRAGMENTS => labels(|v| v.merged_fragments.iter().join("; ")),
        OutputColumns::STATUS => labels(|v| v.status.to_string()),
        OutputColumns::OUTLIER => verdicts.iter().map(|v| v.is_outlier).collect::<Vec<_>>(),
        OutputColumns::OUTLIER_REASON => verdicts.iter().map(|v| v.outlier_reason.clone()).collect::<Vec<_>>(),
    )
}

// Private Functions ===================================================================================================

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, SchemaError> {
    let series = df.column(name)?.as_materialized_series();
    let text = series
        .cast(&DataType::String)
        .map_err(|_| unreadable(name, series, "text"))?;
    Ok(text.str()?.into_iter().map(|s| s.map(str::to_owned)).collect())
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, SchemaError> {
    let series = df.column(name)?.as_materialized_series();
    let floats = series
        .cast(&DataType::Float64)
        .map_err(|_| unreadable(name, series, "numbers"))?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|x| x.filter(|x| x.is_finite()))
        .collect())
}

fn flag_column(df: &DataFrame, name: &str) -> Result<Vec<Option<bool>>, SchemaError> {
    let series = df.column(name)?.as_materialized_series();
    if series.dtype() == &DataType::Boolean {
        return Ok(series.bool()?.into_iter().collect());
    }

    let text = series
        .cast(&DataType::String)
        .map_err(|_| unreadable(name, series, "true / false flags"))?;
    Ok(text.str()?.into_iter().map(|s| s.map(parse_flag)).collect())
}

// ---------------------------------------------------------------------------------------------------------------------

fn parse_flag(text: &str) -> bool {
    let text = text.trim().to_ascii_lowercase();
    TRUTHY_FLAGS.contains(&text.as_str()) || text.parse::<f64>().is_ok_and(|x| x != 0.0)
}

fn unreadable(column: &str, series: &Series, expected: &'static str) -> SchemaError {
    SchemaError::UnreadableColumn {
        column: column.to_owned(),
        dtype: series.dtype().to_string(),
        expected,
    }
}

// Unit Tests ==========================================================================================================

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use indoc::indoc;
    use insta::assert_snapshot;

    use super::*;
    use crate::{AnalysisConfig, analyze};

    fn read_csv(csv: &str) -> DataFrame {
        CsvReader::new(Cursor::new(csv)).finish().unwrap()
    }

    #[test]
    fn reads_records() {
        let df = read_csv(indoc! {"
            Name,RT,Volume,Log P,Anchor
            GM1(36:1;O2),8.70,1200000,1.5,T
            GD1+OAc(36:1;O2),,300000,1.2,F
            GT1(36:1;O2),9.10,,,yes
        "});
        let records = records_from_dataframe(&df).unwrap();

        assert_eq!(records[0], CompoundRecord::new("GM1(36:1;O2)", 8.70, 1_200_000.0, 1.5, true));
        assert_eq!(records[1].retention_time, None);
        assert!(!records[1].is_anchor);
        assert_eq!(records[2].volume, 0.0);
        assert_eq!(records[2].log_p, None);
        assert!(records[2].is_anchor);
    }

    #[test]
    fn anchor_flags() {
        // Text
        for (flag, expected) in [
            ("T", true),
            ("True", true),
            ("y", true),
            ("Yes", true),
            ("1", true),
            ("F", false),
            ("no", false),
            ("0", false),
            ("", false),
        ] {
            assert_eq!(parse_flag(flag), expected, "{flag:?}");
        }

        // Booleans and numbers
        let df = df!(
            "Name" => ["GM1(36:1;O2)", "GD1(36:1;O2)"],
            "RT" => [8.7, 8.9],
            "Volume" => [1.0, 1.0],
            "Log P" => [1.0, 1.0],
            "Anchor" => [true, false],
        )
        .unwrap();
        let anchors: Vec<_> = records_from_dataframe(&df)
            .unwrap()
            .into_iter()
            .map(|r| r.is_anchor)
            .collect();
        assert_eq!(anchors, [true, false]);

        let df = df!(
            "Name" => ["GM1(36:1;O2)", "GD1(36:1;O2)"],
            "RT" => [8.7, 8.9],
            "Volume" => [1.0, 1.0],
            "Log P" => [1.0, 1.0],
            "Anchor" => [0, 2],
        )
        .unwrap();
        let anchors: Vec<_> = records_from_dataframe(&df)
            .unwrap()
            .into_iter()
            .map(|r| r.is_anchor)
            .collect();
        assert_eq!(anchors, [false, true]);
    }

    #[test]
    fn missing_columns_are_listed_together() {
        let df = read_csv(indoc! {"
            Name,Volume,Anchor
            GM1(36:1;O2),1200000,T
        "});
        let error = records_from_dataframe(&df).unwrap_err();
        assert_snapshot!(error, @"the input table is missing the required column(s): RT, Log P");
    }

    #[test]
    fn results_become_tables() {
        let df = read_csv(indoc! {"
            Name,RT,Volume,Log P,Anchor
            GT1(36:1;O2),8.70,1200000,1.0,F
            GM1(36:1;O2),8.71,200000,1.0,F
            GD1(36:1;O2),8.72,300000,1.0,F
            GD1+OAc(38:1;O2),9.30,100000,1.2,F
        "});
        let records = records_from_dataframe(&df).unwrap();
        let result = analyze(records, &AnalysisConfig::default()).unwrap();
        let table = result_to_dataframe(&result).unwrap();

        assert_eq!(table.height(), 2);
        assert_eq!(table.width(), 23);
        let column = |name| table.column(name).unwrap().as_materialized_series().clone();
        let text = |name| {
            column(name)
                .str()
                .unwrap()
                .into_iter()
                .map(|s| s.map(str::to_owned))
                .collect::<Vec<_>>()
        };
        assert_eq!(text("Fragmentation Role"), [Some("parent".to_owned()), Some("unclustered".to_owned())]);
        assert_eq!(text("Merged Fragments")[0].as_deref(), Some("GM1(36:1;O2); GD1(36:1;O2)"));
        assert_eq!(text("O-Acetylation")[1].as_deref(), Some("not_validated"));
        assert_eq!(text("Status")[0].as_deref(), Some("undetermined"));
        assert_eq!(
            column("Consolidated Volume").f64().unwrap().get(0),
            Some(1_700_000.0)
        );
    }
}
