// src/pipeline.rs

use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::error::Result;
use crate::features::{self, FeatureReport};
use crate::ingest::{self, IngestReport};
use crate::session::Session;

/// What a full run did, stage by stage.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub ingest: IngestReport,
    pub features: FeatureReport,
    pub elapsed_ms: u128,
}

/// Run ingest, then feature derivation. The second stage only starts once
/// the staging table is fully written, and reads it back from disk.
///
/// The first failure stops the run; an ingest failure leaves both tables
/// untouched.
#[tracing::instrument(level = "info", skip_all)]
pub async fn run(session: &Session) -> Result<RunSummary> {
    let start = Instant::now();
    let ingest = ingest::run(session).await?;
    let features = features::run(session).await?;

    let summary = RunSummary {
        ingest,
        features,
        elapsed_ms: start.elapsed().as_millis(),
    };
    info!(
        rows = summary.features.written.rows,
        elapsed_ms = summary.elapsed_ms as u64,
        "pipeline complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use arrow::array::{Array, AsArray};
    use arrow::datatypes::{Int32Type, Int64Type};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    use crate::config::PipelineConfig;
    use crate::error::PipelineError;
    use crate::table::read_table;

    const HEADER: &str = "VendorID,lpep_pickup_datetime,Lpep_dropoff_datetime,Store_and_fwd_flag,RateCodeID,Pickup_longitude,Pickup_latitude,Dropoff_longitude,Dropoff_latitude,Passenger_count,Trip_distance,Fare_amount,Extra,MTA_tax,Tip_amount,Tolls_amount,Ehail_fee,Total_amount,Payment_type,Trip_type ";
    // Sunday 2013-09-01, 52m51s, from Harlem
    const ROW_20: &str = "2,2013-09-01 00:02:00,2013-09-01 00:54:51,N,1,-73.952407836914062,40.810726165771484,-73.983940124511719,40.676284790039063,5,14.35,50.5,0.5,0.5,10.3,0,,61.8,1,1";
    // Monday 2013-09-02 17:15, 30 minutes, from inside the JFK box
    const ROW_21: &str = "2,2013-09-02 17:15:00,2013-09-02 17:45:00,N,1,-73.78,40.64,-73.96,40.68,1,15.2,52,0,0.5,0,5.33,,57.83,2,1,ZZ-ARTIFACT-ZZ";

    fn write_source(dir: &Path, body: &str) -> Result<std::path::PathBuf> {
        let path = dir.join("trips.csv");
        fs::write(&path, body)?;
        Ok(path)
    }

    fn session_for(source: &Path, out: &Path) -> Result<Session> {
        let cfg = PipelineConfig {
            threads: Some(2),
            ..PipelineConfig::local(source, out)
        };
        Ok(Session::start(cfg)?)
    }

    #[tokio::test]
    async fn test_run_end_to_end() -> Result<()> {
        crate::test_util::init_test_logging();
        let dir = tempdir()?;
        let source = write_source(dir.path(), &format!("{}\n{}\n{}\n", HEADER, ROW_20, ROW_21))?;
        let session = session_for(&source, &dir.path().join("out"))?;

        let summary = run(&session).await?;
        assert_eq!(summary.ingest.written.rows, 2);
        assert_eq!(summary.features.written.rows, 2);
        assert_eq!(summary.features.stats.jfk_pickups, 1);

        let staged = read_table(&session.config().staging_dir)?.concat()?;
        assert_eq!(staged.num_columns(), 20);

        let enriched = read_table(&session.config().enriched_dir)?.concat()?;
        assert_eq!(enriched.num_columns(), 53);
        let schema = enriched.schema();
        let col = |name: &str| -> Result<usize> { Ok(schema.index_of(name)?) };

        let hour_0 = enriched.column(col("pickup_hour_0")?).as_primitive::<Int32Type>();
        let hour_17 = enriched.column(col("pickup_hour_17")?).as_primitive::<Int32Type>();
        assert_eq!(hour_0.values().to_vec(), vec![1, 0]);
        assert_eq!(hour_17.values().to_vec(), vec![0, 1]);

        let monday = enriched.column(col("pickup_dow_0")?).as_primitive::<Int32Type>();
        let sunday = enriched.column(col("pickup_dow_6")?).as_primitive::<Int32Type>();
        assert_eq!(monday.values().to_vec(), vec![0, 1]);
        assert_eq!(sunday.values().to_vec(), vec![1, 0]);

        let duration = enriched
            .column(col("duration_in_second")?)
            .as_primitive::<Int64Type>();
        assert_eq!(duration.value(0), 3171);
        assert_eq!(duration.value(1), 1800);

        let jfk = enriched
            .column(col("pickup_from_jfk_airport")?)
            .as_primitive::<Int32Type>();
        assert_eq!(jfk.values().to_vec(), vec![0, 1]);

        for column in enriched.columns() {
            if let Some(strings) = column.as_string_opt::<i32>() {
                assert!(strings.iter().flatten().all(|s| !s.contains("ARTIFACT")));
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_rerun_overwrites_with_identical_tables() -> Result<()> {
        let dir = tempdir()?;
        let source = write_source(dir.path(), &format!("{}\n{}\n{}\n", HEADER, ROW_20, ROW_21))?;
        let session = session_for(&source, &dir.path().join("out"))?;

        run(&session).await?;
        let first = read_table(&session.config().enriched_dir)?.concat()?;
        run(&session).await?;
        let second = read_table(&session.config().enriched_dir)?.concat()?;

        assert_eq!(first, second);
        assert_eq!(second.num_rows(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_features_without_staging_table() -> Result<()> {
        let dir = tempdir()?;
        let session = session_for(&dir.path().join("unused.csv"), &dir.path().join("out"))?;

        let err = features::run(&session).await.unwrap_err();
        assert!(
            matches!(err, PipelineError::StageInputMissing { .. }),
            "got {:?}",
            err
        );
        assert!(!session.config().enriched_dir.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_source_writes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("out");
        let session = session_for(&dir.path().join("absent.csv"), &out)?;

        let err = run(&session).await.unwrap_err();
        assert_eq!(err.kind(), "source_unavailable");
        assert!(!session.config().staging_dir.exists());
        assert!(!session.config().enriched_dir.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_ingest_keeps_previous_tables() -> Result<()> {
        let dir = tempdir()?;
        let source = write_source(dir.path(), &format!("{}\n{}\n", HEADER, ROW_20))?;
        let session = session_for(&source, &dir.path().join("out"))?;
        run(&session).await?;

        fs::remove_file(&source)?;
        assert!(run(&session).await.is_err());

        let enriched = read_table(&session.config().enriched_dir)?;
        assert_eq!(enriched.num_rows(), 1);
        assert!(enriched.concat()?.column(0).null_count() == 0);
        Ok(())
    }
}
