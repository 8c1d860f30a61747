//! Publishing a year's forecast as a static JSON document.

use std::io::Write;

use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::info;

use crate::pipeline::{FittedPipeline, StatePrediction, predict_by_year};

/// The document served to static clients, one per forecast year.
#[derive(Debug, Serialize)]
pub struct PublishedForecast {
    pub generated_at: DateTime<Utc>,
    pub year: i32,
    pub common_incidents: Vec<String>,
    pub predictions: Vec<StatePrediction>,
}

impl PublishedForecast {
    pub fn generate(pipeline: &FittedPipeline, year: i32) -> Result<Self> {
        Ok(Self {
            generated_at: Utc::now(),
            year,
            common_incidents: pipeline.common_incidents().to_vec(),
            predictions: predict_by_year(pipeline, year)?,
        })
    }
}

/// Object key for a year's forecast, e.g. `predictions/year=2030.json.gz`.
pub fn object_key(year: i32, gzip: bool) -> String {
    if gzip {
        format!("predictions/year={year}.json.gz")
    } else {
        format!("predictions/year={year}.json")
    }
}

/// Gzip-compresses a byte buffer.
pub fn gzip_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Serializes the forecast to JSON and uploads it to an S3 bucket with
/// `application/json` content type, optionally gzip-compressed.
#[tracing::instrument(skip(client, forecast), fields(year = forecast.year))]
pub async fn upload_forecast(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    forecast: &PublishedForecast,
    gzip: bool,
) -> Result<String> {
    let json = serde_json::to_vec(forecast)?;
    let key = object_key(forecast.year, gzip);

    let mut request = client
        .put_object()
        .bucket(bucket)
        .key(&key)
        .content_type("application/json");
    let body = if gzip {
        request = request.content_encoding("gzip");
        gzip_bytes(&json)?
    } else {
        json
    };

    request.body(ByteStream::from(body)).send().await?;

    info!(bucket, key = %key, "Forecast uploaded");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_object_key() {
        assert_eq!(object_key(2030, false), "predictions/year=2030.json");
        assert_eq!(object_key(2030, true), "predictions/year=2030.json.gz");
    }

    #[test]
    fn test_gzip_bytes_decompresses() {
        let original = br#"[{"state":"AL"}]"#;
        let compressed = gzip_bytes(original).unwrap();

        let mut decoded = Vec::new();
        GzDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_forecast_serializes_fields() {
        let forecast = PublishedForecast {
            generated_at: Utc::now(),
            year: 2031,
            common_incidents: vec!["Flood".to_string()],
            predictions: vec![],
        };
        let value = serde_json::to_value(&forecast).unwrap();
        assert_eq!(value["year"], 2031);
        assert_eq!(value["common_incidents"][0], "Flood");
        assert!(value["generated_at"].is_string());
    }
}
