use crate::error::{PipelineError, PipelineResult};
use crate::models::{Config, DataSourceMode};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Reads the whole input before any processing starts.
pub async fn load_input(config: &Config) -> PipelineResult<String> {
    match config.data_source_mode {
        DataSourceMode::Local => {
            let path = config.input_file.as_deref().unwrap_or("data.csv");
            read_file(Path::new(path))
        }
        DataSourceMode::Internet => {
            let url = config
                .input_url
                .as_deref()
                .ok_or(PipelineError::MissingInputUrl)?;
            download(url).await
        }
    }
}

pub fn read_file(path: &Path) -> PipelineResult<String> {
    info!("📂 reading input from {}", path.display());
    fs::read_to_string(path).map_err(|source| PipelineError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn download(url: &str) -> PipelineResult<String> {
    info!("🌐 fetching input from {}", url);
    let download_error = |source: reqwest::Error| PipelineError::Download {
        url: url.to_string(),
        source,
    };

    let response = reqwest::Client::new()
        .get(url)
        .timeout(Duration::from_secs(60))
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(download_error)?;

    response.text().await.map_err(download_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_input_is_read_whole() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("data.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();

        let config = Config {
            input_file: Some(path.to_string_lossy().into_owned()),
            ..Config::default()
        };
        assert_eq!(load_input(&config).await.unwrap(), "a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let config = Config {
            input_file: Some("/definitely/not/here.csv".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            load_input(&config).await,
            Err(PipelineError::InputUnreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_internet_mode_needs_url() {
        let config = Config {
            data_source_mode: DataSourceMode::Internet,
            input_url: None,
            ..Config::default()
        };
        assert!(matches!(
            load_input(&config).await,
            Err(PipelineError::MissingInputUrl)
        ));
    }
}
