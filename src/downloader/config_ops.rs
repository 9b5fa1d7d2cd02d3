//! Runtime configuration updates: concurrency budget and default quality.

use crate::config::{Config, ConfigUpdate};
use crate::error::{Error, Result};
use crate::queue::Intent;
use crate::types::Quality;

use super::TubeDownloader;

impl TubeDownloader {
    /// Current concurrency budget
    pub fn concurrency(&self) -> usize {
        self.queue_state.store.snapshot().budget
    }

    /// Change the concurrency budget
    ///
    /// Raising it admits queued tasks right away. Lowering it never stops
    /// in-flight tasks; admissions resume once enough of them finish.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `budget` is zero.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use offlinetube::{TubeDownloader, Config};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let downloader = TubeDownloader::new(Config::default()).await?;
    /// downloader.set_concurrency(4)?;
    /// assert_eq!(downloader.concurrency(), 4);
    /// # Ok(())
    /// # }
    /// ```
    pub fn set_concurrency(&self, budget: usize) -> Result<()> {
        if budget == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        self.queue_state.store.dispatch(Intent::SetBudget(budget));
        tracing::info!(budget, "Concurrency budget updated");
        Ok(())
    }

    /// Quality applied to selections that name none
    pub async fn default_quality(&self) -> Quality {
        self.runtime_config.default_quality.read().await.clone()
    }

    /// Change the default quality for future enqueues
    ///
    /// Tasks already in the queue keep the quality they were created with.
    pub async fn set_default_quality(&self, quality: Quality) -> Result<()> {
        if quality.as_str().trim().is_empty() {
            return Err(Error::Config {
                message: "default_quality must not be empty".to_string(),
                key: Some("default_quality".to_string()),
            });
        }
        tracing::info!(quality = %quality, "Default quality updated");
        *self.runtime_config.default_quality.write().await = quality;
        Ok(())
    }

    /// Apply a partial runtime update, returning the effective configuration
    ///
    /// Every field is validated before any is applied.
    pub async fn update_config(&self, update: ConfigUpdate) -> Result<Config> {
        if update.max_concurrent_downloads == Some(0) {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        if let Some(quality) = &update.default_quality
            && quality.as_str().trim().is_empty()
        {
            return Err(Error::Config {
                message: "default_quality must not be empty".to_string(),
                key: Some("default_quality".to_string()),
            });
        }

        if let Some(budget) = update.max_concurrent_downloads {
            self.set_concurrency(budget)?;
        }
        if let Some(quality) = update.default_quality {
            self.set_default_quality(quality).await?;
        }
        Ok(self.current_config().await)
    }

    /// Startup configuration with runtime changes applied
    pub async fn current_config(&self) -> Config {
        let mut config = Config::clone(&self.config);
        config.download.max_concurrent_downloads = self.concurrency();
        config.download.default_quality = self.default_quality().await;
        config
    }
}
