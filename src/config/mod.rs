pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::SourceSelection;
use clap::{Parser, ValueEnum};
use toml_config::{Settings, DEFAULT_CONFIG_PATH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceMode {
    /// Download a random spectrum from the SDSS archive
    Remote,
    /// Read a FITS file from the input directory
    Local,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "stellar-classifier")]
#[command(about = "Classify a stellar spectrum into O/B/A/F/G/K/M")]
pub struct CliConfig {
    /// Spectrum source; prompts interactively when omitted
    #[arg(long, value_enum)]
    pub source: Option<SourceMode>,

    /// Base name of the FITS file (without extension) for local mode
    #[arg(long)]
    pub file: Option<String>,

    /// Path to the TOML settings file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override the results directory
    #[arg(long)]
    pub output: Option<String>,

    /// Override the classifier random seed
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 命令列參數覆蓋設定檔
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(output) = &self.output {
            settings.output.directory = output.clone();
        }
        if let Some(seed) = self.seed {
            settings.classifier.seed = seed;
        }
    }
}

/// 一次執行所需的全部設定
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub selection: SourceSelection,
    pub settings: Settings,
}

impl RunConfig {
    pub fn new(selection: SourceSelection, settings: Settings) -> Self {
        Self {
            selection,
            settings,
        }
    }
}

impl ConfigProvider for RunConfig {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn selection(&self) -> &SourceSelection {
        &self.selection
    }

    fn output_path(&self) -> &str {
        &self.settings.output.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = CliConfig::parse_from([
            "stellar-classifier",
            "--source",
            "local",
            "--file",
            "hd1234",
            "--output",
            "/tmp/out",
            "--seed",
            "7",
        ]);
        assert_eq!(cli.source, Some(SourceMode::Local));
        assert_eq!(cli.file.as_deref(), Some("hd1234"));
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);

        let mut settings = Settings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.output.directory, "/tmp/out");
        assert_eq!(settings.classifier.seed, 7);
    }
}
