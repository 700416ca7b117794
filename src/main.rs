use clap::Parser;
use std::path::Path;
use stellar_classifier::config::toml_config::Settings;
use stellar_classifier::core::ConfigProvider;
use stellar_classifier::domain::model::SourceSelection;
use stellar_classifier::utils::error::{ClassifierError, ErrorSeverity};
use stellar_classifier::utils::{logger, validation::Validate};
use stellar_classifier::{
    resolve_input_file, ClassificationEngine, CliConfig, LocalStorage, Prompt, RunConfig,
    SourceMode, StellarPipeline,
};

/// 根據錯誤嚴重程度決定退出碼
fn exit_code(e: &ClassifierError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,      // 使用者中止
        ErrorSeverity::Medium => 2,   // 網路錯誤
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統/設定錯誤
    }
}

fn fail(e: &ClassifierError) -> ! {
    tracing::error!(
        "❌ Classification failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(exit_code(e));
}

fn select_source(cli: &CliConfig, settings: &Settings) -> stellar_classifier::Result<SourceSelection> {
    let input_dir = Path::new(&settings.source.input_dir);
    let extensions = &settings.source.extensions;
    let stdin = std::io::stdin();
    let mut prompt = Prompt::new(stdin.lock(), std::io::stdout());

    // 只給 --file 時視為本地模式
    let mode = cli
        .source
        .or_else(|| cli.file.as_ref().map(|_| SourceMode::Local));

    match mode {
        Some(SourceMode::Remote) => Ok(SourceSelection::Remote),
        Some(SourceMode::Local) => {
            if let Some(name) = &cli.file {
                if let Some(path) = resolve_input_file(input_dir, name, extensions) {
                    return Ok(SourceSelection::Local(path));
                }
                tracing::warn!("File '{}' not found in {}", name, input_dir.display());
                eprintln!(
                    "❌ File '{}' not found in '{}' (tried {})",
                    name,
                    input_dir.display(),
                    extensions.join(", ")
                );
            }
            prompt
                .ask_local_file(input_dir, extensions)
                .map(SourceSelection::Local)
        }
        None => prompt.choose_source(input_dir, extensions),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 日誌尚未初始化，設定錯誤直接輸出到 stderr
    let (mut settings, config_found) = match Settings::load_optional(&cli.config) {
        Ok(Some(settings)) => (settings, true),
        Ok(None) => (Settings::default(), false),
        Err(e) => fail(&e),
    };
    cli.apply_overrides(&mut settings);

    if let Err(e) = settings.validate() {
        fail(&e);
    }

    if let Err(e) = logger::init_cli_logger(Path::new(&settings.logging.file), cli.verbose) {
        fail(&e);
    }

    tracing::info!("Starting stellar-classifier");
    if config_found {
        tracing::info!("📁 Configuration loaded from: {}", cli.config);
    } else {
        tracing::warn!(
            "Configuration file {} not found, using built-in defaults",
            cli.config
        );
    }
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    println!("🔭 Automatic Stellar Type Classifier\n");

    let selection = match select_source(&cli, &settings) {
        Ok(selection) => selection,
        Err(e) => fail(&e),
    };
    tracing::info!("Selected source: {:?}", selection);

    let config = RunConfig::new(selection, settings);
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = match StellarPipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(&e),
    };

    let engine = ClassificationEngine::new(pipeline);
    match engine.run().await {
        Ok(summary) => {
            tracing::info!(
                "✅ Classified as {} ({:.1}%)",
                summary.classification.spectral_type,
                summary.classification.certainty
            );
            println!("\n✅ Results saved to:");
            println!("• Plot:    {}", summary.paths.plot.display());
            println!("• Report:  {}", summary.paths.report.display());
            println!("• Lines:   {}", summary.paths.lines.display());
            println!("• Summary: {}", summary.paths.summary.display());
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
