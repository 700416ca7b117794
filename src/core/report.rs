use crate::domain::model::{AnalysisResult, IdentifiedLine, SpectrumOrigin};
use crate::utils::error::{ClassifierError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

const RULE: &str = "============================================================";

/// 終端輸出的分類結果與已辨識譜線表
pub fn render_console(result: &AnalysisResult) -> String {
    let mut lines = vec![
        RULE.to_string(),
        format!("{:^60}", "CLASSIFICATION RESULTS"),
        RULE.to_string(),
        format!("{:<20}{}", "Source", result.origin),
        format!("{:<20}{}", "Spectral type", result.classification.spectral_type),
        format!("{:<20}{:.1}%", "Certainty", result.classification.certainty),
        format!(
            "{:<20}{} detected, {} identified",
            "Lines",
            result.detected_lines.len(),
            result.identified_lines.len()
        ),
    ];

    if !result.identified_lines.is_empty() {
        lines.push(String::new());
        lines.push(format!("{:^60}", "IDENTIFIED LINES"));
        lines.push(format!("{:>14}  {:>10}  {}", "Wavelength (Å)", "EW", "Element"));
        lines.extend(result.identified_lines.iter().map(|line| {
            format!(
                "{:>14.2}  {:>10.2}  {}",
                line.wavelength, line.equivalent_width, line.element
            )
        }));
    }
    lines.push(RULE.to_string());
    lines.join("\n")
}

fn report_line(line: &IdentifiedLine) -> String {
    format!(
        "{} @ {:.2}Å (EW: {:.2})",
        line.element, line.wavelength, line.equivalent_width
    )
}

pub fn render_text_report(result: &AnalysisResult, generated_at: DateTime<Utc>) -> String {
    let mut lines = vec![
        format!("# Generated: {}", generated_at.to_rfc3339()),
        format!("# Source: {}", result.origin),
        String::new(),
        format!("Stellar Type: {}", result.classification.spectral_type),
        format!("Certainty: {:.1}%", result.classification.certainty),
        String::new(),
        "Identified lines:".to_string(),
    ];
    lines.extend(result.identified_lines.iter().map(report_line));

    // 每行皆以換行結尾
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[derive(Debug, Serialize)]
struct LineRow<'a> {
    wavelength: f64,
    equivalent_width: f64,
    element: &'a str,
}

/// 所有偵測到的譜線；未辨識者 element 留空
pub fn render_lines_csv(result: &AnalysisResult) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    // identified 是 detected 的子序列，順序相同
    let mut identified = result.identified_lines.iter().peekable();

    for line in &result.detected_lines {
        let element = match identified.peek() {
            Some(known) if known.wavelength == line.wavelength => {
                identified.next().map(|k| k.element.as_str()).unwrap_or("")
            }
            _ => "",
        };
        writer.serialize(LineRow {
            wavelength: line.wavelength,
            equivalent_width: line.equivalent_width,
            element,
        })?;
    }

    writer
        .into_inner()
        .map_err(|e| ClassifierError::processing(format!("CSV buffer flush failed: {}", e)))
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    generated_at: DateTime<Utc>,
    origin: &'a SpectrumOrigin,
    fallback: bool,
    spectral_type: &'a str,
    certainty: f64,
    samples: usize,
    detected_lines: usize,
    identified_lines: &'a [IdentifiedLine],
    unidentified: &'a [f64],
}

pub fn render_summary_json(result: &AnalysisResult, generated_at: DateTime<Utc>) -> Result<String> {
    let summary = Summary {
        generated_at,
        origin: &result.origin,
        fallback: result.origin.is_fallback(),
        spectral_type: &result.classification.spectral_type,
        certainty: result.classification.certainty,
        samples: result.spectrum.len(),
        detected_lines: result.detected_lines.len(),
        identified_lines: &result.identified_lines,
        unidentified: &result.unidentified,
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}
