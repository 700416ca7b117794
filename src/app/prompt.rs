use crate::domain::model::SourceSelection;
use crate::utils::error::{ClassifierError, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// 依序嘗試各副檔名，回傳第一個存在的檔案
pub fn resolve_input_file(input_dir: &Path, base_name: &str, extensions: &[String]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| input_dir.join(format!("{}{}", base_name, ext)))
        .find(|candidate| candidate.is_file())
}

/// 互動式選擇光譜來源。輸入無效時重新詢問，輸入結束 (EOF) 時回傳錯誤
pub struct Prompt<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ClassifierError::InputError {
                message: "input ended before a choice was made".to_string(),
            });
        }
        Ok(line.trim().to_string())
    }

    pub fn choose_source(
        &mut self,
        input_dir: &Path,
        extensions: &[String],
    ) -> Result<SourceSelection> {
        writeln!(self.output, "\nInput options:")?;
        writeln!(self.output, "1. Download a spectrum from SDSS (online)")?;
        writeln!(self.output, "2. Use a local FITS file")?;

        loop {
            match self.read_line("Choose an option (1/2): ")?.as_str() {
                "1" => return Ok(SourceSelection::Remote),
                "2" => {
                    let path = self.ask_local_file(input_dir, extensions)?;
                    return Ok(SourceSelection::Local(path));
                }
                other => {
                    tracing::debug!("Invalid source option: {:?}", other);
                    writeln!(self.output, "❌ Invalid option, please choose 1 or 2.")?;
                }
            }
        }
    }

    pub fn ask_local_file(&mut self, input_dir: &Path, extensions: &[String]) -> Result<PathBuf> {
        loop {
            let base_name = self.read_line(&format!(
                "FITS file name in '{}' (without extension): ",
                input_dir.display()
            ))?;
            if base_name.is_empty() {
                writeln!(self.output, "❌ The name cannot be empty.")?;
                continue;
            }

            match resolve_input_file(input_dir, &base_name, extensions) {
                Some(path) => return Ok(path),
                None => {
                    writeln!(
                        self.output,
                        "❌ File '{}' not found in '{}'",
                        base_name,
                        input_dir.display()
                    )?;
                    writeln!(self.output, "   Extensions tried: {}", extensions.join(", "))?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn extensions() -> Vec<String> {
        [".fits", ".fit", ".fts", ".FITS"]
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_resolve_tries_extensions_in_order() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("star.fts"), b"").unwrap();
        std::fs::write(temp_dir.path().join("star.FITS"), b"").unwrap();

        let found = resolve_input_file(temp_dir.path(), "star", &extensions()).unwrap();
        assert_eq!(found, temp_dir.path().join("star.fts"));
        assert!(resolve_input_file(temp_dir.path(), "nebula", &extensions()).is_none());
    }

    #[test]
    fn test_invalid_option_reprompts() {
        let temp_dir = TempDir::new().unwrap();
        let mut output = Vec::new();
        let mut prompt = Prompt::new(Cursor::new("x\n3\n1\n"), &mut output);

        let selection = prompt.choose_source(temp_dir.path(), &extensions()).unwrap();
        assert_eq!(selection, SourceSelection::Remote);

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Invalid option").count(), 2);
    }

    #[test]
    fn test_local_file_reprompts_until_found() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("vega.fit"), b"").unwrap();

        let mut output = Vec::new();
        let mut prompt = Prompt::new(Cursor::new("2\n\nsirius\nvega\n"), &mut output);

        let selection = prompt.choose_source(temp_dir.path(), &extensions()).unwrap();
        assert_eq!(
            selection,
            SourceSelection::Local(temp_dir.path().join("vega.fit"))
        );

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("cannot be empty"));
        assert!(text.contains("'sirius' not found"));
    }

    #[test]
    fn test_end_of_input_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut prompt = Prompt::new(Cursor::new("9\n"), Vec::new());

        let err = prompt.choose_source(temp_dir.path(), &extensions()).unwrap_err();
        assert!(matches!(err, ClassifierError::InputError { .. }));
    }
}
