use std::{path::Path, process::Command};

use snafu::{OptionExt, ResultExt};
use tracing::*;

use crate::{
    error::*,
    ocr::{OcrEngine, result::OcrDocument},
};

/// Delegates recognition to an external program.
///
/// The program is invoked as `program [args..] <image>` and must print an
/// [`OcrDocument`] as JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandOcr {
    program: String,
    args: Vec<String>,
}

impl CommandOcr {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits a shell-like command line on whitespace. Quoting is not
    /// supported.
    pub fn from_command_line(command_line: &str) -> Result<Self, LedgerscanError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().context(MissingConfigSnafu { key: "ocr.command" })?;
        Ok(Self::new(program, parts.collect()))
    }
}

impl OcrEngine for CommandOcr {
    #[tracing::instrument(skip_all, fields(program = %self.program))]
    fn recognize(&mut self, image_path: &Path) -> Result<OcrDocument, LedgerscanError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image_path)
            .output()
            .context(IoSnafu {
                stage: "spawn-ocr-command",
                path: self.program.as_str(),
            })?;

        if !output.status.success() {
            return OcrCommandSnafu {
                program: self.program.as_str(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .fail();
        }

        let document: OcrDocument =
            serde_json::from_slice(&output.stdout).context(OcrDecodeSnafu {
                program: self.program.as_str(),
            })?;
        debug!("ocr command returned {} words", document.words().count());

        Ok(document)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_split() -> Result<(), LedgerscanError> {
        let ocr = CommandOcr::from_command_line("python3 -m doctr_cli --json")?;
        assert_eq!(ocr.program, "python3");
        assert_eq!(ocr.args, ["-m", "doctr_cli", "--json"]);

        assert!(matches!(
            CommandOcr::from_command_line("   "),
            Err(LedgerscanError::MissingConfig { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_recognize_reads_stdout_json() -> Result<(), LedgerscanError> {
        let json = r#"{"pages":[{"blocks":[{"lines":[{"words":[{"value":"DEBIT","confidence":0.9,"geometry":[[0.1,0.1],[0.2,0.2]]}]}]}]}]"#;
        // `sh -c script name image` puts the image path in $1
        let mut ocr = CommandOcr::new(
            "sh",
            vec!["-c".into(), format!("echo '{json}'"), "ocr".into()],
        );

        let document = ocr.recognize(Path::new("/tmp/region.png"))?;
        let words = document.words().collect::<Vec<_>>();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].value, "DEBIT");
        Ok(())
    }

    #[test]
    fn test_recognize_failure_status() {
        let mut ocr = CommandOcr::new("sh", vec!["-c".into(), "echo boom >&2; exit 3".into()]);

        let err = ocr.recognize(Path::new("/tmp/region.png")).unwrap_err();
        match err {
            LedgerscanError::OcrCommand { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_recognize_invalid_json() {
        let mut ocr = CommandOcr::new("sh", vec!["-c".into(), "echo not-json".into()]);

        let err = ocr.recognize(Path::new("/tmp/region.png")).unwrap_err();
        assert!(matches!(err, LedgerscanError::OcrDecode { .. }));
    }
}
