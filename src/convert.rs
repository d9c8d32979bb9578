use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::DapisError;
use crate::traits::Converter;

/// Converts office documents to PDF with a headless office suite.
///
/// Runs `<soffice> --headless --convert-to pdf --outdir <dir> <input>`. The
/// PDF lands next to the input unless [`out_dir`](Self::out_dir) is set, and
/// takes the input's file stem.
#[derive(Debug, Clone)]
pub struct OfficeConverter {
    program: PathBuf,
    out_dir: Option<PathBuf>,
}

impl Default for OfficeConverter {
    fn default() -> Self {
        Self::new("soffice")
    }
}

impl OfficeConverter {
    /// Use `program` as the office suite binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            out_dir: None,
        }
    }

    /// Write converted PDFs into `dir` instead of beside their source.
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    /// Where the PDF for `input` will be written.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let dir = match &self.out_dir {
            Some(d) => d.clone(),
            None    => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let mut name = input.file_stem().unwrap_or_default().to_os_string();
        name.push(".pdf");
        dir.join(name)
    }
}

impl Converter for OfficeConverter {
    fn convert_to_pdf(&self, input: &Path) -> Result<PathBuf, DapisError> {
        let fail = |message: String| DapisError::Conversion {
            path: input.to_path_buf(),
            message,
        };

        let output = self.output_path(input);
        let out_dir = output.parent().map(Path::to_path_buf).unwrap_or_default();

        debug!(input = %input.display(), program = %self.program.display(), "converting to pdf");

        let result = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(&out_dir)
            .arg(input)
            .output()
            .map_err(|e| fail(format!("failed to run {}: {e}", self.program.display())))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(fail(format!("{} exited with {}: {}", self.program.display(), result.status, stderr.trim())));
        }

        if !output.is_file() {
            return Err(fail(format!("expected output {} was not produced", output.display())));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_sits_beside_input_by_default() {
        let conv = OfficeConverter::default();
        assert_eq!(
            conv.output_path(Path::new("/docs/report.docx")),
            PathBuf::from("/docs/report.pdf")
        );
    }

    #[test]
    fn out_dir_overrides_location() {
        let conv = OfficeConverter::default().out_dir("/tmp/pdfs");
        assert_eq!(
            conv.output_path(Path::new("/docs/slides.v2.pptx")),
            PathBuf::from("/tmp/pdfs/slides.v2.pdf")
        );
    }

    #[test]
    fn missing_program_is_a_conversion_error() {
        let conv = OfficeConverter::new("/definitely/not/soffice");
        let err = conv.convert_to_pdf(Path::new("/docs/report.docx")).unwrap_err();
        assert!(matches!(err, DapisError::Conversion { .. }));
        assert_eq!(err.path(), Some(Path::new("/docs/report.docx")));
    }
}
