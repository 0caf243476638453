//! Startup verification that every external tool the pipeline shells out to
//! is present on `$PATH` and executable, matching the teacher's own use of
//! `which::which` for binary discovery.

use crate::error::FatalStartupError;

pub const REQUIRED: &[&str] = &["pdfcpu", "gs", "pdftotext", "convert", "pdftoppm", "tesseract"];

pub fn verify_all() -> Result<(), FatalStartupError> {
    for name in REQUIRED {
        verify_one(name)?;
    }
    Ok(())
}

fn verify_one(name: &str) -> Result<(), FatalStartupError> {
    let path = which::which(name).map_err(|_| FatalStartupError::MissingBinary(name.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let meta = std::fs::metadata(&path)
            .map_err(|_| FatalStartupError::MissingBinary(name.to_string()))?;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(FatalStartupError::NotExecutable(name.to_string(), path));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_binary_is_fatal() {
        let err = verify_one("definitely-not-a-real-binary-xyz");
        assert!(matches!(err, Err(FatalStartupError::MissingBinary(_))));
    }
}
