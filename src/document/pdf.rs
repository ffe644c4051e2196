use std::path::Path;

use super::ExtractionError;

pub(super) fn extract(path: &Path) -> Result<String, ExtractionError> {
    pdf_extract::extract_text(path).map_err(|error| ExtractionError::Pdf(error.to_string()))
}
