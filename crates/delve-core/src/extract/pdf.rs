use tracing::debug;

use super::trimmed_len;
use crate::config::PDF_MIN_CHARS;

/// Extracts page text from an in-memory PDF, pages separated by a blank line.
///
/// Returns `None` for unparseable documents and for documents whose text is
/// not longer than [`PDF_MIN_CHARS`] once trimmed (scanned PDFs usually land
/// here).
pub fn extract_pdf_text(bytes: &[u8]) -> Option<String> {
    // pdf-extract panics on some malformed inputs instead of erroring
    let parsed = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    let pages = match parsed {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            debug!(error = %e, "pdf parse failed");
            return None;
        }
        Err(_) => {
            debug!("pdf parser panicked");
            return None;
        }
    };

    let text = pages.join("\n\n");
    (trimmed_len(&text) > PDF_MIN_CHARS).then_some(text)
}
