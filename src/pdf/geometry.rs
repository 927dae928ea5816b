//! Page geometry resolution

use log::trace;

use super::backend::DocumentHandle;
use super::generation::CancelToken;
use super::request::ViewerFault;
use super::types::PageSize;

/// Outcome of measuring a document
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// One size per page, in page order
    Resolved(Vec<PageSize>),
    /// The owning session moved on before measuring finished
    Cancelled,
}

/// Measure every page of `handle` at `scale`.
///
/// The sizes are only handed out once all pages are known, so callers
/// never observe a partial array. The token is checked before each page
/// query; once it fires nothing further is queried.
pub fn resolve_geometry(
    handle: &dyn DocumentHandle,
    scale: f32,
    cancel: &CancelToken,
) -> Result<Resolution, ViewerFault> {
    if cancel.is_cancelled() {
        return Ok(Resolution::Cancelled);
    }

    let page_count = handle.page_count()?;
    let mut sizes = Vec::with_capacity(page_count);

    for page in 0..page_count {
        if cancel.is_cancelled() {
            trace!(
                "{} cancelled after measuring {page}/{page_count} pages",
                cancel.generation()
            );
            return Ok(Resolution::Cancelled);
        }

        let (width_pt, height_pt) = handle
            .page_bounds(page)
            .map_err(|e| ViewerFault::decode(format!("page {page} bounds: {e}")))?;
        sizes.push(PageSize::from_points(width_pt, height_pt, scale));
    }

    Ok(Resolution::Resolved(sizes))
}
