//! Fallback policy: the centered, beacon-less substitute step

use step_catalog::WorkingView;
use tracing::debug;

/// Rewrites step `index` of the working view into its whole-screen form.
///
/// Returns true when a patch was applied. A step that already targets the
/// whole screen, or an index out of range, is left alone.
pub fn apply_fallback(view: &mut WorkingView, index: usize) -> bool {
    match view.step(index) {
        Some(step) if !step.is_whole_screen() => {}
        _ => return false,
    }
    let patched = view.patch(index, |step| step.make_whole_screen());
    if patched {
        debug!(index, "step patched to whole-screen fallback");
    }
    patched
}
