//! Counting source selection

use stride_domain::SourceKind;

/// Choose which counting source to activate.
///
/// The hardware cumulative counter is used only when the device declares
/// support for it *and* the user opted in; everything else falls back to the
/// pulse source. Selection happens once per service activation - switching
/// sources mid-session requires a restart with a fresh session.
pub fn select_source(supports_cumulative: bool, prefer_hardware: bool) -> SourceKind {
    if supports_cumulative && prefer_hardware {
        SourceKind::Cumulative
    } else {
        SourceKind::Pulse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_requires_capability_and_preference() {
        assert_eq!(select_source(true, true), SourceKind::Cumulative);
        assert_eq!(select_source(true, false), SourceKind::Pulse);
        assert_eq!(select_source(false, true), SourceKind::Pulse);
        assert_eq!(select_source(false, false), SourceKind::Pulse);
    }
}
