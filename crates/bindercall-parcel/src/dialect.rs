//! Per-release variations of the parcel layout.

/// Header word written after the work-source uid by Android 11 and later.
pub const SYSTEM_HEADER: i32 = 0x5359_5354; // 'SYST'

/// Work-source uid meaning "not set".
pub const UNSET_WORK_SOURCE: i32 = -1;

const STRICT_MODE_PENALTY_GATHER_LEGACY: i32 = 0x40 << 16;
const STRICT_MODE_PENALTY_GATHER: i32 = i32::MIN; // 1 << 31

/// Newest release the bundled helper binaries were built for.
pub const DEFAULT_SDK: u32 = 25;

/// Selects the parcel layout of a target OS release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParcelDialect {
    /// Target API level.
    pub sdk: u32,
}

impl ParcelDialect {
    pub const fn new(sdk: u32) -> Self {
        Self { sdk }
    }

    /// Strict-mode policy word placed at the head of the interface token.
    pub fn strict_mode_policy(&self) -> i32 {
        if self.sdk >= 28 {
            STRICT_MODE_PENALTY_GATHER
        } else {
            STRICT_MODE_PENALTY_GATHER_LEGACY
        }
    }

    /// Whether the interface token carries a work-source uid.
    pub fn has_work_source(&self) -> bool {
        self.sdk >= 29
    }

    /// Whether the interface token carries the `'SYST'` header word.
    pub fn has_system_header(&self) -> bool {
        self.sdk >= 30
    }

    /// Whether flattened binders are followed by a stability word.
    pub fn has_binder_stability(&self) -> bool {
        self.sdk >= 29
    }

    /// Whether map, list and object-array values are length-prefixed.
    pub fn length_prefixed_containers(&self) -> bool {
        self.sdk >= 33
    }

    /// Whether exception replies carry a remote stack-trace header.
    pub fn has_remote_stack_trace(&self) -> bool {
        self.sdk >= 28
    }
}

impl Default for ParcelDialect {
    fn default() -> Self {
        Self::new(DEFAULT_SDK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_releases_use_plain_token() {
        let dialect = ParcelDialect::new(23);
        assert!(!dialect.has_work_source());
        assert!(!dialect.has_system_header());
        assert_eq!(dialect.strict_mode_policy(), 0x0040_0000);
    }

    #[test]
    fn header_layout_grows_with_release() {
        assert!(ParcelDialect::new(29).has_work_source());
        assert!(!ParcelDialect::new(29).has_system_header());
        assert!(ParcelDialect::new(30).has_system_header());
        assert_eq!(ParcelDialect::new(30).strict_mode_policy() as u32, 0x8000_0000);
        assert!(ParcelDialect::new(33).length_prefixed_containers());
    }
}
