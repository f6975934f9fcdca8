// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Chore kinds and their two-level (macro band / micro level) ordinal encoding.
//!
//! Layout of the 7-bit ordinal:
//! - bits 6..4: macro band (pre-flush = 0, post-flush = 1, cleanup = 2, barrier = 7)
//! - bits 3..0: micro level inside the pre-flush band
use std::fmt;

/// Mask selecting the macro band of a [`ChoreKind`] ordinal.
pub const MACRO_MASK: u8 = 0b111_0000;
/// Mask selecting the micro level of a [`ChoreKind`] ordinal.
pub const MICRO_MASK: u8 = 0b000_1111;

/// Kind of a schedulable unit of reactive work.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ChoreKind {
    /// Resolve a deferred code reference.
    ResolveCode = 0b000_0001,
    /// Invoke a code reference directly (event handlers and similar).
    InvokeCode = 0b000_0010,
    /// Run a reactive task (or resource).
    Task = 0b000_0011,
    /// Reconcile a render-output tree against the live tree.
    Reconcile = 0b000_0100,
    /// Write (or backpatch) a single attribute.
    WriteAttribute = 0b000_0101,
    /// Re-evaluate a component into a render output.
    EvaluateComponent = 0b000_0110,
    /// Recompute the effects subscribed to a reactive source.
    RecomputeEffects = 0b000_0111,
    /// Visible-only work, run after the output flush.
    Visible = 0b001_0000,
    /// Teardown of visible-only work.
    CleanupVisible = 0b010_0000,
    /// Sentinel used to obtain a "fully settled" signal; never real work.
    DrainBarrier = 0b111_1111,
}

/// Macro band of a chore kind.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Band {
    /// Work that must land before the output flush.
    PreFlush,
    /// Work that observes flushed output.
    PostFlush,
    /// Teardown of post-flush work.
    Cleanup,
    /// The drain barrier.
    Barrier,
}

impl ChoreKind {
    /// Raw 7-bit ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Masked macro-band bits.
    #[must_use]
    pub const fn macro_bits(self) -> u8 {
        self.ordinal() & MACRO_MASK
    }

    /// Masked micro-level bits.
    #[must_use]
    pub const fn micro_bits(self) -> u8 {
        self.ordinal() & MICRO_MASK
    }

    /// Macro band this kind belongs to.
    #[must_use]
    pub const fn band(self) -> Band {
        match self {
            Self::Visible => Band::PostFlush,
            Self::CleanupVisible => Band::Cleanup,
            Self::DrainBarrier => Band::Barrier,
            _ => Band::PreFlush,
        }
    }

    /// True for every kind below the post-flush band.
    #[must_use]
    pub const fn is_pre_flush(self) -> bool {
        self.ordinal() < Self::Visible.ordinal()
    }

    /// Kinds that only make sense with a live tree; the server marks them
    /// done without running a handler.
    #[must_use]
    pub const fn is_client_only(self) -> bool {
        matches!(self, Self::Reconcile | Self::ResolveCode)
    }

    /// Kinds that may still target a host that was already streamed.
    #[must_use]
    pub const fn may_backpatch(self) -> bool {
        matches!(self, Self::WriteAttribute | Self::RecomputeEffects)
    }

    /// Stable lowercase name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ResolveCode => "resolve-code",
            Self::InvokeCode => "invoke-code",
            Self::Task => "task",
            Self::Reconcile => "reconcile",
            Self::WriteAttribute => "write-attribute",
            Self::EvaluateComponent => "evaluate-component",
            Self::RecomputeEffects => "recompute-effects",
            Self::Visible => "visible",
            Self::CleanupVisible => "cleanup-visible",
            Self::DrainBarrier => "drain-barrier",
        }
    }
}

impl fmt::Display for ChoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ChoreKind; 10] = [
        ChoreKind::ResolveCode,
        ChoreKind::InvokeCode,
        ChoreKind::Task,
        ChoreKind::Reconcile,
        ChoreKind::WriteAttribute,
        ChoreKind::EvaluateComponent,
        ChoreKind::RecomputeEffects,
        ChoreKind::Visible,
        ChoreKind::CleanupVisible,
        ChoreKind::DrainBarrier,
    ];

    #[test]
    fn pre_flush_kinds_share_macro_band_zero() {
        for kind in ALL.iter().filter(|k| k.is_pre_flush()) {
            assert_eq!(kind.macro_bits(), 0, "{kind} should be in the pre-flush band");
            assert_eq!(kind.band(), Band::PreFlush);
        }
    }

    #[test]
    fn micro_levels_follow_declaration_order() {
        let micro: Vec<u8> = ALL[..7].iter().map(|k| k.micro_bits()).collect();
        assert_eq!(micro, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn bands_are_strictly_increasing() {
        assert!(ChoreKind::RecomputeEffects.macro_bits() < ChoreKind::Visible.macro_bits());
        assert!(ChoreKind::Visible.macro_bits() < ChoreKind::CleanupVisible.macro_bits());
        assert!(ChoreKind::CleanupVisible.macro_bits() < ChoreKind::DrainBarrier.macro_bits());
        assert_eq!(ALL.iter().max(), Some(&ChoreKind::DrainBarrier));
    }

    #[test]
    fn server_policies() {
        assert!(ChoreKind::Reconcile.is_client_only());
        assert!(ChoreKind::ResolveCode.is_client_only());
        assert!(!ChoreKind::Task.is_client_only());
        assert!(ChoreKind::WriteAttribute.may_backpatch());
        assert!(ChoreKind::RecomputeEffects.may_backpatch());
        assert!(!ChoreKind::EvaluateComponent.may_backpatch());
    }

    #[test]
    fn every_kind_below_visible_work_is_pre_flush() {
        assert!(ChoreKind::ResolveCode.is_pre_flush());
        assert!(ChoreKind::InvokeCode.is_pre_flush());
        assert!(ChoreKind::Task.is_pre_flush());
        assert!(ChoreKind::RecomputeEffects.is_pre_flush());
        assert!(!ChoreKind::Visible.is_pre_flush());
        assert!(!ChoreKind::CleanupVisible.is_pre_flush());
        assert!(!ChoreKind::DrainBarrier.is_pre_flush());
    }
}
