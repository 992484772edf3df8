//! Kernel kinds and the declared kernel graph.
//!
//! [`PathKernel`] enumerates every integrator kernel and is the index space of
//! the queue counters. [`MainKernel`] and [`ShadowKernel`] split it by sub-path
//! so a path state can only ever be queued on a kernel of its own kind.

use std::fmt;

/// Every integrator kernel a path can be queued on.
///
/// The discriminant is the counter slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PathKernel {
    IntersectClosest = 0,
    IntersectShadow = 1,
    IntersectSubsurface = 2,
    ShadeBackground = 3,
    ShadeSurface = 4,
    ShadeVolume = 5,
    ShadeShadow = 6,
}

impl PathKernel {
    /// Number of kernel kinds.
    pub const COUNT: usize = 7;

    /// All kinds in counter-slot order.
    pub const ALL: [PathKernel; Self::COUNT] = [
        PathKernel::IntersectClosest,
        PathKernel::IntersectShadow,
        PathKernel::IntersectSubsurface,
        PathKernel::ShadeBackground,
        PathKernel::ShadeSurface,
        PathKernel::ShadeVolume,
        PathKernel::ShadeShadow,
    ];

    /// Counter slot index.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            PathKernel::IntersectClosest => "intersect_closest",
            PathKernel::IntersectShadow => "intersect_shadow",
            PathKernel::IntersectSubsurface => "intersect_subsurface",
            PathKernel::ShadeBackground => "shade_background",
            PathKernel::ShadeSurface => "shade_surface",
            PathKernel::ShadeVolume => "shade_volume",
            PathKernel::ShadeShadow => "shade_shadow",
        }
    }

    /// Kernels operating on the shadow sub-path.
    #[inline]
    pub const fn is_shadow(self) -> bool {
        matches!(self, PathKernel::IntersectShadow | PathKernel::ShadeShadow)
    }

    /// Kernels that may INIT a shadow path.
    ///
    /// Only one shadow path fits in a path state, so these must not run while
    /// any shadow kernel still has queued paths.
    #[inline]
    pub const fn spawns_shadow(self) -> bool {
        matches!(self, PathKernel::ShadeSurface | PathKernel::ShadeVolume)
    }

    pub fn as_main(self) -> Option<MainKernel> {
        match self {
            PathKernel::IntersectClosest => Some(MainKernel::IntersectClosest),
            PathKernel::IntersectSubsurface => Some(MainKernel::IntersectSubsurface),
            PathKernel::ShadeBackground => Some(MainKernel::ShadeBackground),
            PathKernel::ShadeSurface => Some(MainKernel::ShadeSurface),
            PathKernel::ShadeVolume => Some(MainKernel::ShadeVolume),
            PathKernel::IntersectShadow | PathKernel::ShadeShadow => None,
        }
    }

    pub fn as_shadow(self) -> Option<ShadowKernel> {
        match self {
            PathKernel::IntersectShadow => Some(ShadowKernel::IntersectShadow),
            PathKernel::ShadeShadow => Some(ShadowKernel::ShadeShadow),
            _ => None,
        }
    }
}

impl fmt::Display for PathKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kernels of the main transport path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MainKernel {
    IntersectClosest,
    IntersectSubsurface,
    ShadeBackground,
    ShadeSurface,
    ShadeVolume,
}

impl MainKernel {
    /// Kernel a freshly created camera path is queued on.
    pub const INIT: MainKernel = MainKernel::IntersectClosest;

    /// Legal NEXT targets.
    pub const fn successors(self) -> &'static [MainKernel] {
        match self {
            MainKernel::IntersectClosest => &[
                MainKernel::ShadeBackground,
                MainKernel::ShadeSurface,
                MainKernel::ShadeVolume,
            ],
            MainKernel::ShadeSurface => &[MainKernel::IntersectClosest, MainKernel::IntersectSubsurface],
            MainKernel::ShadeVolume => &[MainKernel::IntersectClosest],
            MainKernel::IntersectSubsurface => &[MainKernel::ShadeSurface],
            MainKernel::ShadeBackground => &[],
        }
    }

    /// Whether TERMINATE is legal from this kernel.
    pub const fn can_terminate(self) -> bool {
        !matches!(self, MainKernel::IntersectClosest)
    }

    pub fn can_follow(self, next: MainKernel) -> bool {
        self.successors().contains(&next)
    }
}

/// Kernels of the next-event-estimation shadow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowKernel {
    IntersectShadow,
    ShadeShadow,
}

impl ShadowKernel {
    pub const INIT: ShadowKernel = ShadowKernel::IntersectShadow;

    pub const fn successors(self) -> &'static [ShadowKernel] {
        match self {
            ShadowKernel::IntersectShadow => &[ShadowKernel::ShadeShadow],
            ShadowKernel::ShadeShadow => &[],
        }
    }

    /// Both shadow kernels may terminate: occluded in intersect, applied in shade.
    pub const fn can_terminate(self) -> bool {
        true
    }

    pub fn can_follow(self, next: ShadowKernel) -> bool {
        self.successors().contains(&next)
    }
}

impl From<MainKernel> for PathKernel {
    fn from(k: MainKernel) -> Self {
        match k {
            MainKernel::IntersectClosest => PathKernel::IntersectClosest,
            MainKernel::IntersectSubsurface => PathKernel::IntersectSubsurface,
            MainKernel::ShadeBackground => PathKernel::ShadeBackground,
            MainKernel::ShadeSurface => PathKernel::ShadeSurface,
            MainKernel::ShadeVolume => PathKernel::ShadeVolume,
        }
    }
}

impl From<ShadowKernel> for PathKernel {
    fn from(k: ShadowKernel) -> Self {
        match k {
            ShadowKernel::IntersectShadow => PathKernel::IntersectShadow,
            ShadowKernel::ShadeShadow => PathKernel::ShadeShadow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for (i, k) in PathKernel::ALL.iter().enumerate() {
            assert_eq!(k.index(), i);
            assert_eq!(PathKernel::from_index(i), Some(*k));
        }
        assert_eq!(PathKernel::from_index(PathKernel::COUNT), None);
    }

    #[test]
    fn test_sub_path_split() {
        for k in PathKernel::ALL {
            assert_eq!(k.is_shadow(), k.as_shadow().is_some());
            assert_eq!(!k.is_shadow(), k.as_main().is_some());
            if let Some(m) = k.as_main() {
                assert_eq!(PathKernel::from(m), k);
            }
            if let Some(s) = k.as_shadow() {
                assert_eq!(PathKernel::from(s), k);
            }
        }
    }

    #[test]
    fn test_main_graph() {
        assert!(MainKernel::IntersectClosest.can_follow(MainKernel::ShadeSurface));
        assert!(MainKernel::ShadeSurface.can_follow(MainKernel::IntersectClosest));
        assert!(!MainKernel::ShadeBackground.can_follow(MainKernel::IntersectClosest));
        assert!(!MainKernel::IntersectClosest.can_terminate());
        assert!(MainKernel::ShadeBackground.can_terminate());
    }

    #[test]
    fn test_shadow_graph() {
        assert!(ShadowKernel::IntersectShadow.can_follow(ShadowKernel::ShadeShadow));
        assert!(!ShadowKernel::ShadeShadow.can_follow(ShadowKernel::IntersectShadow));
    }
}
