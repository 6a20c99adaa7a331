use num_traits::{One, PrimInt};
use serde::{Deserialize, Serialize};

/// Trait implemented by flag enums whose discriminant is a bit index.
///
/// The enum's discriminant (via `#[repr(u8)]`) determines the bit index.
/// You choose the backing integer type via the associated `Storage`.
pub trait FlagBitmask {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        // NOTE: `bit_index()` must be < number of bits in `Storage`.
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// A plain bitmask container, used for collision layers and query masks.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BitmaskFlags<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> BitmaskFlags<T> {
    pub fn new(bits: T) -> Self {
        Self { bits }
    }

    /// Every bit set. Interacts with everything.
    pub fn all() -> Self {
        Self { bits: !T::zero() }
    }

    /// No bit set. Interacts with nothing.
    pub fn none() -> Self {
        Self { bits: T::zero() }
    }

    pub fn from_flags<U: FlagBitmask<Storage = T> + Copy>(flags: &[U]) -> Self {
        let mut out = Self::none();
        out.add_many(flags);
        out
    }

    pub fn add<U: FlagBitmask<Storage = T>>(&mut self, flag: U) {
        self.bits = self.bits | flag.mask();
    }

    pub fn remove<U: FlagBitmask<Storage = T>>(&mut self, flag: U) {
        self.bits = self.bits & !flag.mask();
    }

    pub fn has<U: FlagBitmask<Storage = T>>(&self, flag: U) -> bool {
        (self.bits & flag.mask()) != T::zero()
    }

    pub fn add_many<U: FlagBitmask<Storage = T> + Copy>(&mut self, flags: &[U]) {
        for &flag in flags {
            self.add(flag);
        }
    }

    /// True if the two masks share at least one bit.
    pub fn intersects(&self, other: Self) -> bool {
        (self.bits & other.bits) != T::zero()
    }

    pub fn is_empty(&self) -> bool {
        self.bits == T::zero()
    }
}

/// Declare a bitmask-backed enum and implement `FlagBitmask` for it.
///
/// Example:
/// ```rust
/// kinematics::define_bitmask_flags!(Layer, u32, {
///     World,
///     Character,
///     Platform,
/// });
/// ```
#[macro_export]
macro_rules! define_bitmask_flags {
    ($name:ident, $storage:ty, { $($variant:ident),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum $name {
            $($variant),*
        }

        impl $crate::bitmask_flags::FlagBitmask for $name {
            type Storage = $storage;

            fn bit_index(&self) -> u8 {
                *self as u8
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::define_bitmask_flags!(TestLayer, u32, { Ground, Actor, Hazard });

    #[test]
    fn layers_map_to_distinct_bits() {
        assert_eq!(TestLayer::Ground.mask(), 0b001);
        assert_eq!(TestLayer::Actor.mask(), 0b010);
        assert_eq!(TestLayer::Hazard.mask(), 0b100);
    }

    #[test]
    fn intersects_requires_a_shared_bit() {
        let ground = BitmaskFlags::<u32>::from_flags(&[TestLayer::Ground]);
        let actors = BitmaskFlags::<u32>::from_flags(&[TestLayer::Actor, TestLayer::Hazard]);

        assert!(!ground.intersects(actors));
        assert!(BitmaskFlags::<u32>::all().intersects(ground));
        assert!(!BitmaskFlags::<u32>::none().intersects(ground));
    }

    #[test]
    fn add_and_remove_toggle_single_flags() {
        let mut flags = BitmaskFlags::<u32>::none();
        flags.add(TestLayer::Hazard);
        assert!(flags.has(TestLayer::Hazard));
        assert!(!flags.has(TestLayer::Ground));

        flags.remove(TestLayer::Hazard);
        assert!(flags.is_empty());
    }
}
