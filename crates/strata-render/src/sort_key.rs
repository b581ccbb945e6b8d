//! Packed 64-bit draw sort keys.
//!
//! Layout, most to least significant:
//!
//! ```text
//! | 2 unused | 7 layer | 3 deferred pass | 32 user | 1 instanced | 16 depth | 3 immediate pass |
//! ```
//!
//! Keys compare as plain `u64`s, so a sorted draw list is ordered by layer
//! first, then deferred pass, user payload, instancing, depth, and finally the
//! immediate pass.

use std::fmt;

const IMMEDIATE_PASS_SHIFT: u32 = 0;
const IMMEDIATE_PASS_BITS: u32 = 3;
const DEPTH_SHIFT: u32 = 3;
const DEPTH_BITS: u32 = 16;
const INSTANCED_SHIFT: u32 = 19;
const USER_SHIFT: u32 = 20;
const USER_BITS: u32 = 32;
const DEFERRED_PASS_SHIFT: u32 = 52;
const DEFERRED_PASS_BITS: u32 = 3;
const LAYER_SHIFT: u32 = 55;
const LAYER_BITS: u32 = 7;

const fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// A field of the sort key that carries a range limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKeyField {
    Layer,
    DeferredPass,
    ImmediatePass,
}

impl fmt::Display for SortKeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKeyField::Layer => "layer",
            SortKeyField::DeferredPass => "deferred pass",
            SortKeyField::ImmediatePass => "immediate pass",
        };
        f.write_str(name)
    }
}

/// Errors produced while packing a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SortKeyError {
    /// A field value does not fit in its bit range.
    #[error("sort key {field} value {value} exceeds maximum {max}")]
    FieldOverflow {
        field: SortKeyField,
        value: u64,
        max: u64,
    },
}

/// Unpacked sort key fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SortKeyFields {
    /// Layer id, 7 bits.
    pub layer: u8,
    /// Deferred shading pass id, 3 bits.
    pub deferred_pass: u8,
    /// Caller-defined payload.
    pub user: u32,
    /// Whether the draw is instanced.
    pub instanced: bool,
    /// Depth bucket.
    pub depth: u16,
    /// Immediate shading pass id, 3 bits.
    pub immediate_pass: u8,
}

/// A packed, totally ordered draw sort key. Smaller keys are drawn first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderSortKey(u64);

impl RenderSortKey {
    /// Maximum layer id.
    pub const MAX_LAYER: u8 = mask(LAYER_BITS) as u8;
    /// Maximum deferred or immediate pass id.
    pub const MAX_PASS: u8 = mask(DEFERRED_PASS_BITS) as u8;

    /// Pack `fields` into a key, rejecting values wider than their bit range.
    pub fn encode(fields: &SortKeyFields) -> Result<Self, SortKeyError> {
        check(SortKeyField::Layer, fields.layer, LAYER_BITS)?;
        check(SortKeyField::DeferredPass, fields.deferred_pass, DEFERRED_PASS_BITS)?;
        check(SortKeyField::ImmediatePass, fields.immediate_pass, IMMEDIATE_PASS_BITS)?;

        let bits = (u64::from(fields.layer) << LAYER_SHIFT)
            | (u64::from(fields.deferred_pass) << DEFERRED_PASS_SHIFT)
            | (u64::from(fields.user) << USER_SHIFT)
            | (u64::from(fields.instanced) << INSTANCED_SHIFT)
            | (u64::from(fields.depth) << DEPTH_SHIFT)
            | (u64::from(fields.immediate_pass) << IMMEDIATE_PASS_SHIFT);
        Ok(Self(bits))
    }

    /// Reinterpret a raw value as a key. The two unused high bits are cleared.
    pub fn from_bits(bits: u64) -> Self {
        Self(bits & mask(62))
    }

    /// The raw packed value.
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Unpack every field.
    pub fn decode(self) -> SortKeyFields {
        SortKeyFields {
            layer: self.layer(),
            deferred_pass: self.deferred_pass(),
            user: self.user(),
            instanced: self.instanced(),
            depth: self.depth(),
            immediate_pass: self.immediate_pass(),
        }
    }

    pub fn layer(self) -> u8 {
        self.field(LAYER_SHIFT, LAYER_BITS) as u8
    }

    pub fn deferred_pass(self) -> u8 {
        self.field(DEFERRED_PASS_SHIFT, DEFERRED_PASS_BITS) as u8
    }

    pub fn user(self) -> u32 {
        self.field(USER_SHIFT, USER_BITS) as u32
    }

    pub fn instanced(self) -> bool {
        self.field(INSTANCED_SHIFT, 1) != 0
    }

    pub fn depth(self) -> u16 {
        self.field(DEPTH_SHIFT, DEPTH_BITS) as u16
    }

    pub fn immediate_pass(self) -> u8 {
        self.field(IMMEDIATE_PASS_SHIFT, IMMEDIATE_PASS_BITS) as u8
    }

    fn field(self, shift: u32, bits: u32) -> u64 {
        (self.0 >> shift) & mask(bits)
    }
}

fn check(field: SortKeyField, value: u8, bits: u32) -> Result<(), SortKeyError> {
    let max = mask(bits);
    if u64::from(value) > max {
        return Err(SortKeyError::FieldOverflow {
            field,
            value: u64::from(value),
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> SortKeyFields {
        SortKeyFields {
            layer: 42,
            deferred_pass: 5,
            user: 0xDEAD_BEEF,
            instanced: true,
            depth: 0x1234,
            immediate_pass: 6,
        }
    }

    #[test]
    fn test_fields_survive_packing() {
        let key = RenderSortKey::encode(&fields()).unwrap();
        assert_eq!(key.decode(), fields());
    }

    #[test]
    fn test_field_extremes_survive_packing() {
        let max = SortKeyFields {
            layer: RenderSortKey::MAX_LAYER,
            deferred_pass: RenderSortKey::MAX_PASS,
            user: u32::MAX,
            instanced: true,
            depth: u16::MAX,
            immediate_pass: RenderSortKey::MAX_PASS,
        };
        let key = RenderSortKey::encode(&max).unwrap();
        assert_eq!(key.decode(), max);
        assert_eq!(key.bits() >> 62, 0, "unused bits must stay clear");
        assert_eq!(key.bits(), mask(62));

        let zero = RenderSortKey::encode(&SortKeyFields::default()).unwrap();
        assert_eq!(zero.bits(), 0);
    }

    #[test]
    fn test_overflowing_layer_is_rejected() {
        let err = RenderSortKey::encode(&SortKeyFields {
            layer: 128,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            SortKeyError::FieldOverflow {
                field: SortKeyField::Layer,
                value: 128,
                max: 127
            }
        );
    }

    #[test]
    fn test_overflowing_passes_are_rejected() {
        let deferred = RenderSortKey::encode(&SortKeyFields {
            deferred_pass: 8,
            ..Default::default()
        });
        assert!(matches!(
            deferred,
            Err(SortKeyError::FieldOverflow {
                field: SortKeyField::DeferredPass,
                ..
            })
        ));
        let immediate = RenderSortKey::encode(&SortKeyFields {
            immediate_pass: 255,
            ..Default::default()
        });
        assert!(matches!(
            immediate,
            Err(SortKeyError::FieldOverflow {
                field: SortKeyField::ImmediatePass,
                ..
            })
        ));
    }

    #[test]
    fn test_layer_dominates_ordering() {
        let low_layer = RenderSortKey::encode(&SortKeyFields {
            layer: 1,
            deferred_pass: 7,
            user: u32::MAX,
            instanced: true,
            depth: u16::MAX,
            immediate_pass: 7,
        })
        .unwrap();
        let high_layer = RenderSortKey::encode(&SortKeyFields {
            layer: 2,
            ..Default::default()
        })
        .unwrap();
        assert!(low_layer < high_layer);
    }

    #[test]
    fn test_depth_orders_within_same_user_payload() {
        let near = RenderSortKey::encode(&SortKeyFields {
            user: 9,
            depth: 3,
            ..Default::default()
        })
        .unwrap();
        let far = RenderSortKey::encode(&SortKeyFields {
            user: 9,
            depth: 4,
            ..Default::default()
        })
        .unwrap();
        assert!(near < far);
    }

    #[test]
    fn test_from_bits_clears_unused_bits() {
        let key = RenderSortKey::from_bits(u64::MAX);
        assert_eq!(key.bits() >> 62, 0);
        assert_eq!(key.layer(), RenderSortKey::MAX_LAYER);
    }
}
