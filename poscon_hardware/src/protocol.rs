//! DRV8830 register map and fault decoding.
//!
//! Pure encoding helpers, compiled on every target so they can be tested
//! without a bus.

/// Default 7-bit I²C address (A1 = A0 = 0).
pub const DEFAULT_ADDRESS: u16 = 0x60;
/// CONTROL register: VSET[7:2] | IN2 | IN1.
pub const REG_CONTROL: u8 = 0x00;
/// FAULT register; writing `FAULT_CLEAR` resets the latched bits.
pub const REG_FAULT: u8 = 0x01;
pub const FAULT_CLEAR: u8 = 0x80;

/// Lowest VSET code that produces a usable output (0.48 V).
pub const VSET_MIN: u8 = 0x06;
/// Highest VSET code (5.06 V).
pub const VSET_MAX: u8 = 0x3F;

/// H-bridge input combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bridge {
    Coast,
    Reverse,
    Forward,
    Brake,
}

impl Bridge {
    #[inline]
    fn bits(self) -> u8 {
        match self {
            Bridge::Coast => 0b00,
            Bridge::Reverse => 0b10,
            Bridge::Forward => 0b01,
            Bridge::Brake => 0b11,
        }
    }
}

#[inline]
pub fn control_byte(vset: u8, bridge: Bridge) -> u8 {
    (vset.min(VSET_MAX) << 2) | bridge.bits()
}

/// Encode a signed drive command in `[-limit, +limit]` into a CONTROL byte.
///
/// Magnitude maps linearly onto `VSET_MIN..=VSET_MAX` (rounded to nearest);
/// zero, or a zero limit, coasts. Out-of-range commands saturate at the limit.
pub fn drive_byte(command: i32, limit: u32) -> u8 {
    if command == 0 || limit == 0 {
        return control_byte(0, Bridge::Coast);
    }
    let mag = u64::from(command.unsigned_abs().min(limit));
    let span = u64::from(VSET_MAX - VSET_MIN);
    let lim = u64::from(limit);
    let vset = u64::from(VSET_MIN) + (mag * span + lim / 2) / lim;
    let bridge = if command > 0 {
        Bridge::Forward
    } else {
        Bridge::Reverse
    };
    control_byte(vset as u8, bridge)
}

/// Brake with full gate drive.
#[inline]
pub fn brake_byte() -> u8 {
    control_byte(VSET_MAX, Bridge::Brake)
}

/// One row of the FAULT register lookup table.
#[derive(Debug, Clone, Copy)]
pub struct FaultEntry {
    pub mask: u8,
    pub name: &'static str,
    pub reason: &'static str,
}

/// FAULT register bits, most specific first. Bit 0 (FAULT) is the summary flag.
pub const FAULT_TABLE: [FaultEntry; 5] = [
    FaultEntry {
        mask: 0x10,
        name: "ILIMIT",
        reason: "extended current limit event",
    },
    FaultEntry {
        mask: 0x08,
        name: "OTS",
        reason: "overtemperature shutdown",
    },
    FaultEntry {
        mask: 0x04,
        name: "UVLO",
        reason: "undervoltage lockout",
    },
    FaultEntry {
        mask: 0x02,
        name: "OCP",
        reason: "overcurrent protection",
    },
    FaultEntry {
        mask: 0x01,
        name: "FAULT",
        reason: "fault condition present",
    },
];

const KNOWN_BITS: u8 = 0x1F;

/// Human-readable reason for a fault code. Code 0 means no fault.
pub fn describe(code: u8) -> String {
    if code == 0 {
        return "no fault".to_string();
    }
    let mut parts: Vec<String> = FAULT_TABLE
        .iter()
        .filter(|e| code & e.mask != 0)
        // The summary bit adds nothing when a specific cause is present.
        .filter(|e| e.mask != 0x01 || code & (KNOWN_BITS & !0x01) == 0)
        .map(|e| format!("{}: {}", e.name, e.reason))
        .collect();
    let unknown = code & !KNOWN_BITS;
    if unknown != 0 {
        parts.push(format!("unknown fault bits 0x{unknown:02x}"));
    }
    parts.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_command_coasts() {
        assert_eq!(drive_byte(0, 15), 0x00);
        assert_eq!(drive_byte(7, 0), 0x00);
    }

    #[test]
    fn full_scale_uses_vset_max() {
        assert_eq!(drive_byte(15, 15), (VSET_MAX << 2) | 0b01);
        assert_eq!(drive_byte(-15, 15), (VSET_MAX << 2) | 0b10);
        // saturates beyond the limit
        assert_eq!(drive_byte(99, 15), drive_byte(15, 15));
    }

    #[test]
    fn small_command_is_near_vset_min() {
        // 6 + round(57 / 15) = 6 + 4
        assert_eq!(drive_byte(1, 15) >> 2, 10);
    }

    #[test]
    fn brake_sets_both_inputs() {
        assert_eq!(brake_byte() & 0b11, 0b11);
    }

    #[test]
    fn describe_lists_specific_causes() {
        assert_eq!(describe(0), "no fault");
        assert_eq!(describe(0x01), "FAULT: fault condition present");
        let s = describe(0x03);
        assert!(s.contains("OCP"));
        assert!(!s.contains("FAULT:"));
        assert!(describe(0x40).contains("unknown fault bits 0x40"));
    }
}
