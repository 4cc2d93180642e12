#![no_main]
use libfuzzer_sys::fuzz_target;
use poscon_core::{DestinationFormat, input::to_pulses};

fuzz_target!(|data: &str| {
    // Operator text must either parse or be rejected; accepted values must
    // survive a format/parse cycle unchanged.
    let format = DestinationFormat::default();
    let Ok(value) = format.parse(data) else {
        return;
    };
    let shown = format.format(value);
    let again = format.parse(&shown).expect("formatted destination parses");
    assert_eq!(again, value, "{data:?} -> {shown:?}");
    assert!(to_pulses(value, 400).is_some(), "{value} overflows the pulse counter");
});
