//! Property tests for the device registry

use iec_protocol::Brand;
use iec_sim::{DeviceEntry, DeviceRegistry, RegistryError};
use proptest::prelude::*;

fn brand() -> impl Strategy<Value = Brand> {
    prop_oneof![
        Just(Brand::Luna),
        Just(Brand::Kohler),
        Just(Brand::Makel),
        Just(Brand::Viko),
        Just(Brand::None),
    ]
}

fn valid_entry() -> impl Strategy<Value = DeviceEntry> {
    ("[0-9]{8}", brand(), any::<bool>()).prop_map(|(serial_number, brand, enabled)| DeviceEntry {
        serial_number,
        brand,
        enabled,
    })
}

fn bad_serial() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{0,7}",
        "[0-9]{9,12}",
        ("[0-9]{7}", "[A-Za-z ]", 0usize..8).prop_map(|(mut digits, other, at)| {
            digits.insert_str(at, &other);
            digits
        }),
    ]
}

proptest! {
    #[test]
    fn find_returns_first_index(entries in prop::collection::vec(valid_entry(), 1..20)) {
        let registry = DeviceRegistry::new(entries.clone());
        for entry in &entries {
            let expected = entries
                .iter()
                .position(|e| e.serial_number == entry.serial_number);
            prop_assert_eq!(registry.find_by_serial(&entry.serial_number), expected);
        }
    }

    #[test]
    fn find_misses_absent_serials(
        entries in prop::collection::vec(valid_entry(), 0..20),
        missing in "[0-9]{8}",
    ) {
        prop_assume!(entries.iter().all(|e| e.serial_number != missing));
        let registry = DeviceRegistry::new(entries);
        prop_assert_eq!(registry.find_by_serial(&missing), None);
    }

    #[test]
    fn valid_registry_passes(entries in prop::collection::vec(valid_entry(), 0..20)) {
        prop_assert!(DeviceRegistry::new(entries).validate().is_ok());
    }

    #[test]
    fn one_bad_entry_fails_everything(
        mut entries in prop::collection::vec(valid_entry(), 0..20),
        serial in bad_serial(),
        position in any::<prop::sample::Index>(),
    ) {
        let index = position.index(entries.len() + 1);
        entries.insert(index, DeviceEntry::new(serial, Brand::Luna));

        let RegistryError::InvalidSerialNumbers { entries: invalid } =
            DeviceRegistry::new(entries).validate().unwrap_err();
        prop_assert_eq!(invalid.len(), 1);
        prop_assert_eq!(invalid[0].index, index);
    }
}
