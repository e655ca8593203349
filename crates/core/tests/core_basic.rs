use survey_core::model::{Guid, ModuleType, SectionType};
use survey_core::version;

#[test]
fn version_is_non_empty() {
    let v = version();
    assert!(!v.is_empty());
}

#[test]
fn guid_display_is_uppercase_hyphenated() {
    let guid: Guid = "8c8ce578-8a3d-4f1c-9935-896185c32dd3".parse().expect("guid");
    assert_eq!(guid.to_string(), "8C8CE578-8A3D-4F1C-9935-896185C32DD3");
}

#[test]
fn guid_parses_any_case() {
    let lower: Guid = "abcd1234-5678-90ab-cdef-111122223333".parse().expect("lower");
    let upper: Guid = "ABCD1234-5678-90AB-CDEF-111122223333".parse().expect("upper");
    assert_eq!(lower, upper);
}

#[test]
fn guid_rejects_garbage() {
    assert!("not-a-guid".parse::<Guid>().is_err());
}

#[test]
fn guid_serde_round_trips_through_display_form() {
    let guid: Guid = "abcd1234-5678-90ab-cdef-111122223333".parse().expect("guid");
    let json = serde_json::to_string(&guid).expect("serialize");
    assert_eq!(json, "\"ABCD1234-5678-90AB-CDEF-111122223333\"");
    let back: Guid = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, guid);
}

#[test]
fn module_type_codes_round_trip() {
    for t in ModuleType::ALL {
        assert_eq!(ModuleType::from_code(t.code()), Some(t));
    }
}

#[test]
fn module_type_table_matches_pi_codes() {
    assert_eq!(ModuleType::Raw.code(), 0x01);
    assert_eq!(ModuleType::Mm.code(), 0x0A);
    assert_eq!(ModuleType::CombinedMmDxe.code(), 0x0C);
    assert_eq!(ModuleType::MmCore.code(), 0x0D);
    assert_eq!(ModuleType::MmStandalone.code(), 0x0E);
    assert_eq!(ModuleType::MmCoreStandalone.code(), 0x0F);
    assert_eq!(ModuleType::Pad.code(), 0xF0);
    assert_eq!(ModuleType::MmStandalone.label(), "FV_MM_STANDALONE");
    assert_eq!(ModuleType::Pad.label(), "FV_FFS_PAD");
}

#[test]
fn module_type_from_code_rejects_unknown() {
    assert_eq!(ModuleType::from_code(0x42), None);
    assert_eq!(ModuleType::from_code(0x00), None);
}

#[test]
fn module_type_parse_spec_accepts_labels_and_codes() {
    assert_eq!(ModuleType::parse_spec("FV_MM_STANDALONE"), Some(ModuleType::MmStandalone));
    assert_eq!(ModuleType::parse_spec("mm_standalone"), Some(ModuleType::MmStandalone));
    assert_eq!(ModuleType::parse_spec("fv_mm"), Some(ModuleType::Mm));
    assert_eq!(ModuleType::parse_spec("0x0E"), Some(ModuleType::MmStandalone));
    assert_eq!(ModuleType::parse_spec("14"), Some(ModuleType::MmStandalone));
    assert_eq!(ModuleType::parse_spec(" 0x0c "), Some(ModuleType::CombinedMmDxe));
    assert_eq!(ModuleType::parse_spec("FV_NOPE"), None);
    assert_eq!(ModuleType::parse_spec("0x42"), None);
    assert_eq!(ModuleType::parse_spec(""), None);
}

#[test]
fn section_type_codes_round_trip() {
    for t in SectionType::ALL {
        assert_eq!(SectionType::from_code(t.code()), Some(t));
    }
}

#[test]
fn executable_sections_are_exactly_the_code_kinds() {
    let executable: Vec<SectionType> =
        SectionType::ALL.iter().copied().filter(|t| t.is_executable()).collect();
    assert_eq!(
        executable,
        vec![
            SectionType::Pe32,
            SectionType::Pic,
            SectionType::Te,
            SectionType::Compatibility16
        ]
    );
    assert!(!SectionType::UserInterface.is_executable());
    assert!(!SectionType::Raw.is_executable());
}
