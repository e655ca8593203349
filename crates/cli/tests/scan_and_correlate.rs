use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::tempdir;

use mm_survey::commands::ScanRunMetadata;
use survey_core::layout::SurveyLayout;
use survey_core::model::sha256_hex;

const CORE_GUID: &str = "ABCD1234-5678-90AB-CDEF-111122223333";
const DRIVER_GUID: &str = "77777777-8888-9999-AAAA-BBBBBBBBCCCC";

fn firmware_bytes() -> Vec<u8> {
    (0u8..64).collect()
}

/// Image with one standalone MM module ("Core", UI + PE32 sections) and one
/// plain DXE driver ("Setup") that the default target set must ignore.
fn write_fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let image_path = dir.join("firmware.bin");
    fs::write(&image_path, firmware_bytes()).expect("write image");

    let manifest = serde_json::json!([
        {
            "kind": "file", "name": "Core", "guid": CORE_GUID, "type": 14,
            "offset": 0, "size": 32,
            "children": [
                { "kind": "section", "name": "Core", "type": 21,
                  "offset": 4, "size": 4, "header_size": 2 },
                { "kind": "section", "name": "Core", "type": 16,
                  "offset": 8, "size": 24, "header_size": 4 }
            ]
        },
        {
            "kind": "file", "name": "Setup", "guid": DRIVER_GUID, "type": 7,
            "offset": 32, "size": 16,
            "children": [
                { "kind": "section", "name": "Setup", "type": 16,
                  "offset": 36, "size": 12, "header_size": 4 }
            ]
        }
    ]);
    let manifest_path = dir.join("tree.json");
    fs::write(
        &manifest_path,
        serde_json::to_string_pretty(&manifest).expect("render manifest"),
    )
    .expect("write manifest");

    (image_path, manifest_path)
}

fn run_scan(dir: &Path, image_path: &Path, manifest_path: &Path) {
    cargo_bin_cmd!("mm-survey")
        .arg("scan")
        .arg("--image")
        .arg(image_path)
        .arg("--root")
        .arg(dir)
        .arg("--manifest")
        .arg(manifest_path)
        .assert()
        .success();
}

#[test]
fn scan_writes_report_artifact_and_metadata() {
    let dir = tempdir().expect("tempdir");
    let (image_path, manifest_path) = write_fixture(dir.path());

    cargo_bin_cmd!("mm-survey")
        .arg("scan")
        .arg("--image")
        .arg(&image_path)
        .arg("--root")
        .arg(dir.path())
        .arg("--manifest")
        .arg(&manifest_path)
        .assert()
        .success()
        .stdout(contains("Found 1 management-mode modules"));

    let image = firmware_bytes();
    let layout = SurveyLayout::new(dir.path());

    // One report line: name, GUID, type label, file hash.
    let report = fs::read_to_string(&layout.scan_report_path).expect("read scan report");
    assert_eq!(
        report,
        format!("Core {CORE_GUID} FV_MM_STANDALONE {}\n", sha256_hex(&image[0..32]))
    );

    // Extracted artifact carries the PE32 payload with its header stripped.
    let artifact = layout.artifact_path(&format!("{CORE_GUID}_Core"));
    assert_eq!(fs::read(&artifact).expect("read artifact"), image[12..32].to_vec());
    // The driver is outside the target set; nothing of it is written.
    assert!(!layout.artifact_path(&format!("{DRIVER_GUID}_Setup")).exists());

    let metadata: ScanRunMetadata = serde_json::from_str(
        &fs::read_to_string(&layout.run_metadata_path).expect("read metadata"),
    )
    .expect("parse metadata");
    assert_eq!(metadata.source, "manifest");
    assert_eq!(metadata.module_count, 1);
    assert_eq!(metadata.extracted_count, 1);
    assert_eq!(metadata.duplicate_count, 0);
    assert!(metadata.extract);
    assert_eq!(metadata.image_hash, sha256_hex(&image));
    assert_eq!(metadata.target_types.len(), 5);
    assert_eq!(metadata.target_types[0], "FV_MM_STANDALONE");
    assert!(!metadata.started_at.is_empty());
    assert!(!metadata.finished_at.is_empty());
}

#[test]
fn scan_then_correlate_produces_handler_report() {
    let dir = tempdir().expect("tempdir");
    let (image_path, manifest_path) = write_fixture(dir.path());
    run_scan(dir.path(), &image_path, &manifest_path);

    // Analysis record named after the extracted artifact.
    let analysis_dir = dir.path().join("analysis");
    fs::create_dir_all(&analysis_dir).expect("create analysis dir");
    fs::write(
        analysis_dir.join(format!("{CORE_GUID}_Core.json")),
        "{\n\"SwMmiHandler\": \"0x4000\",\n\"HwNotifyHandler\": \"0x4100\",\n\"size\": 512\n}\n",
    )
    .expect("write analysis record");

    cargo_bin_cmd!("mm-survey")
        .arg("correlate")
        .arg("--root")
        .arg(dir.path())
        .arg("--analysis-dir")
        .arg(&analysis_dir)
        .assert()
        .success()
        .stdout(contains("Correlated 1 of 1 modules"));

    let layout = SurveyLayout::new(dir.path());
    let report = fs::read_to_string(&layout.handler_report_path).expect("read handler report");
    assert_eq!(report, format!("Core  {CORE_GUID}\nSwMmiHandler\nHwNotifyHandler\n"));
}

#[test]
fn scan_no_extract_classifies_without_writing_artifacts() {
    let dir = tempdir().expect("tempdir");
    let (image_path, manifest_path) = write_fixture(dir.path());

    cargo_bin_cmd!("mm-survey")
        .arg("scan")
        .arg("--image")
        .arg(&image_path)
        .arg("--root")
        .arg(dir.path())
        .arg("--manifest")
        .arg(&manifest_path)
        .arg("--no-extract")
        .assert()
        .success()
        .stdout(contains("Extraction disabled"));

    let layout = SurveyLayout::new(dir.path());
    assert!(layout.scan_report_path.exists());
    let artifacts = fs::read_dir(&layout.modules_dir).expect("read modules dir").count();
    assert_eq!(artifacts, 0);

    let metadata: ScanRunMetadata = serde_json::from_str(
        &fs::read_to_string(&layout.run_metadata_path).expect("read metadata"),
    )
    .expect("parse metadata");
    assert!(!metadata.extract);
    assert_eq!(metadata.module_count, 1);
    assert_eq!(metadata.extracted_count, 0);
}

#[test]
fn scan_json_mode_emits_matched_modules() {
    let dir = tempdir().expect("tempdir");
    let (image_path, manifest_path) = write_fixture(dir.path());

    let output = cargo_bin_cmd!("mm-survey")
        .arg("scan")
        .arg("--image")
        .arg(&image_path)
        .arg("--root")
        .arg(dir.path())
        .arg("--manifest")
        .arg(&manifest_path)
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let body: serde_json::Value = serde_json::from_slice(&output).expect("scan json");
    let modules = body.as_array().expect("json array");
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0]["name"], "Core");
    assert_eq!(modules[0]["guid"], CORE_GUID);
    assert_eq!(modules[0]["type_label"], "FV_MM_STANDALONE");
}

#[test]
fn scan_types_flag_retargets_the_scan() {
    let dir = tempdir().expect("tempdir");
    let (image_path, manifest_path) = write_fixture(dir.path());

    cargo_bin_cmd!("mm-survey")
        .arg("scan")
        .arg("--image")
        .arg(&image_path)
        .arg("--root")
        .arg(dir.path())
        .arg("--manifest")
        .arg(&manifest_path)
        .arg("--types")
        .arg("FV_DRIVER")
        .assert()
        .success();

    let image = firmware_bytes();
    let layout = SurveyLayout::new(dir.path());
    let report = fs::read_to_string(&layout.scan_report_path).expect("read scan report");
    assert_eq!(
        report,
        format!("Setup {DRIVER_GUID} FV_DRIVER {}\n", sha256_hex(&image[32..48]))
    );
    let artifact = layout.artifact_path(&format!("{DRIVER_GUID}_Setup"));
    assert_eq!(fs::read(&artifact).expect("read artifact"), image[40..48].to_vec());
}

#[test]
fn scan_counts_repeated_module_identities() {
    let dir = tempdir().expect("tempdir");
    let image_path = dir.path().join("firmware.bin");
    fs::write(&image_path, firmware_bytes()).expect("write image");

    // Same (GUID, name) appears twice, as it does when a vendor ships the
    // same module in two volumes.
    let manifest = serde_json::json!([
        {
            "kind": "file", "name": "Core", "guid": CORE_GUID, "type": 14,
            "offset": 0, "size": 16,
            "children": [
                { "kind": "section", "name": "Core", "type": 16,
                  "offset": 0, "size": 16, "header_size": 4 }
            ]
        },
        {
            "kind": "file", "name": "Core", "guid": CORE_GUID, "type": 14,
            "offset": 16, "size": 16,
            "children": [
                { "kind": "section", "name": "Core", "type": 16,
                  "offset": 16, "size": 16, "header_size": 4 }
            ]
        }
    ]);
    let manifest_path = dir.path().join("tree.json");
    fs::write(&manifest_path, manifest.to_string()).expect("write manifest");

    cargo_bin_cmd!("mm-survey")
        .arg("scan")
        .arg("--image")
        .arg(&image_path)
        .arg("--root")
        .arg(dir.path())
        .arg("--manifest")
        .arg(&manifest_path)
        .assert()
        .success()
        .stdout(contains("Duplicate modules: 1"));

    let layout = SurveyLayout::new(dir.path());
    let report = fs::read_to_string(&layout.scan_report_path).expect("read scan report");
    assert_eq!(report.lines().count(), 2);

    let metadata: ScanRunMetadata = serde_json::from_str(
        &fs::read_to_string(&layout.run_metadata_path).expect("read metadata"),
    )
    .expect("parse metadata");
    assert_eq!(metadata.module_count, 2);
    assert_eq!(metadata.duplicate_count, 1);
    // Both sightings extract; the later write lands on the same artifact name.
    assert_eq!(metadata.extracted_count, 2);
    let artifact = layout.artifact_path(&format!("{CORE_GUID}_Core"));
    assert_eq!(fs::read(&artifact).expect("read artifact"), firmware_bytes()[20..32].to_vec());
}

#[test]
fn correlate_json_mode_emits_joined_modules() {
    let dir = tempdir().expect("tempdir");
    let (image_path, manifest_path) = write_fixture(dir.path());
    run_scan(dir.path(), &image_path, &manifest_path);

    let analysis_dir = dir.path().join("analysis");
    fs::create_dir_all(&analysis_dir).expect("create analysis dir");
    fs::write(
        analysis_dir.join(format!("{CORE_GUID}_Core.json")),
        "{\n\"SwMmiHandler\": \"0x4000\"\n}\n",
    )
    .expect("write analysis record");

    let output = cargo_bin_cmd!("mm-survey")
        .arg("correlate")
        .arg("--root")
        .arg(dir.path())
        .arg("--analysis-dir")
        .arg(&analysis_dir)
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let body: serde_json::Value = serde_json::from_slice(&output).expect("correlate json");
    let modules = body.as_array().expect("json array");
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0]["name"], "Core");
    assert_eq!(modules[0]["guid"], CORE_GUID);
    assert_eq!(modules[0]["type_label"], "FV_MM_STANDALONE");
    assert_eq!(modules[0]["handlers"], serde_json::json!(["SwMmiHandler"]));
}
