mod common;

use pretty_assertions::assert_eq;
use romkit::metadata::{Region, Value};
use romkit::{ErrorKind, Platform, Status};

use common::*;

fn nsp() -> Vec<u8> {
    let xml = cnmt_xml();
    flat_container(
        b"PFS0",
        &[
            ("0123.cnmt.nca", &[0xEE; 64][..]),
            ("0123.cnmt.xml", xml.as_bytes()),
            ("c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0.nca", &[0xCC; 64][..]),
        ],
    )
}

#[test]
fn nsp_without_tool_falls_back_to_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "Game (USA).nsp", nsp());
    let runner = NoTools::default();
    let engine = engine(runner.clone());

    let report = engine.extract(&path, None);
    assert_eq!(report.platform, Some(Platform::Switch));
    assert_eq!(report.status, Status::Degraded);
    assert_eq!(report.metadata.product_code.get().map(String::as_str), Some(TITLE_ID));
    assert_eq!(report.metadata.specific.get("Title ID"), Some(&Value::Text(TITLE_ID.into())));
    assert!(
        report
            .errors
            .iter()
            .all(|e| e.kind == ErrorKind::ExternalToolUnavailable && !e.fatal)
    );
    assert_eq!(report.metadata.regions.iter().copied().collect::<Vec<_>>(), [Region::Usa]);
    assert_eq!(runner.calls(), 2);
}

#[test]
fn tool_absence_is_remembered_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(dir.path(), "a.nsp", nsp());
    let second = write(dir.path(), "b.nsp", nsp());
    let runner = NoTools::default();
    let engine = engine(runner.clone());

    engine.extract(&first, None);
    assert!(engine.decryptor().is_unavailable());
    let report = engine.extract(&second, None);
    assert_eq!(report.metadata.product_code.get().map(String::as_str), Some(TITLE_ID));
    // both tools probed once, for the first record of the first file
    assert_eq!(runner.calls(), 2);
}

#[test]
fn gamecube_banner() {
    let dir = tempfile::tempdir().unwrap();
    let image = gamecube_disc("GALE01", "SUPER SMASH BROS MELEE", &[("opening.bnr", banner("Melee", "Nintendo"))]);
    let path = write(dir.path(), "melee.gcm", image);

    let report = engine(NoTools::default()).extract(&path, None);
    assert_eq!(report.status, Status::Succeeded, "{:?}", report.errors);
    assert_eq!(report.metadata.product_code.get().map(String::as_str), Some("GALE"));
    assert_eq!(report.metadata.names.get("Banner Title").map(String::as_str), Some("Melee"));
    assert_eq!(report.metadata.publisher.get().map(String::as_str), Some("Nintendo"));
}

#[test]
fn gamecube_banner_with_bad_magic() {
    let dir = tempfile::tempdir().unwrap();
    let mut bnr = banner("Melee", "Nintendo");
    bnr[..4].copy_from_slice(b"XXXX");
    let image = gamecube_disc("GALE01", "SUPER SMASH BROS MELEE", &[("opening.bnr", bnr)]);
    let path = write(dir.path(), "melee.iso", image);

    let report = engine(NoTools::default()).extract(&path, Some(Platform::GameCube));
    assert_eq!(report.status, Status::Degraded);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::MalformedContainer);
    assert!(!report.errors[0].fatal);
    assert_eq!(report.metadata.product_code.get().map(String::as_str), Some("GALE"));
    assert!(!report.metadata.names.contains_key("Banner Title"));
}

#[test]
fn cue_with_missing_track_keeps_only_filename_guesses() {
    let dir = tempfile::tempdir().unwrap();
    let cue = "FILE \"Game (Track 1).bin\" BINARY\n  TRACK 01 MODE2/2352\n    INDEX 01 00:00:00\n";
    let path = write(dir.path(), "Game (Japan) (1997).cue", cue);

    let report = engine(NoTools::default()).extract(&path, Some(Platform::PlayStation));
    assert_eq!(report.status, Status::Failed);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::ResourceUnavailable);
    assert_eq!(report.metadata.regions.iter().copied().collect::<Vec<_>>(), [Region::Japan]);
    assert!(report.metadata.release_date.is_set());
    assert!(!report.metadata.product_code.is_set());
    assert!(report.metadata.specific.is_empty());
}

#[test]
fn xci_partition_past_end_is_treated_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let xml = cnmt_xml();
    let secure = flat_container(b"HFS0", &[("0123.cnmt.xml", xml.as_bytes())]);
    let mut update = flat_container(b"HFS0", &[("update.bin", &[1u8; 16][..])]);
    // first entry's size
    update[0x18..0x20].copy_from_slice(&(1u64 << 40).to_le_bytes());
    let path = write(dir.path(), "card.xci", xci(&[("update", &update[..]), ("secure", &secure[..])]));

    let report = engine(NoTools::default()).extract(&path, None);
    assert_eq!(report.status, Status::Degraded);
    assert!(report.errors.iter().any(|e| e.kind == ErrorKind::MalformedContainer));
    assert_eq!(report.metadata.specific.get("ROM Size"), Some(&Value::Text("1 GB".into())));
    assert_eq!(report.metadata.product_code.get().map(String::as_str), Some(TITLE_ID));
}

#[test]
fn xci_root_offset_overflow_keeps_metadata() {
    let dir = tempfile::tempdir().unwrap();
    // Key area in front of the header moves it to 0x1000.
    let mut image = vec![0u8; 0x1000];
    image.extend(xci(&[]));
    image[0x1130..0x1138].copy_from_slice(&u64::MAX.to_le_bytes());
    let path = write(dir.path(), "Card (Japan).xci", image);

    let report = engine(NoTools::default()).extract(&path, None);
    assert_eq!(report.status, Status::Degraded);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::MalformedContainer);
    assert!(report.errors[0].fatal);
    assert_eq!(report.metadata.regions.iter().copied().collect::<Vec<_>>(), [Region::Japan]);
}

#[test]
fn truncated_header_leaves_fields_unset() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "short.gba", [0u8; 0x20]);

    let report = engine(NoTools::default()).extract(&path, None);
    assert_eq!(report.status, Status::Degraded);
    assert_eq!(report.errors[0].kind, ErrorKind::MalformedContainer);
    assert!(report.metadata.names.is_empty());
    assert!(!report.metadata.product_code.is_set());
}

#[test]
fn report_serializes_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "x.z64", [0u8; 0x10]);
    let report = engine(NoTools::default()).extract(&path, None);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["platform"], "n64");
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["errors"][0]["kind"], "malformed_container");
}
