use std::{
    fs,
    io::{Read, Seek, SeekFrom},
};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::{raidblk, util::disks};

#[rstest]
#[case(3, "4096")]
#[case(4, "6144")]
fn info(#[case] n: usize, #[case] sectors: &str) {
    let (_tempdir, paths) = disks(n, 1 << 20);
    raidblk()
        .arg("info")
        .args(&paths)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("devices:         {n}")))
        .stdout(predicate::str::contains(
            format!("logical sectors: {sectors}")))
        .stdout(predicate::str::contains(
            format!("parity device:   {}", n - 1)));
}

#[test]
fn info_config() {
    let (tempdir, paths) = disks(3, 1 << 20);
    let yaml = format!("devices: [{}]\n",
        paths.iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "));
    let cfgpath = tempdir.path().join("array.yaml");
    fs::write(&cfgpath, yaml).unwrap();
    raidblk()
        .args(["info", "--config"])
        .arg(&cfgpath)
        .assert()
        .success()
        .stdout(predicate::str::contains("logical sectors: 4096"));
}

#[rstest]
#[case(2)]
#[case(5)]
fn wrong_device_count(#[case] n: usize) {
    let (_tempdir, paths) = disks(n, 1 << 20);
    raidblk()
        .arg("info")
        .args(&paths)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            format!("InvalidConfiguration({n})")));
}

#[test]
fn geometry_mismatch() {
    let (_tempdir, paths) = disks(3, 1 << 20);
    fs::File::options()
        .write(true)
        .open(&paths[1])
        .unwrap()
        .set_len(1 << 19)
        .unwrap();
    raidblk()
        .arg("info")
        .args(&paths)
        .assert()
        .failure()
        .stderr(predicate::str::contains("GeometryMismatch"));
}

/// Write through the array, check placement on the members, then read it back
#[test]
fn write_and_read() {
    let (tempdir, paths) = disks(4, 1 << 20);
    let input = tempdir.path().join("input");
    // Two sectors, the second one short
    let mut data = vec![0xa5u8; 512];
    data.extend(vec![0x5au8; 100]);
    fs::write(&input, &data).unwrap();

    raidblk()
        .args(["write", "--sector", "4", "--input"])
        .arg(&input)
        .args(&paths)
        .assert()
        .success();

    // Logical sector 4 is device 1, sector 1.  Logical 5 is device 2, sector 1.
    let mut buf = vec![0u8; 512];
    let mut f = fs::File::open(&paths[1]).unwrap();
    f.seek(SeekFrom::Start(512)).unwrap();
    f.read_exact(&mut buf).unwrap();
    assert_eq!(buf, vec![0xa5u8; 512]);
    let mut f = fs::File::open(&paths[2]).unwrap();
    f.seek(SeekFrom::Start(512)).unwrap();
    f.read_exact(&mut buf).unwrap();
    assert_eq!(&buf[0..100], &[0x5au8; 100][..]);
    assert_eq!(&buf[100..], &[0u8; 412][..]);

    raidblk()
        .args(["read", "--sector", "5", "--count", "1"])
        .args(&paths)
        .assert()
        .success()
        .stdout(predicate::str::contains("5a5a")
            .or(predicate::str::contains("5a 5a")));
}

#[test]
fn read_past_end() {
    let (_tempdir, paths) = disks(3, 1 << 20);
    raidblk()
        .args(["read", "--sector", "4095", "--count", "2"])
        .args(&paths)
        .assert()
        .failure()
        .stderr(predicate::str::contains("beyond the end of the array"));
}
