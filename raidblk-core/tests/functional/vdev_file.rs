// vim: tw=80

mod basic {
    use raidblk_core::{
        BYTES_PER_SECTOR,
        Error,
        Owner,
        vdev::*,
        vdev_file::*
    };
    use divbuf::DivBufShared;
    use nix::errno::Errno;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use std::{
        fs,
        io::{Read, Seek, SeekFrom, Write},
        ops::Deref,
        path::PathBuf,
    };
    use tempfile::{Builder, TempDir};

    struct Harness {
        vdev: VdevFile,
        owner: Owner,
        path: PathBuf,
        _tempdir: TempDir
    }

    #[fixture]
    fn harness() -> Harness {
        let len = 1 << 20;  // 1MB
        let tempdir = Builder::new()
            .prefix("test_vdev_file_basic")
            .tempdir()
            .unwrap();
        let filename = tempdir.path().join("vdev");
        let file = fs::File::create(&filename).unwrap();
        file.set_len(len).unwrap();
        let pb = filename.canonicalize().unwrap();
        let owner = Owner::new_v4();
        let vdev = VdevFile::open(filename, owner).unwrap();
        Harness{vdev, owner, path: pb, _tempdir: tempdir}
    }

    // pet kcov
    #[rstest]
    fn debug(harness: Harness) {
        format!("{:?}", harness.vdev);
    }

    #[rstest]
    fn path(harness: Harness) {
        assert_eq!(harness.vdev.path(), harness.path);
    }

    #[rstest]
    fn sectors(harness: Harness) {
        assert_eq!(harness.vdev.sectors(), 2048);
    }

    /// A partial trailing sector is not usable
    #[test]
    fn sectors_round_down() {
        let dir = Builder::new()
            .prefix("test_sectors_round_down")
            .tempdir()
            .unwrap();
        let path = dir.path().join("vdev");
        let file = fs::File::create(&path).unwrap();
        file.set_len(3 * BYTES_PER_SECTOR as u64 + 100).unwrap();
        let vdev = VdevFile::open(path, Owner::new_v4()).unwrap();
        assert_eq!(vdev.sectors(), 3);
    }

    #[test]
    fn open_enoent() {
        let dir = Builder::new()
            .prefix("test_open_enoent")
            .tempdir()
            .unwrap();
        let path = dir.path().join("vdev");
        let e = VdevFile::open(path, Owner::new_v4()).unwrap_err();
        assert_eq!(e, Error::DeviceIo(Errno::ENOENT));
    }

    #[rstest]
    fn claimed(harness: Harness) {
        assert!(VdevFile::is_claimed(&harness.path));
        drop(harness.vdev);
        assert!(!VdevFile::is_claimed(&harness.path));
    }

    /// The same owner may open a device more than once.  The claim lasts until
    /// the last one is closed.
    #[rstest]
    fn reopen_same_owner(harness: Harness) {
        let vdev2 = VdevFile::open(&harness.path, harness.owner).unwrap();
        assert_eq!(vdev2.sectors(), harness.vdev.sectors());
        drop(harness.vdev);
        assert!(VdevFile::is_claimed(&harness.path));
        drop(vdev2);
        assert!(!VdevFile::is_claimed(&harness.path));
    }

    #[rstest]
    fn reopen_other_owner(harness: Harness) {
        let e = VdevFile::open(&harness.path, Owner::new_v4()).unwrap_err();
        assert_eq!(e, Error::DeviceIo(Errno::EBUSY));
        // Once released, anybody may have it
        drop(harness.vdev);
        VdevFile::open(&harness.path, Owner::new_v4()).unwrap();
    }

    /// Devices locked by somebody outside of raidblk are busy
    #[test]
    fn locked_elsewhere() {
        use nix::fcntl::{Flock, FlockArg};

        let dir = Builder::new()
            .prefix("test_locked_elsewhere")
            .tempdir()
            .unwrap();
        let path = dir.path().join("vdev");
        let file = fs::File::create(&path).unwrap();
        file.set_len(1 << 20).unwrap();
        let _lock = Flock::lock(file, FlockArg::LockExclusiveNonblock)
            .unwrap();
        let e = VdevFile::open(&path, Owner::new_v4()).unwrap_err();
        assert_eq!(e, Error::DeviceIo(Errno::EBUSY));
        assert!(!VdevFile::is_claimed(&path));
    }

    #[rstest]
    #[tokio::test]
    async fn read_at(harness: Harness) {
        // Create the test data
        let mut wbuf = vec![0u8; 2 * BYTES_PER_SECTOR];
        for (i, b) in wbuf.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        {
            let mut f = fs::OpenOptions::new()
                .write(true)
                .open(&harness.path)
                .unwrap();
            f.seek(SeekFrom::Start(7 * BYTES_PER_SECTOR as u64)).unwrap();
            f.write_all(&wbuf).unwrap();
        }

        let dbs = DivBufShared::from(vec![0u8; 2 * BYTES_PER_SECTOR]);
        let rbuf = dbs.try_mut().unwrap();
        harness.vdev.read_at(rbuf, 7).await.unwrap();
        assert_eq!(&wbuf[..], dbs.try_const().unwrap().deref());
    }

    #[rstest]
    #[tokio::test]
    async fn write_at(harness: Harness) {
        let dbs = DivBufShared::from(vec![42u8; BYTES_PER_SECTOR]);
        let wbuf = dbs.try_const().unwrap();
        harness.vdev.write_at(wbuf.clone(), 10).await.unwrap();

        let mut f = fs::File::open(&harness.path).unwrap();
        let mut rbuf = vec![0u8; BYTES_PER_SECTOR];
        f.seek(SeekFrom::Start(10 * BYTES_PER_SECTOR as u64)).unwrap();
        f.read_exact(&mut rbuf).unwrap();
        assert_eq!(rbuf, wbuf.deref());
    }

    #[rstest]
    #[tokio::test]
    async fn write_past_end(harness: Harness) {
        let dbs = DivBufShared::from(vec![42u8; 2 * BYTES_PER_SECTOR]);
        let wbuf = dbs.try_const().unwrap();
        let e = harness.vdev.write_at(wbuf, 2047).await.unwrap_err();
        assert_eq!(e, Error::DeviceIo(Errno::EIO));
    }

    /// Sector numbers so large that the byte offset would overflow
    #[rstest]
    #[case(u64::MAX)]
    #[case(u64::MAX / BYTES_PER_SECTOR as u64)]
    #[tokio::test]
    async fn read_huge_sector(harness: Harness, #[case] sector: u64) {
        let dbs = DivBufShared::from(vec![0u8; BYTES_PER_SECTOR]);
        let rbuf = dbs.try_mut().unwrap();
        let e = harness.vdev.read_at(rbuf, sector).await.unwrap_err();
        assert_eq!(e, Error::DeviceIo(Errno::EIO));
    }

    #[rstest]
    fn opener(harness: Harness) {
        let bd = FileOpener.open(&harness.path, harness.owner).unwrap();
        assert_eq!(bd.sectors(), 2048);
    }
}
