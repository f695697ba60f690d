use std::{
    fs,
    path::PathBuf,
    process::exit,
};

use clap::{crate_version, Parser};
use divbuf::DivBufShared;
use raidblk_core::{
    config::ArrayConfig,
    raid::Array,
    vdev_file::FileOpener,
    div_roundup,
    Result,
    SectorT,
    BYTES_PER_SECTOR,
};
use tracing_subscriber::EnvFilter;

/// How to find the array's members
#[derive(clap::Args, Clone, Debug)]
struct Members {
    /// Array configuration file, in YAML
    #[clap(short, long, conflicts_with = "devices",
           required_unless_present = "devices")]
    config: Option<PathBuf>,
    /// Member devices, in array order.  The last is reserved for parity.
    devices: Vec<PathBuf>,
}

impl Members {
    async fn assemble(&self) -> Result<Array> {
        let config = match &self.config {
            Some(path) => ArrayConfig::from_file(path)?,
            None => ArrayConfig::new(&self.devices)
        };
        Array::assemble_with(&FileOpener, &config).await
    }
}

/// Exit unless `count` sectors starting at `sector` fit within the array.
fn check_bounds(array: &Array, sector: SectorT, count: SectorT) {
    if sector.checked_add(count).map(|end| end > array.sectors())
        .unwrap_or(true)
    {
        eprintln!("Error: sectors {}..{} are beyond the end of the array \
                   ({} sectors)", sector, sector.saturating_add(count),
                   array.sectors());
        exit(1);
    }
}

#[derive(Parser, Clone, Debug)]
/// Assemble an array and describe its geometry
struct Info {
    #[clap(flatten)]
    members: Members,
}

impl Info {
    async fn main(self) -> Result<()> {
        let array = self.members.assemble().await?;
        let geom = *array.geometry();
        let parity = geom.parity_device();
        println!("devices:         {}", geom.devices());
        println!("data devices:    {}", geom.data_devices());
        println!("parity device:   {} ({})", parity,
                 array.path(parity).display());
        println!("sectors/device:  {}", geom.sectors_per_device());
        println!("logical sectors: {}", geom.sectors());
        println!("capacity:        {} bytes",
                 geom.sectors() * BYTES_PER_SECTOR as u64);
        array.teardown();
        Ok(())
    }
}

#[derive(Parser, Clone, Debug)]
/// Read sectors from an array and dump them in hex
struct Read {
    /// First logical sector
    #[clap(short, long)]
    sector: SectorT,
    /// Number of sectors
    #[clap(short = 'n', long, default_value_t = 1)]
    count: SectorT,
    #[clap(flatten)]
    members: Members,
}

impl Read {
    async fn main(self) -> Result<()> {
        let array = self.members.assemble().await?;
        check_bounds(&array, self.sector, self.count);
        let len = self.count as usize * BYTES_PER_SECTOR;
        let dbs = DivBufShared::from(vec![0u8; len]);
        let r = array.read_at(dbs.try_mut().unwrap(), self.sector).await;
        array.teardown();
        r?;
        let db = dbs.try_const().unwrap();
        for line in hexdump::hexdump_iter(&db[..]) {
            println!("{}", &*line);
        }
        Ok(())
    }
}

#[derive(Parser, Clone, Debug)]
/// Write a file's contents to an array.
///
/// The data is zero-padded to a whole number of sectors.
struct Write {
    /// First logical sector
    #[clap(short, long)]
    sector: SectorT,
    /// File to write
    #[clap(short, long)]
    input: PathBuf,
    #[clap(flatten)]
    members: Members,
}

impl Write {
    async fn main(self) -> Result<()> {
        let mut data = fs::read(&self.input)?;
        let count = div_roundup(data.len(), BYTES_PER_SECTOR);
        data.resize(count * BYTES_PER_SECTOR, 0);
        let array = self.members.assemble().await?;
        check_bounds(&array, self.sector, count as SectorT);
        let dbs = DivBufShared::from(data);
        let r = array.write_at(dbs.try_const().unwrap(), self.sector).await;
        array.teardown();
        r?;
        tracing::info!(sector = self.sector, count, "wrote");
        Ok(())
    }
}

#[derive(Parser, Clone, Debug)]
enum SubCommand {
    Info(Info),
    Read(Read),
    Write(Write),
}

#[derive(Parser, Clone, Debug)]
#[clap(version = crate_version!())]
/// Stripe sectors across a set of block devices
struct Cli {
    #[clap(subcommand)]
    cmd: SubCommand,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli: Cli = Cli::parse();
    match cli.cmd {
        SubCommand::Info(info) => info.main().await,
        SubCommand::Read(read) => read.main().await,
        SubCommand::Write(write) => write.main().await,
    }
}
