//! Command-line configuration

use crate::core::{Address, Prefix};
use clap::Parser;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(
    name = "krist-mining-client",
    about = "Mine krist using OpenCL devices",
    version
)]
pub struct Args {
    /// Address to mine for
    #[clap(value_name = "ADDRESS", default_value = "k5ztameslf")]
    pub address: Address,

    /// List OpenCL devices and exit
    #[clap(short = 'l', long = "list-devices")]
    pub list_devices: bool,

    /// Use all OpenCL devices to mine
    #[clap(short = 'a', long = "all-devices")]
    pub all_devices: bool,

    /// Use the best OpenCL device to mine
    #[clap(short = 'b', long = "best-device")]
    pub best_device: bool,

    /// Use OpenCL devices by ID to mine
    #[clap(short = 'd', long = "device-id", value_name = "ID")]
    pub device_ids: Vec<String>,

    /// Use OpenCL devices by position in the device list (0-based)
    #[clap(long = "device-num", value_name = "N")]
    pub device_nums: Vec<usize>,

    /// Krist node websocket bootstrap URL
    #[clap(
        long = "node",
        value_name = "URL",
        default_value = "https://krist.ceriat.net/ws/start"
    )]
    pub node: String,

    /// Vector width for all devices
    #[clap(short = 'V', long = "vector-width", value_name = "1|2|4|8|16")]
    pub vector_width: Option<u16>,

    /// Global work size for all devices
    #[clap(short = 'w', long = "worksize", value_name = "SIZE")]
    pub worksize: Option<usize>,

    /// Run tests on the selected miners and exit
    #[clap(short = 't', long = "only-test")]
    pub only_test: bool,

    /// Extra options for the OpenCL compiler
    #[clap(long = "cl-opts", value_name = "OPTIONS", default_value = "")]
    pub cl_opts: String,

    /// Increase log verbosity (repeatable)
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Stop mining after this many seconds
    #[clap(long = "exit-after", value_name = "SECONDS")]
    pub exit_after: Option<u64>,

    /// Mine against a synthetic network with the given fixed work value
    #[clap(long = "demo", value_name = "WORK")]
    pub demo: Option<i64>,

    /// Nonce prefix byte shared by all miners (default: random per miner)
    #[clap(long = "prefix", value_name = "0..255")]
    pub prefix: Option<u8>,
}

impl Args {
    /// The nonce prefix for the next miner; random unless `--prefix` is set
    pub fn miner_prefix(&self) -> Prefix {
        match self.prefix {
            Some(byte) => Prefix::from_byte(byte),
            None => Prefix::random(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["kmc"]).unwrap();
        assert_eq!(args.address.as_str(), "k5ztameslf");
        assert_eq!(args.node, "https://krist.ceriat.net/ws/start");
        assert_eq!(args.verbose, 0);
        assert!(!args.all_devices);
        assert!(args.vector_width.is_none());
    }

    #[test]
    fn test_address_is_validated() {
        assert!(Args::try_parse_from(["kmc", "tooshort"]).is_err());
        let args = Args::try_parse_from(["kmc", "kabcdefghi"]).unwrap();
        assert_eq!(args.address.as_str(), "kabcdefghi");
    }

    #[test]
    fn test_device_selection_flags() {
        let args = Args::try_parse_from([
            "kmc",
            "-a",
            "-d",
            "PCIE:01:00.0",
            "--device-num",
            "0",
            "--device-num",
            "2",
        ])
        .unwrap();

        assert!(args.all_devices);
        assert_eq!(args.device_ids, vec!["PCIE:01:00.0"]);
        assert_eq!(args.device_nums, vec![0, 2]);
    }

    #[test]
    fn test_mining_flags() {
        let args = Args::try_parse_from([
            "kmc",
            "-V",
            "4",
            "-w",
            "256",
            "--demo",
            "500000",
            "--exit-after",
            "30",
            "--prefix",
            "171",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.vector_width, Some(4));
        assert_eq!(args.worksize, Some(256));
        assert_eq!(args.demo, Some(500_000));
        assert_eq!(args.exit_after, Some(30));
        assert_eq!(args.miner_prefix().as_bytes(), b"ab");
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_fixed_prefix_is_stable() {
        let args = Args::try_parse_from(["kmc", "--prefix", "0"]).unwrap();
        assert_eq!(args.miner_prefix(), args.miner_prefix());
    }
}
