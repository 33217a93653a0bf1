//! Runtime configuration
//!
//! Default → environment (`USCALL_*`) → command line, urutan override yang
//! sama dengan yang dipakai binaries.

use std::str::FromStr;

use crate::core::StorageKind;

/// Sumber I/O yang dipakai adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Os,
    Stack,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "os" | "sys" | "kernel" => Ok(Self::Os),
            "stack" | "fstack" | "ff" => Ok(Self::Stack),
            other => Err(format!("unknown backend `{}`", other)),
        }
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heap" => Ok(Self::Heap),
            "mapped" | "mmap" => Ok(Self::Mapped),
            other => Err(format!("unknown storage `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: BackendKind,
    pub storage: StorageKind,
    /// Kapasitas slice per koneksi
    pub slice_capacity: u32,
    pub bind_addr: String,
    pub nonblocking: bool,
    pub reuse_port: bool,
    /// Path config F-Stack (`--conf` untuk ff_init)
    pub stack_conf: Option<String>,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Os,
            storage: StorageKind::Heap,
            slice_capacity: 1024,
            bind_addr: "0.0.0.0:8090".to_string(),
            nonblocking: true,
            reuse_port: true,
            stack_conf: None,
            verbose: false,
        }
    }
}

/// Binary yang mem-parse argumen; menentukan flag yang diterima
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// `uscall`: latency PoC, OS atau stack loop
    Latency,
    /// `uscall_echo`: echo server di OS backend
    Echo,
}

/// (label usage, flag panjang, keterangan)
const OPTIONS: &[(&str, &str, &str)] = &[
    ("-b, --bind <ADDR>", "--bind", "Bind address (default: 0.0.0.0:8090)"),
    ("    --backend <os|stack>", "--backend", "Loop backend (default: os)"),
    ("    --conf <PATH>", "--conf", "F-Stack config file"),
    ("-s, --storage <heap|mapped>", "--storage", "Slice storage (default: heap)"),
    ("-c, --capacity <BYTES>", "--capacity", "Slice capacity (default: 1024)"),
    ("    --blocking", "--blocking", "Keep accepted sockets blocking"),
    ("    --no-reuse", "--no-reuse", "Do not set SO_REUSEADDR"),
    ("-v, --verbose", "--verbose", "Debug logging and periodic stats"),
    ("-h, --help", "--help", "Show this help"),
];

impl Tool {
    pub fn program(self) -> &'static str {
        match self {
            Tool::Latency => "uscall",
            Tool::Echo => "uscall_echo",
        }
    }

    /// Flag panjang yang dipakai binary ini
    fn accepts(self, flag: &str) -> bool {
        match flag {
            "--storage" | "--capacity" | "--verbose" | "--help" => true,
            "--backend" | "--conf" => self == Tool::Latency,
            "--bind" | "--blocking" | "--no-reuse" => self == Tool::Echo,
            _ => false,
        }
    }
}

/// Normalisasi flag pendek ke flag panjang
fn long_flag(arg: &str) -> &str {
    match arg {
        "-b" => "--bind",
        "-s" => "--storage",
        "-c" => "--capacity",
        "-v" => "--verbose",
        "-h" => "--help",
        other => other,
    }
}

impl Config {
    /// Override dari environment variables `USCALL_*`
    pub fn apply_env(&mut self) -> Result<(), String> {
        self.apply_vars(std::env::vars())
    }

    fn apply_vars<I>(&mut self, vars: I) -> Result<(), String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "USCALL_BACKEND" => self.backend = value.parse()?,
                "USCALL_STORAGE" => self.storage = value.parse()?,
                "USCALL_SLICE_CAPACITY" => self.slice_capacity = parse_capacity(&value)?,
                "USCALL_BIND" => self.bind_addr = value,
                "USCALL_STACK_CONF" => self.stack_conf = Some(value),
                _ => {}
            }
        }
        Ok(())
    }

    /// Parse argumen command line (tanpa argv[0])
    ///
    /// `Ok(None)` jika `--help` diminta. Flag yang tidak dipakai `tool`
    /// ditolak, bukan diabaikan.
    pub fn with_args<I>(mut self, tool: Tool, args: I) -> Result<Option<Self>, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let flag = long_flag(&arg);
            if !tool.accepts(flag) {
                if OPTIONS.iter().any(|&(_, known, _)| known == flag) {
                    return Err(format!("`{}` is not supported by {}", arg, tool.program()));
                }
                return Err(format!("unknown argument `{}`", arg));
            }

            let mut value = || {
                args.next()
                    .ok_or_else(|| format!("missing value for {}", arg))
            };

            match flag {
                "--bind" => self.bind_addr = value()?,
                "--backend" => self.backend = value()?.parse()?,
                "--storage" => self.storage = value()?.parse()?,
                "--capacity" => self.slice_capacity = parse_capacity(&value()?)?,
                "--conf" => self.stack_conf = Some(value()?),
                "--blocking" => self.nonblocking = false,
                "--no-reuse" => self.reuse_port = false,
                "--verbose" => self.verbose = true,
                _ => return Ok(None),
            }
        }

        Ok(Some(self))
    }

    pub fn usage(tool: Tool) -> String {
        let mut usage = format!("Usage: {} [OPTIONS]\n\nOptions:", tool.program());
        for &(label, flag, help) in OPTIONS {
            if tool.accepts(flag) {
                usage.push_str(&format!("\n  {:<28} {}", label, help));
            }
        }
        usage
    }

    /// Argv untuk `ff_init`
    pub fn stack_args(&self, program: &str) -> Vec<String> {
        let mut argv = vec![program.to_string()];
        if let Some(conf) = &self.stack_conf {
            argv.push("--conf".to_string());
            argv.push(conf.clone());
        }
        argv
    }
}

fn parse_capacity(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(0) => Err("slice capacity must be greater than zero".to_string()),
        Ok(capacity) => Ok(capacity),
        Err(e) => Err(format!("invalid capacity `{}`: {}", value, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::Os);
        assert_eq!(config.slice_capacity, 1024);
        assert!(config.nonblocking);
    }

    #[test]
    fn test_with_args() {
        let config = Config::default()
            .with_args(
                Tool::Echo,
                args(&[
                    "--bind",
                    "127.0.0.1:9000",
                    "-s",
                    "mapped",
                    "-c",
                    "4096",
                    "--no-reuse",
                    "--blocking",
                ]),
            )
            .unwrap()
            .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.storage, StorageKind::Mapped);
        assert_eq!(config.slice_capacity, 4096);
        assert!(!config.reuse_port);
        assert!(!config.nonblocking);
    }

    #[test]
    fn test_latency_args() {
        let config = Config::default()
            .with_args(
                Tool::Latency,
                args(&["--backend", "stack", "--conf", "/etc/f-stack.conf", "-v"]),
            )
            .unwrap()
            .unwrap();

        assert_eq!(config.backend, BackendKind::Stack);
        assert_eq!(config.stack_conf.as_deref(), Some("/etc/f-stack.conf"));
        assert!(config.verbose);
    }

    #[test]
    fn test_help_and_errors() {
        let parse = |tool, list: &[&str]| Config::default().with_args(tool, args(list));

        assert_eq!(parse(Tool::Echo, &["-h"]).unwrap(), None);
        assert!(parse(Tool::Echo, &["--bind"]).is_err());
        assert!(parse(Tool::Echo, &["--capacity", "0"]).is_err());
        assert!(parse(Tool::Latency, &["--backend", "tap"]).is_err());
        assert_eq!(
            parse(Tool::Echo, &["--what"]).unwrap_err(),
            "unknown argument `--what`"
        );
    }

    #[test]
    fn test_flags_rejected_per_tool() {
        let parse = |tool, list: &[&str]| Config::default().with_args(tool, args(list));

        assert_eq!(
            parse(Tool::Latency, &["-b", "127.0.0.1:1"]).unwrap_err(),
            "`-b` is not supported by uscall"
        );
        assert!(parse(Tool::Latency, &["--blocking"]).is_err());
        assert!(parse(Tool::Latency, &["--no-reuse"]).is_err());
        assert_eq!(
            parse(Tool::Echo, &["--conf", "x.ini"]).unwrap_err(),
            "`--conf` is not supported by uscall_echo"
        );
        assert!(parse(Tool::Echo, &["--backend", "os"]).is_err());
    }

    #[test]
    fn test_usage_lists_only_accepted_flags() {
        let echo = Config::usage(Tool::Echo);
        assert!(echo.starts_with("Usage: uscall_echo"));
        assert!(echo.contains("--bind"));
        assert!(!echo.contains("--conf"));

        let latency = Config::usage(Tool::Latency);
        assert!(latency.contains("--conf"));
        assert!(latency.contains("--backend"));
        assert!(!latency.contains("--no-reuse"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_vars(vec![
                ("USCALL_BACKEND".to_string(), "ff".to_string()),
                ("USCALL_SLICE_CAPACITY".to_string(), "2048".to_string()),
                ("USCALL_STACK_CONF".to_string(), "/etc/f-stack.conf".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ])
            .unwrap();

        assert_eq!(config.backend, BackendKind::Stack);
        assert_eq!(config.slice_capacity, 2048);
        assert_eq!(
            config.stack_args("echo"),
            args(&["echo", "--conf", "/etc/f-stack.conf"])
        );
    }
}
