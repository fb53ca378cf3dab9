// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }
}

/// Order in which sibling bit-fields are allocated inside their backing word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitOrder {
    LsbFirst,
    MsbFirst,
}

impl BitOrder {
    /// The SysV convention: bit-fields grow from the low-order bit on
    /// little-endian targets and from the high-order bit on big-endian ones.
    pub fn native_for(endianness: Endianness) -> Self {
        match endianness {
            Endianness::Little => Self::LsbFirst,
            Endianness::Big => Self::MsbFirst,
        }
    }
}

/// Widths, in bytes, of the C types whose size depends on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub pointer_width: usize,
    pub size_t_width: usize,
    pub long_width: usize,
    pub time_t_width: usize,
    /// Alignment of 8-byte scalars; i386 SysV only aligns them to 4.
    pub max_scalar_alignment: usize,
    pub endianness: Endianness,
}

impl Platform {
    pub fn native() -> Self {
        Self {
            pointer_width: std::mem::size_of::<*const u8>(),
            size_t_width: std::mem::size_of::<libc::size_t>(),
            long_width: std::mem::size_of::<libc::c_long>(),
            time_t_width: std::mem::size_of::<libc::time_t>(),
            max_scalar_alignment: std::mem::align_of::<u64>(),
            endianness: Endianness::native(),
        }
    }

    /// Linux/macOS 64-bit.
    pub fn lp64() -> Self {
        Self {
            pointer_width: 8,
            size_t_width: 8,
            long_width: 8,
            time_t_width: 8,
            max_scalar_alignment: 8,
            endianness: Endianness::Little,
        }
    }

    /// Windows 64-bit: `long` stays 4 bytes.
    pub fn llp64() -> Self {
        Self {
            long_width: 4,
            ..Self::lp64()
        }
    }

    /// 32-bit targets with 8-byte aligned 64-bit scalars (ARM EABI).
    pub fn ilp32() -> Self {
        Self {
            pointer_width: 4,
            size_t_width: 4,
            long_width: 4,
            time_t_width: 4,
            max_scalar_alignment: 8,
            endianness: Endianness::Little,
        }
    }

    /// Natural alignment of a scalar of `size` bytes on this platform.
    pub fn scalar_alignment(&self, size: usize) -> usize {
        size.min(self.max_scalar_alignment).max(1)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::native()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub platform: Platform,
    pub bit_order: BitOrder,
    /// Zero every padding byte before the fields of a struct are written.
    pub zero_fill_padding: bool,
    /// Pack applied to descriptors that do not carry their own.
    pub default_pack: Option<usize>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::for_platform(Platform::native())
    }
}

impl LayoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_platform(platform: Platform) -> Self {
        Self {
            bit_order: BitOrder::native_for(platform.endianness),
            platform,
            zero_fill_padding: false,
            default_pack: None,
        }
    }

    pub fn with_bit_order(mut self, bit_order: BitOrder) -> Self {
        self.bit_order = bit_order;
        self
    }

    pub fn with_zero_fill_padding(mut self, enabled: bool) -> Self {
        self.zero_fill_padding = enabled;
        self
    }

    pub fn with_default_pack(mut self, pack: usize) -> Self {
        self.default_pack = Some(pack);
        self
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let ext = path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let config: Self = match ext.to_lowercase().as_str() {
            "json" => serde_json::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        let ext = path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("json");

        let contents = match ext.to_lowercase().as_str() {
            "json" => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::SerializeError(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        fs::write(path, contents)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.platform;
        if !matches!(p.pointer_width, 4 | 8) {
            return Err(ConfigError::ValidationError(format!(
                "pointer_width must be 4 or 8, got {}",
                p.pointer_width
            )));
        }
        for (name, width) in [
            ("size_t_width", p.size_t_width),
            ("long_width", p.long_width),
            ("time_t_width", p.time_t_width),
        ] {
            if !matches!(width, 4 | 8) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be 4 or 8, got {}",
                    name, width
                )));
            }
        }
        if !p.max_scalar_alignment.is_power_of_two() {
            return Err(ConfigError::ValidationError(
                "max_scalar_alignment must be a power of two".to_string(),
            ));
        }
        if let Some(pack) = self.default_pack {
            if !pack.is_power_of_two() {
                return Err(ConfigError::ValidationError(format!(
                    "default_pack must be a power of two, got {}",
                    pack
                )));
            }
        }
        Ok(())
    }
}
