use serde::Deserialize;

use pcore::buf::COPY_CHUNK_SIZE;

// 16Mb cap on the metadata region, larger declared sizes are rejected
// before anything gets allocated
pub const MAX_METADATA_SIZE: u32 = 16 * 1024 * 1024;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Largest metadata payload accepted on read and produced on write.
    pub max_metadata_size: u32,
    /// Frame size used when copying the image payload during a rewrite.
    pub copy_chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_metadata_size: MAX_METADATA_SIZE,
            copy_chunk_size: COPY_CHUNK_SIZE,
        }
    }
}

impl Config {
    pub fn from_toml(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }
}
