use std::path::PathBuf;

pub fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    4200
}

pub fn default_true() -> bool {
    true
}
