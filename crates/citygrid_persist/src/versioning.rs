use std::io::Cursor;

pub const CURRENT_SNAPSHOT_FORMAT_VERSION: u32 = 1;

pub fn peek_format_version(payload: &[u8]) -> Result<u32, String> {
    let mut cursor = Cursor::new(payload);
    bincode::deserialize_from::<_, u32>(&mut cursor)
        .map_err(|err| format!("failed to decode snapshot version prefix: {err}"))
}

pub fn ensure_supported(version: u32) -> Result<(), String> {
    if version == CURRENT_SNAPSHOT_FORMAT_VERSION {
        return Ok(());
    }
    Err(format!(
        "unsupported snapshot format version {version}; current version is {CURRENT_SNAPSHOT_FORMAT_VERSION}"
    ))
}
