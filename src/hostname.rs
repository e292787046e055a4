//! Source host name reported in `@source_host`.

/// Return the machine's host name truncated at the first `.`.
///
/// Falls back to `localhost` when the name cannot be read.
pub fn short_hostname() -> String {
    shorten(&full_hostname().unwrap_or_else(|| "localhost".to_owned())).to_owned()
}

fn shorten(name: &str) -> &str {
    name.split_once('.').map_or(name, |(short, _)| short)
}

#[cfg(unix)]
fn full_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: `buf` is valid for writes of `buf.len()` bytes and gethostname
    // never writes past the supplied length.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..end]).into_owned();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(unix))]
fn full_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok().filter(|n| !n.is_empty())
}
