/// Format file size in human-readable format, using 1024 base and units B,K,M,G,T.
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "K", "M", "G", "T"];
    const THRESHOLD: u64 = 1024;
    if size < THRESHOLD {
        return format!("{size}B");
    }
    let mut size_f = size as f64;
    let mut unit_index = 0;
    while size_f >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size_f /= THRESHOLD as f64;
        unit_index += 1;
    }
    format!("{size_f:.1}{}", UNITS[unit_index])
}

/// Parse a byte count such as `8388608`, `512K`, `8M`, `8MiB` or `1G` (1024 base).
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(format!("invalid size '{input}': expected a number"));
    }
    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid size '{input}': {e}"))?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        "g" | "gb" | "gib" => 1024 * 1024 * 1024,
        other => return Err(format!("invalid size '{input}': unknown unit '{other}'")),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("invalid size '{input}': too large"))
}
