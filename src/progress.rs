/// Reads the percentage from a downloader line such as
/// `[download]  42.5% of 10.00MiB at 1.00MiB/s ETA 00:05`.
pub fn parse_progress(line: &str) -> Option<f32> {
    let rest = line.trim_start().strip_prefix("[download]")?;
    let (number, _) = rest.split_once('%')?;
    let value = number.trim().parse::<f32>().ok()?;
    Some((value / 100.0).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::parse_progress;

    #[test]
    fn reads_download_percentages() {
        assert_eq!(parse_progress("[download]  42.5% of 10.00MiB at 1.00MiB/s ETA 00:05"), Some(0.425));
        assert_eq!(parse_progress("[download] 100% of 10.00MiB in 00:10"), Some(1.0));
    }

    #[test]
    fn ignores_other_lines() {
        assert_eq!(parse_progress("[youtube] dQw4w9WgXcQ: Downloading webpage"), None);
        assert_eq!(parse_progress("[download] Destination: /tmp/video.mp4"), None);
        assert_eq!(parse_progress("50% done"), None);
    }
}
