//! Maps a download request to the downloader's argument vector.

use crate::config::Settings;
use crate::model::{DownloadRequest, OutputFormat, Quality};

/// Output file name relative to the destination directory.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Fallback-chain selector telling the downloader which streams to pick.
pub fn format_selector(quality: Quality, format: OutputFormat, settings: &Settings) -> String {
    if format.is_audio() {
        return "bestaudio/best".to_string();
    }

    match (quality, quality.height()) {
        (Quality::Best, _) => format!(
            "best[ext={}]/best[height<={}]/best",
            settings.default_container.extension(),
            settings.max_height
        ),
        (Quality::Worst, _) => "worst/worstvideo+worstaudio".to_string(),
        (_, Some(height)) => format!("best[height<={height}]/best"),
        (_, None) => "best".to_string(),
    }
}

pub fn build_args(request: &DownloadRequest, settings: &Settings) -> Vec<String> {
    let output = request.destination.join(OUTPUT_TEMPLATE);
    let mut args = vec![
        "--output".to_owned(),
        output.to_string_lossy().into_owned(),
        "--format".to_owned(),
        format_selector(request.quality, request.format, settings),
        "--no-playlist".to_owned(),
        "--embed-metadata".to_owned(),
    ];

    if let Some(browser) = &settings.cookies_from_browser {
        args.push("--cookies-from-browser".to_owned());
        args.push(browser.clone());
    }

    args.push("--user-agent".to_owned());
    args.push(settings.user_agent.clone());
    // one progress update per line so output can be streamed
    args.push("--newline".to_owned());

    let ext = request.format.extension();
    if request.format.is_audio() {
        let quality = if request.format == OutputFormat::Mp3 {
            settings.mp3_bitrate.as_str()
        } else {
            "0"
        };
        args.extend(
            ["--extract-audio", "--audio-format", ext, "--audio-quality", quality]
                .map(String::from),
        );
    } else if request.format != settings.default_container {
        args.push("--recode-video".to_owned());
        args.push(ext.to_owned());
    }

    args.push(request.url.clone());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(quality: Quality, format: OutputFormat) -> DownloadRequest {
        DownloadRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            destination: PathBuf::from("/tmp/videos"),
            quality,
            format,
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn fixed_heights_appear_in_selector() {
        let settings = Settings::default();
        for quality in Quality::ALL {
            let selector = format_selector(quality, OutputFormat::Mp4, &settings);
            match quality.height() {
                Some(h) => assert_eq!(selector, format!("best[height<={h}]/best")),
                None if quality == Quality::Best => {
                    assert_eq!(selector, "best[ext=mp4]/best[height<=2160]/best")
                }
                None => assert_eq!(selector, "worst/worstvideo+worstaudio"),
            }
        }
    }

    #[test]
    fn audio_formats_always_pick_best_audio() {
        let settings = Settings::default();
        for format in OutputFormat::ALL.into_iter().filter(|f| f.is_audio()) {
            for quality in Quality::ALL {
                assert_eq!(format_selector(quality, format, &settings), "bestaudio/best");
            }
        }
    }

    #[test]
    fn mp4_needs_no_recode() {
        let args = build_args(&request(Quality::P720, OutputFormat::Mp4), &Settings::default());
        assert_eq!(value_after(&args, "--format"), Some("best[height<=720]/best"));
        assert!(!args.iter().any(|a| a == "--recode-video" || a == "--extract-audio"));
        assert!(args.iter().any(|a| a == "--no-playlist"));
        assert!(args.iter().any(|a| a == "--embed-metadata"));
        assert_eq!(value_after(&args, "--cookies-from-browser"), Some("firefox"));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/dQw4w9WgXcQ"));
    }

    #[test]
    fn other_containers_are_recoded() {
        let args = build_args(&request(Quality::Best, OutputFormat::Mkv), &Settings::default());
        assert_eq!(value_after(&args, "--recode-video"), Some("mkv"));
    }

    #[test]
    fn mp3_uses_fixed_bitrate_and_others_highest() {
        let settings = Settings::default();
        let mp3 = build_args(&request(Quality::P1080, OutputFormat::Mp3), &settings);
        assert!(mp3.iter().any(|a| a == "--extract-audio"));
        assert_eq!(value_after(&mp3, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&mp3, "--audio-quality"), Some("192K"));

        let flac = build_args(&request(Quality::P1080, OutputFormat::Flac), &settings);
        assert_eq!(value_after(&flac, "--audio-format"), Some("flac"));
        assert_eq!(value_after(&flac, "--audio-quality"), Some("0"));
        assert!(!flac.iter().any(|a| a == "--recode-video"));
    }

    #[test]
    fn output_lands_in_destination() {
        let args = build_args(&request(Quality::Worst, OutputFormat::Webm), &Settings::default());
        let expected = PathBuf::from("/tmp/videos").join("%(title)s.%(ext)s");
        assert_eq!(value_after(&args, "--output"), expected.to_str());
    }

    #[test]
    fn cookie_flag_is_optional() {
        let settings = Settings { cookies_from_browser: None, ..Settings::default() };
        let args = build_args(&request(Quality::Best, OutputFormat::Mp4), &settings);
        assert!(!args.iter().any(|a| a == "--cookies-from-browser"));
    }
}
