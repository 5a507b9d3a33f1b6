use crate::error::Result;
use crate::model::Thumbnail;

/// Downloads and decodes the standard high-quality thumbnail of a video.
/// Blocking; run it on a blocking worker.
pub fn fetch_thumbnail(video_id: &str) -> Result<Thumbnail> {
    let url = format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg");
    let bytes = reqwest::blocking::get(&url)?.error_for_status()?.bytes()?;
    decode_thumbnail(&bytes)
}

fn decode_thumbnail(bytes: &[u8]) -> Result<Thumbnail> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Ok(Thumbnail { size, rgba: img.into_raw() })
}
