use std::path::{Path, PathBuf};
use std::process::Stdio;

use camera_motion_common::config::InputConfig;
use camera_motion_common::frame::{Frame, FrameError};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("unsupported input {0}: expected a video, an image or a directory of images")]
    Unsupported(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),
    #[error("{0} not found on PATH; install ffmpeg to read video files")]
    FfmpegMissing(String),
    #[error("ffprobe failed: {0}")]
    Probe(String),
    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),
    #[error("decoding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Video,
    Image,
    Directory,
}

impl InputKind {
    pub fn detect(path: &Path) -> Result<Self, SourceError> {
        if path.is_dir() {
            return Ok(Self::Directory);
        }
        match extension(path).as_deref() {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => Ok(Self::Video),
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => Ok(Self::Image),
            _ => Err(SourceError::Unsupported(path.to_path_buf())),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Decode `path` into an ordered RGB frame sequence.
pub async fn load_frames(path: &Path, input: &InputConfig) -> Result<Vec<Frame>, SourceError> {
    let kind = InputKind::detect(path)?;
    debug!(path = %path.display(), ?kind, "reading input");
    let frames = match kind {
        InputKind::Video => read_video(path, input).await?,
        InputKind::Image => {
            let path = path.to_path_buf();
            vec![tokio::task::spawn_blocking(move || decode_image(0, &path)).await??]
        }
        InputKind::Directory => read_image_dir(path, input.max_frames).await?,
    };
    info!(path = %path.display(), frames = frames.len(), "input decoded");
    Ok(frames)
}

fn decode_image(index: usize, path: &Path) -> Result<Frame, SourceError> {
    let rgb = image::open(path)
        .map_err(|source| SourceError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::rgb(index, width, height, rgb.into_raw())?)
}

async fn read_image_dir(dir: &Path, max_frames: usize) -> Result<Vec<Frame>, SourceError> {
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if path.is_file()
            && extension(&path).is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
        {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    if max_frames > 0 {
        paths.truncate(max_frames);
    }
    debug!(dir = %dir.display(), images = paths.len(), "image directory listed");

    tokio::task::spawn_blocking(move || {
        paths
            .iter()
            .enumerate()
            .map(|(index, path)| decode_image(index, path))
            .collect::<Result<Vec<_>, _>>()
    })
    .await?
}

/// Check whether ffmpeg is available on PATH.
pub async fn check_ffmpeg_available(ffmpeg: &str) -> bool {
    match Command::new(ffmpeg).arg("-version").output().await {
        Ok(out) if out.status.success() => {
            debug!(ffmpeg, "ffmpeg is available");
            true
        }
        Ok(_) => {
            warn!(ffmpeg, "ffmpeg returned non-zero for -version; decoding may fail");
            true
        }
        Err(e) => {
            warn!(ffmpeg, error = %e, "ffmpeg not found");
            false
        }
    }
}

async fn probe_dimensions(ffprobe: &str, path: &Path) -> Result<(u32, u32), SourceError> {
    let output = Command::new(ffprobe)
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height",
            "-of", "csv=s=x:p=0",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| SourceError::Probe(format!("failed to spawn {ffprobe}: {e}")))?;
    if !output.status.success() {
        return Err(SourceError::Probe(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    parse_dimensions(&String::from_utf8_lossy(&output.stdout))
}

/// Parse ffprobe's `WIDTHxHEIGHT` line.
fn parse_dimensions(text: &str) -> Result<(u32, u32), SourceError> {
    let line = text.lines().next().unwrap_or("").trim();
    let parsed = line
        .split_once('x')
        .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)));
    match parsed {
        Some((w, h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(SourceError::Probe(format!(
            "no video stream dimensions in {line:?}"
        ))),
    }
}

async fn read_video(path: &Path, input: &InputConfig) -> Result<Vec<Frame>, SourceError> {
    if !check_ffmpeg_available(&input.ffmpeg).await {
        return Err(SourceError::FfmpegMissing(input.ffmpeg.clone()));
    }
    let (width, height) = probe_dimensions(&input.ffprobe, path).await?;

    let mut cmd = Command::new(&input.ffmpeg);
    cmd.args(["-v", "error", "-nostdin", "-i"]).arg(path);
    if input.max_frames > 0 {
        cmd.args(["-frames:v", &input.max_frames.to_string()]);
    }
    cmd.args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| SourceError::Ffmpeg(format!("failed to spawn: {e}")))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| SourceError::Ffmpeg("could not get stdout handle".into()))?;

    debug!(path = %path.display(), width, height, "ffmpeg decoder started");

    let frame_len = width as usize * height as usize * 3;
    let mut frames = Vec::new();
    loop {
        let mut buf = vec![0u8; frame_len];
        let filled = read_full(&mut stdout, &mut buf)
            .await
            .map_err(|e| SourceError::Ffmpeg(format!("failed to read frames: {e}")))?;
        if filled < frame_len {
            if filled > 0 {
                warn!(bytes = filled, expected = frame_len, "dropping partial trailing frame");
            }
            break;
        }
        frames.push(Frame::rgb(frames.len(), width, height, buf)?);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| SourceError::Ffmpeg(format!("failed to wait: {e}")))?;
    if !output.status.success() {
        return Err(SourceError::Ffmpeg(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(frames)
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
/// Returns the number of bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_extension() {
        assert_eq!(InputKind::detect(Path::new("clip.MP4")).unwrap(), InputKind::Video);
        assert_eq!(InputKind::detect(Path::new("a/b.webm")).unwrap(), InputKind::Video);
        assert_eq!(InputKind::detect(Path::new("shot.jpeg")).unwrap(), InputKind::Image);
        assert!(matches!(
            InputKind::detect(Path::new("notes.txt")),
            Err(SourceError::Unsupported(_))
        ));
        assert!(InputKind::detect(Path::new("no_extension")).is_err());
    }

    #[test]
    fn dimensions_are_parsed() {
        assert_eq!(parse_dimensions("1920x1080\n").unwrap(), (1920, 1080));
        assert_eq!(parse_dimensions("640x480\n640x480\n").unwrap(), (640, 480));
        assert!(parse_dimensions("").is_err());
        assert!(parse_dimensions("0x480").is_err());
        assert!(parse_dimensions("N/A").is_err());
    }

    #[tokio::test]
    async fn read_full_reports_short_tail() {
        let data = [7u8; 10];
        let mut reader = &data[..];
        let mut buf = [0u8; 4];
        assert_eq!(read_full(&mut reader, &mut buf).await.unwrap(), 4);
        assert_eq!(read_full(&mut reader, &mut buf).await.unwrap(), 4);
        assert_eq!(read_full(&mut reader, &mut buf).await.unwrap(), 2);
        assert_eq!(read_full(&mut reader, &mut buf).await.unwrap(), 0);
    }
}
