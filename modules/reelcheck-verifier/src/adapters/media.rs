use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use reelcheck_common::{MediaArtifacts, ResolvedMedia};

use crate::traits::MediaAcquirer;

const DOWNLOAD_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Videos at or below this size are kept as downloaded.
const COMPRESS_ABOVE_BYTES: u64 = 2 * 1024 * 1024;
/// A first-pass result above this size gets a second, harsher pass.
const SECOND_PASS_ABOVE_BYTES: u64 = 3 * 1024 * 1024;

/// One ffmpeg re-encode setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodePass {
    pub crf: u8,
    pub maxrate: &'static str,
    pub bufsize: &'static str,
    pub audio_bitrate: &'static str,
    pub width: u32,
}

pub const FIRST_PASS: EncodePass = EncodePass {
    crf: 28,
    maxrate: "1M",
    bufsize: "2M",
    audio_bitrate: "128k",
    width: 720,
};

pub const SECOND_PASS: EncodePass = EncodePass {
    crf: 32,
    maxrate: "800k",
    bufsize: "1600k",
    audio_bitrate: "96k",
    width: 640,
};

impl EncodePass {
    pub fn args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-i".into(),
            input.display().to_string(),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "fast".into(),
            "-crf".into(),
            self.crf.to_string(),
            "-maxrate".into(),
            self.maxrate.into(),
            "-bufsize".into(),
            self.bufsize.into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            self.audio_bitrate.into(),
            "-movflags".into(),
            "+faststart".into(),
            "-vf".into(),
            format!("scale={}:-2", self.width),
            output.display().to_string(),
        ]
    }
}

/// Whether a downloaded video of `size` bytes gets re-encoded at all.
pub fn needs_compression(size: u64) -> bool {
    size > COMPRESS_ABOVE_BYTES
}

pub fn audio_filename(video_filename: &str) -> String {
    let stem = Path::new(video_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| video_filename.to_string());
    format!("{stem}.mp3")
}

// --- Acquirer ---

/// Downloads into `<root>/video`, extracts audio into `<root>/audio`.
///
/// Artifacts are keyed by filename. Every write lands in a temp file in the
/// destination directory and is renamed into place, so a concurrent run for
/// the same reel sees either nothing or a complete file.
pub struct FfmpegAcquirer {
    root: PathBuf,
    ffmpeg_bin: String,
    client: reqwest::Client,
}

impl FfmpegAcquirer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            client: reqwest::Client::builder()
                .timeout(DOWNLOAD_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn video_dir(&self) -> PathBuf {
        self.root.join("video")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    async fn ffmpeg_available(&self) -> bool {
        tokio::process::Command::new(&self.ffmpeg_bin)
            .arg("-version")
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<()> {
        let output = tokio::process::Command::new(&self.ffmpeg_bin)
            .args(args)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ffmpeg_bin))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
            bail!("ffmpeg exited with {}: {tail}", output.status);
        }
        Ok(())
    }

    async fn download(&self, media: &ResolvedMedia, target: &Path) -> Result<()> {
        let dir = self.video_dir();
        let tmp = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".mp4")
            .tempfile_in(&dir)
            .context("Failed to create temp video file")?
            .into_temp_path();

        let resp = self
            .client
            .get(&media.video_url)
            .header("User-Agent", DOWNLOAD_UA)
            .send()
            .await
            .context("Video download request failed")?;
        if !resp.status().is_success() {
            bail!("Video download returned {}", resp.status());
        }
        let bytes = resp.bytes().await.context("Failed to read video body")?;
        tokio::fs::write(&tmp, &bytes)
            .await
            .context("Failed to write video")?;
        info!(shortcode = %media.shortcode, bytes = bytes.len(), "Video downloaded");

        if needs_compression(bytes.len() as u64) {
            if self.ffmpeg_available().await {
                self.compress(&tmp, &dir).await?;
            } else {
                warn!(shortcode = %media.shortcode, "ffmpeg not found, keeping uncompressed video");
            }
        }

        tmp.persist(target)
            .with_context(|| format!("Failed to move video into {}", target.display()))?;
        Ok(())
    }

    /// Re-encode `video` in place, with a second pass if the first is not enough.
    async fn compress(&self, video: &Path, dir: &Path) -> Result<()> {
        let mut out = None;
        for pass in [FIRST_PASS, SECOND_PASS] {
            let pass_out = tempfile::Builder::new()
                .prefix(".compress-")
                .suffix(".mp4")
                .tempfile_in(dir)
                .context("Failed to create temp compression file")?
                .into_temp_path();
            self.run_ffmpeg(&pass.args(video, &pass_out)).await?;

            let size = tokio::fs::metadata(&pass_out).await?.len();
            info!(crf = pass.crf, width = pass.width, bytes = size, "Compression pass done");
            out = Some(pass_out);
            if size <= SECOND_PASS_ABOVE_BYTES {
                break;
            }
        }

        if let Some(out) = out {
            out.persist(video)
                .context("Failed to replace video with compressed copy")?;
        }
        Ok(())
    }

    async fn extract_audio(&self, video: &Path, target: &Path) -> Result<()> {
        let tmp = tempfile::Builder::new()
            .prefix(".audio-")
            .suffix(".mp3")
            .tempfile_in(self.audio_dir())
            .context("Failed to create temp audio file")?
            .into_temp_path();
        let args: Vec<String> = vec![
            "-y".into(),
            "-i".into(),
            video.display().to_string(),
            "-vn".into(),
            "-acodec".into(),
            "libmp3lame".into(),
            "-q:a".into(),
            "4".into(),
            tmp.display().to_string(),
        ];
        self.run_ffmpeg(&args).await.context("Audio extraction failed")?;
        tmp.persist(target)
            .with_context(|| format!("Failed to move audio into {}", target.display()))?;
        Ok(())
    }
}

async fn present(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[async_trait]
impl MediaAcquirer for FfmpegAcquirer {
    async fn acquire(&self, media: &ResolvedMedia) -> Result<MediaArtifacts> {
        tokio::fs::create_dir_all(self.video_dir())
            .await
            .context("Failed to create video directory")?;
        tokio::fs::create_dir_all(self.audio_dir())
            .await
            .context("Failed to create audio directory")?;

        let video_path = self.video_dir().join(&media.filename);
        if present(&video_path).await {
            info!(path = %video_path.display(), "Video already on disk");
        } else {
            self.download(media, &video_path).await?;
        }

        let audio_path = self.audio_dir().join(audio_filename(&media.filename));
        if present(&audio_path).await {
            info!(path = %audio_path.display(), "Audio already on disk");
        } else {
            self.extract_audio(&video_path, &audio_path).await?;
        }

        Ok(MediaArtifacts {
            video_path,
            audio_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_videos_are_left_alone() {
        assert!(!needs_compression(1024));
        assert!(!needs_compression(2 * 1024 * 1024));
        assert!(needs_compression(2 * 1024 * 1024 + 1));
    }

    #[test]
    fn pass_args_scale_and_rate() {
        let args = SECOND_PASS.args(Path::new("in.mp4"), Path::new("out.mp4"));
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -i in.mp4 -c:v libx264"));
        assert!(joined.contains("-crf 32"));
        assert!(joined.contains("-maxrate 800k -bufsize 1600k"));
        assert!(joined.contains("-vf scale=640:-2"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn audio_name_follows_video_stem() {
        assert_eq!(audio_filename("instagram_C0ffee123.mp4"), "instagram_C0ffee123.mp3");
    }

    #[tokio::test]
    async fn existing_artifacts_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = FfmpegAcquirer::new(dir.path());
        std::fs::create_dir_all(acquirer.video_dir()).unwrap();
        std::fs::create_dir_all(acquirer.audio_dir()).unwrap();
        std::fs::write(acquirer.video_dir().join("instagram_X.mp4"), b"video").unwrap();
        std::fs::write(acquirer.audio_dir().join("instagram_X.mp3"), b"audio").unwrap();

        let media = ResolvedMedia {
            shortcode: "X".into(),
            // Unroutable: any network attempt would fail the test.
            video_url: "http://127.0.0.1:9/never".into(),
            width: None,
            height: None,
            filename: "instagram_X.mp4".into(),
        };
        let artifacts = acquirer.acquire(&media).await.unwrap();
        assert_eq!(artifacts.video_path, acquirer.video_dir().join("instagram_X.mp4"));
        assert_eq!(artifacts.audio_path, acquirer.audio_dir().join("instagram_X.mp3"));
    }
}
