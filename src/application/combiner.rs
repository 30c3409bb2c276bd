//! Stream combiner

use crate::domain::media::MediaStream;

/// Build one stream from the video tracks of `video_source` and the audio
/// tracks of `audio_source`. The new stream shares track handles with its
/// inputs, so stopping a track through any of them stops it everywhere.
pub fn combine(video_source: &MediaStream, audio_source: &MediaStream) -> MediaStream {
    let tracks = video_source
        .video_tracks()
        .chain(audio_source.audio_tracks())
        .cloned()
        .collect();
    let combined = MediaStream::new(tracks);
    tracing::debug!(
        stream = %combined.id(),
        video_from = %video_source.id(),
        audio_from = %audio_source.id(),
        "streams combined"
    );
    combined
}
