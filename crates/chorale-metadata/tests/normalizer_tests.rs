use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chorale_config::TaggingConfig;
use chorale_domain::ReleaseDate;
use chorale_metadata::{
    AudioProbe, AudioStream, DecodedAudio, ParseError, ProbeError, TagMap, TagNormalizer,
};

const MBID_A: &str = "056e4f3e-d505-4dad-8ec1-d04f521cbb56";
const MBID_B: &str = "a74b1b7f-71a5-4011-9441-d0b5e4122711";
const MBID_C: &str = "5441c29d-3602-4898-b1a1-b77fa23b8e50";

fn normalizer() -> TagNormalizer {
    TagNormalizer::new(TaggingConfig::default())
}

fn decoded(tags: &[(&str, &str)]) -> DecodedAudio {
    DecodedAudio {
        tags: tags.iter().copied().collect::<TagMap>(),
        ..DecodedAudio::default()
    }
}

fn artist_names(metadata: &chorale_metadata::TrackMetadata) -> Vec<&str> {
    metadata.artists.iter().map(|a| a.name.as_str()).collect()
}

#[test]
fn multi_artist_tag_is_split_on_slash_and_semicolon() {
    let metadata = normalizer().normalize(&decoded(&[("ARTISTS", "A/B;C"), ("ARTIST", "ignored")]));
    assert_eq!(artist_names(&metadata), vec!["A", "B", "C"]);
}

#[test]
fn single_artist_tag_is_never_split() {
    let metadata = normalizer().normalize(&decoded(&[("ARTIST", "A/B")]));
    assert_eq!(artist_names(&metadata), vec!["A/B"]);

    let acdc = normalizer().normalize(&decoded(&[("ARTIST", "AC/DC; live")]));
    assert_eq!(artist_names(&acdc), vec!["AC/DC; live"]);
}

#[test]
fn single_artist_tag_is_kept_verbatim() {
    let padded = normalizer().normalize(&decoded(&[("ARTIST", " Daft Punk ")]));
    assert_eq!(artist_names(&padded), vec![" Daft Punk "]);

    let blank = normalizer().normalize(&decoded(&[("ARTIST", "   ")]));
    assert!(blank.artists.is_empty());
}

#[test]
fn no_artist_tags_means_no_artists() {
    let metadata = normalizer().normalize(&decoded(&[("TITLE", "Intro")]));
    assert!(metadata.artists.is_empty());
    assert!(metadata.album.is_none());
    assert!(metadata.album_artists.is_empty());
}

#[test]
fn artist_mbids_attach_positionally_when_counts_match() {
    let ids = format!("{MBID_A}/{MBID_B}");
    let metadata = normalizer().normalize(&decoded(&[
        ("ARTISTS", "Daft Punk;Pharrell Williams"),
        ("MUSICBRAINZ_ARTISTID", &ids),
    ]));

    assert_eq!(metadata.artists.len(), 2);
    assert_eq!(metadata.artists[0].mbid.unwrap().to_string(), MBID_A);
    assert_eq!(metadata.artists[1].mbid.unwrap().to_string(), MBID_B);
}

#[test]
fn artist_mbids_are_dropped_on_count_mismatch() {
    let ids = format!("{MBID_A}/{MBID_B}");
    let metadata = normalizer().normalize(&decoded(&[
        ("ARTISTS", "A/B/C"),
        ("MUSICBRAINZ ARTIST ID", &ids),
    ]));

    assert_eq!(artist_names(&metadata), vec!["A", "B", "C"]);
    assert!(metadata.artists.iter().all(|a| a.mbid.is_none()));
}

#[test]
fn artist_mbids_are_dropped_when_one_token_is_malformed() {
    let ids = format!("{MBID_A}/not-an-id/{MBID_C}");
    let metadata = normalizer().normalize(&decoded(&[
        ("ARTISTS", "A/B/C"),
        ("MUSICBRAINZ/ARTIST ID", &ids),
    ]));

    assert_eq!(metadata.artists.len(), 3);
    assert!(metadata.artists.iter().all(|a| a.mbid.is_none()));
}

#[test]
fn track_and_disc_positions() {
    let n = normalizer();

    let full = n.normalize(&decoded(&[("TRACK", "3/14"), ("DISC", "1/2")]));
    assert_eq!((full.track_number, full.total_track), (Some(3), Some(14)));
    assert_eq!((full.disc_number, full.total_disc), (Some(1), Some(2)));

    let bare = n.normalize(&decoded(&[("TRACK", "3")]));
    assert_eq!((bare.track_number, bare.total_track), (Some(3), None));

    let broken = n.normalize(&decoded(&[("TRACK", "x/14")]));
    assert_eq!((broken.track_number, broken.total_track), (None, Some(14)));
}

#[test]
fn dates_use_the_first_matching_tag_in_file_order() {
    let metadata = normalizer().normalize(&decoded(&[
        ("YEAR", "1997"),
        ("DATE", "2001-03-12"),
        ("TORY", "1995"),
    ]));
    assert_eq!(metadata.date, Some(ReleaseDate::new(1997, None, None)));
    assert_eq!(metadata.original_date, Some(ReleaseDate::new(1995, None, None)));
}

#[test]
fn unparsable_date_leaves_field_absent_but_keeps_the_rest() {
    let metadata = normalizer().normalize(&decoded(&[
        ("TITLE", "One More Time"),
        ("DATE", "sometime in 2000"),
        ("TDOR", "2000-11-13"),
    ]));
    assert!(metadata.date.is_none());
    assert_eq!(metadata.original_date, Some(ReleaseDate::new(2000, Some(11), Some(13))));
    assert_eq!(metadata.title.as_deref(), Some("One More Time"));
}

#[test]
fn platform_year_tag_is_an_alias_for_date() {
    let metadata = normalizer().normalize(&decoded(&[("WM/YEAR", "2005")]));
    assert_eq!(metadata.date, Some(ReleaseDate::new(2005, None, None)));
}

#[test]
fn release_track_and_recording_identifiers_stay_separate() {
    let metadata = normalizer().normalize(&decoded(&[
        ("MUSICBRAINZ_RELEASETRACKID", MBID_A),
        ("MUSICBRAINZ_TRACKID", MBID_B),
        ("ACOUSTID ID", MBID_C),
    ]));
    assert_eq!(metadata.track_mbid.unwrap().to_string(), MBID_A);
    assert_eq!(metadata.recording_mbid.unwrap().to_string(), MBID_B);
    assert_eq!(metadata.acoustid.unwrap().to_string(), MBID_C);

    let only_recording = normalizer().normalize(&decoded(&[("MUSICBRAINZ/TRACK ID", MBID_B)]));
    assert!(only_recording.track_mbid.is_none());
    assert_eq!(only_recording.recording_mbid.unwrap().to_string(), MBID_B);
}

#[test]
fn malformed_identifier_is_just_unset() {
    let metadata = normalizer().normalize(&decoded(&[
        ("ACOUSTID ID", "1234"),
        ("TITLE", "Kept"),
    ]));
    assert!(metadata.acoustid.is_none());
    assert_eq!(metadata.title.as_deref(), Some("Kept"));
}

#[test]
fn title_is_verbatim_and_disc_subtitle_uses_aliases() {
    let metadata = normalizer().normalize(&decoded(&[
        ("TITLE", "  Spaced Out "),
        ("SETSUBTITLE", "Bonus Disc"),
        ("TSST", "Not this one"),
    ]));
    assert_eq!(metadata.title.as_deref(), Some("  Spaced Out "));
    assert_eq!(metadata.disc_subtitle.as_deref(), Some("Bonus Disc"));
}

#[test]
fn clusters_split_dedupe_and_accumulate() {
    let metadata = normalizer().normalize(&decoded(&[
        ("GENRE", "Rock / Pop;Rock"),
        ("MOOD", "Happy"),
        ("GENRE", "Jazz, Pop"),
        ("STYLE", "Ignored"),
    ]));

    let genres: Vec<_> = metadata.clusters["GENRE"].iter().map(String::as_str).collect();
    assert_eq!(genres, vec!["Jazz", "Pop", "Rock"]);
    let moods: Vec<_> = metadata.clusters["MOOD"].iter().map(String::as_str).collect();
    assert_eq!(moods, vec!["Happy"]);
    assert!(!metadata.clusters.contains_key("STYLE"));

    assert_eq!(metadata.genre_list.as_deref(), Some("Rock / Pop;Rock; Jazz, Pop"));
}

#[test]
fn empty_cluster_values_record_nothing() {
    let metadata = normalizer().normalize(&decoded(&[("GENRE", " ; / ")]));
    assert!(metadata.clusters.is_empty());
    assert_eq!(metadata.genre_list.as_deref(), Some(" ; / "));
}

#[test]
fn custom_cluster_types_come_from_configuration() {
    let rules = TaggingConfig {
        cluster_types: vec!["STYLE".to_string()],
        ..TaggingConfig::default()
    };
    let metadata = TagNormalizer::new(rules).normalize(&decoded(&[
        ("GENRE", "Rock"),
        ("STYLE", "Shoegaze/Dream Pop"),
    ]));

    assert!(!metadata.clusters.contains_key("GENRE"));
    assert_eq!(metadata.clusters["STYLE"].len(), 2);
}

#[test]
fn album_and_album_artist_carry_their_identifiers() {
    let metadata = normalizer().normalize(&decoded(&[
        ("ALBUM", " Discovery "),
        ("MUSICBRAINZ_ALBUMID", MBID_A),
        ("ALBUM_ARTIST", "Daft Punk/Friends"),
        ("MUSICBRAINZ ALBUM ARTIST ID", MBID_B),
    ]));

    let album = metadata.album.unwrap();
    assert_eq!(album.name, "Discovery");
    assert_eq!(album.mbid.unwrap().to_string(), MBID_A);

    assert_eq!(metadata.album_artists.len(), 1);
    assert_eq!(metadata.album_artists[0].name, "Daft Punk/Friends");
    assert_eq!(metadata.album_artists[0].mbid.unwrap().to_string(), MBID_B);
}

#[test]
fn stream_facts_are_copied_from_the_decoder() {
    let input = DecodedAudio {
        tags: TagMap::new(),
        duration: Duration::from_secs(320),
        streams: vec![AudioStream { bitrate: 320_000 }],
        has_cover: true,
    };
    let metadata = normalizer().normalize(&input);
    assert_eq!(metadata.duration, Duration::from_secs(320));
    assert_eq!(metadata.audio_streams, vec![AudioStream { bitrate: 320_000 }]);
    assert!(metadata.has_cover);
}

struct BrokenProbe;

#[async_trait]
impl AudioProbe for BrokenProbe {
    async fn probe(&self, path: &Path) -> Result<DecodedAudio, ProbeError> {
        Err(ProbeError::Undecodable {
            path: path.display().to_string(),
            detail: "Invalid data found when processing input".to_string(),
        })
    }
}

struct FixedProbe(DecodedAudio);

#[async_trait]
impl AudioProbe for FixedProbe {
    async fn probe(&self, _path: &Path) -> Result<DecodedAudio, ProbeError> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn decode_failure_aborts_the_whole_parse() {
    let result = normalizer().parse(&BrokenProbe, Path::new("/music/corrupt.flac")).await;
    match result {
        Err(ParseError::Decode { path, .. }) => assert_eq!(path, "/music/corrupt.flac"),
        other => panic!("expected decode failure, got: {other:?}"),
    }
}

#[tokio::test]
async fn parse_normalizes_what_the_probe_reports() {
    let probe = FixedProbe(decoded(&[("TITLE", "Digital Love"), ("TRACK", "3/14")]));
    let metadata = normalizer()
        .parse(&probe, Path::new("/music/digital_love.flac"))
        .await
        .unwrap();
    assert_eq!(metadata.title.as_deref(), Some("Digital Love"));
    assert_eq!(metadata.track_number, Some(3));
}
