
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chorale_application::LibraryError;
use chorale_config::AppConfig;
use chorale_domain::{ArtistId, GenreId, NamedEntity, ReleaseId, TrackId, TrackListId, MAX_NAME_LENGTH};
use chorale_infrastructure::repositories::{GenreRepository, NamedEntityRepository, TrackFilter};
use test_helpers::{facts, library_for, memory_library, metadata};

#[tokio::test]
async fn get_or_create_returns_the_same_row() {
    let library = memory_library().await;

    let first = library.artists().get_or_create("Daft Punk").await.unwrap();
    let second = library.artists().get_or_create("Daft Punk").await.unwrap();
    assert_eq!(first.id, second.id);

    let found = library.artists().get_by_name("Daft Punk").await.unwrap().unwrap();
    assert_eq!(found.id, first.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_get_or_create_yields_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", dir.path().join("library.db").display());
    config.database.pool_max_size = 8;
    let library = library_for(&config).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let library = Arc::clone(&library);
        handles.push(tokio::spawn(async move {
            library.artists().get_or_create("Daft Punk").await.unwrap().id
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let artists = library.list_artists(&[], 0, 100).await.unwrap();
    assert_eq!(artists.iter().filter(|a| a.name == "Daft Punk").count(), 1);
}

#[tokio::test]
async fn ingest_without_tags_points_at_sentinels() {
    let library = memory_library().await;
    let mut bare = metadata("ignored", None, None, &[]);
    bare.title = None;

    let track = library
        .ingest(Path::new("/music/unknown/track07.mp3"), &facts(1), &bare)
        .await
        .unwrap();

    assert_eq!(track.name, "track07");
    let sentinels = library.sentinels().await.unwrap();
    assert_eq!(track.artist_id, sentinels.artist);
    assert_eq!(track.release_id, sentinels.release);
    assert_eq!(track.genre_ids, vec![sentinels.genre]);

    let artist = library.artists().get_sentinel().await.unwrap();
    assert!(artist.is_none());
    assert!(library.releases().get_sentinel().await.unwrap().is_none());
}

#[tokio::test]
async fn ingest_resolves_artist_release_and_genres() {
    let library = memory_library().await;
    let mut parsed = metadata(
        "Digital Love",
        Some("Daft Punk"),
        Some("Discovery"),
        &["House", "Disco"],
    );
    parsed.artists.push(chorale_metadata::ArtistCredit {
        name: "Second Credit".to_string(),
        mbid: None,
    });
    parsed
        .clusters
        .insert("MOOD".to_string(), ["Happy".to_string()].into_iter().collect());
    parsed.track_number = Some(3);
    parsed.disc_number = Some(1);

    let track = library
        .ingest(Path::new("/music/03.flac"), &facts(1), &parsed)
        .await
        .unwrap();

    let daft = library.artists().get_by_name("Daft Punk").await.unwrap().unwrap();
    let discovery = library.releases().get_by_name("Discovery").await.unwrap().unwrap();
    assert_eq!(track.artist_id, daft.id);
    assert_eq!(track.release_id, discovery.id);
    assert_eq!(track.name, "Digital Love");
    assert_eq!(track.track_number, Some(3));
    assert_eq!(track.duration(), Duration::from_secs(200));
    assert_eq!(track.genre_list, "House;Disco");
    assert!(library.artists().get_by_name("Second Credit").await.unwrap().is_none());

    let genres: Vec<_> = library
        .list_genres(&["GENRE"], 0, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(genres, vec!["Disco", "House"]);

    let happy = library
        .genres()
        .get_in_cluster("MOOD", "Happy")
        .await
        .unwrap()
        .expect("mood row");
    assert_eq!(happy.cluster_type, "MOOD");
    assert!(library.genres().get_by_name("Happy").await.unwrap().is_none());
    assert_eq!(track.genre_ids.len(), 3);
    assert!(track.genre_ids.contains(&happy.id));

    let moods = library.list_genres(&["MOOD"], 0, 10).await.unwrap();
    assert_eq!(moods, vec![happy]);
}

#[tokio::test]
async fn moods_alone_still_link_the_sentinel_genre() {
    let library = memory_library().await;
    let mut parsed = metadata("Kelly Watch the Stars", Some("Air"), None, &[]);
    parsed.clusters.insert(
        "MOOD".to_string(),
        ["Calm".to_string(), "Dreamy".to_string()].into_iter().collect(),
    );

    let track = library
        .ingest(Path::new("/music/kelly.flac"), &facts(1), &parsed)
        .await
        .unwrap();

    let sentinels = library.sentinels().await.unwrap();
    assert_eq!(track.genre_ids.len(), 3);
    assert!(track.genre_ids.contains(&sentinels.genre));

    let moods: Vec<_> = library
        .list_genres(&["MOOD"], 0, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(moods, vec!["Calm", "Dreamy"]);

    // Retagging drops the old mood link; the row waits for collection.
    parsed.clusters.insert("MOOD".to_string(), ["Calm".to_string()].into_iter().collect());
    library
        .ingest(Path::new("/music/kelly.flac"), &facts(2), &parsed)
        .await
        .unwrap();
    let orphans = library.orphans().await.unwrap();
    assert_eq!(
        orphans.genres.iter().map(|g| (g.cluster_type.as_str(), g.name.as_str())).collect::<Vec<_>>(),
        vec![("MOOD", "Dreamy")]
    );
}

#[tokio::test]
async fn long_names_are_truncated_not_rejected() {
    let library = memory_library().await;
    let long_title = "t".repeat(300);
    let long_artist = "a".repeat(300);

    let track = library
        .ingest(
            Path::new("/music/long.flac"),
            &facts(1),
            &metadata(&long_title, Some(&long_artist), None, &[]),
        )
        .await
        .unwrap();

    assert_eq!(track.name.chars().count(), MAX_NAME_LENGTH);
    let artist = library.artists().get_by_name(&long_artist).await.unwrap().unwrap();
    assert_eq!(artist.id, track.artist_id);
    assert_eq!(artist.name.chars().count(), MAX_NAME_LENGTH);
}

#[tokio::test]
async fn absurd_durations_are_clamped_not_rejected() {
    let library = memory_library().await;
    let mut parsed = metadata("Endless", Some("Daft Punk"), None, &[]);
    parsed.duration = Duration::MAX;

    let track = library
        .ingest(Path::new("/music/endless.flac"), &facts(1), &parsed)
        .await
        .unwrap();
    assert_eq!(track.duration_ms, i64::MAX as u64);

    let stored = library.track(track.id).await.unwrap().unwrap();
    assert_eq!(stored.duration_ms, i64::MAX as u64);
}

#[tokio::test]
async fn reingesting_the_same_file_keeps_one_identical_row() {
    let library = memory_library().await;
    let path = Path::new("/music/one_more_time.flac");
    let parsed = metadata("One More Time", Some("Daft Punk"), Some("Discovery"), &["House"]);

    let first = library.ingest(path, &facts(9), &parsed).await.unwrap();
    let second = library.ingest(path, &facts(9), &parsed).await.unwrap();
    assert_eq!(first, second);

    let all = library.list_tracks(&TrackFilter::default(), 0, 10).await.unwrap();
    assert_eq!(all, vec![first.clone()]);
    assert_eq!(library.track_by_path(path).await.unwrap(), Some(first));
}

#[tokio::test]
async fn retagging_leaves_orphans_for_explicit_collection() {
    let library = memory_library().await;
    let path = Path::new("/music/track.flac");

    library
        .ingest(path, &facts(1), &metadata("Track", Some("Old Name"), Some("Old Album"), &["Rock"]))
        .await
        .unwrap();
    let updated = library
        .ingest(path, &facts(2), &metadata("Track", Some("New Name"), None, &[]))
        .await
        .unwrap();
    assert_eq!(updated.checksum, vec![2; 32]);

    let orphans = library.orphans().await.unwrap();
    assert_eq!(orphans.artists.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["Old Name"]);
    assert_eq!(orphans.releases.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["Old Album"]);
    assert_eq!(orphans.genres.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(), vec!["Rock"]);

    let counts = library.delete_orphans().await.unwrap();
    assert_eq!((counts.artists, counts.releases, counts.genres), (1, 1, 1));
    assert!(library.orphans().await.unwrap().is_empty());

    // Sentinels referenced by nothing still survive collection.
    library.remove_track(path).await.unwrap();
    library.delete_orphans().await.unwrap();
    let sentinels = library.sentinels().await.unwrap();
    let releases = library.list_releases(&[], &[], 0, 10).await.unwrap();
    assert!(releases.iter().any(|r| r.id == sentinels.release));
}

#[tokio::test]
async fn filters_on_unknown_ids_are_rejected() {
    let library = memory_library().await;

    let err = library.list_artists(&[GenreId::new()], 0, 10).await.unwrap_err();
    assert!(matches!(err, LibraryError::InvalidArgument(_)));

    let err = library
        .list_releases(&[ArtistId::new()], &[], 0, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::InvalidArgument(_)));

    let filter = TrackFilter {
        release_ids: vec![ReleaseId::new()],
        ..TrackFilter::default()
    };
    let err = library.list_tracks(&filter, 0, 10).await.unwrap_err();
    assert!(matches!(err, LibraryError::InvalidArgument(_)));

    let err = library.list_genres(&["GENRE"], -1, 10).await.unwrap_err();
    assert!(matches!(err, LibraryError::InvalidArgument(_)));
}

#[tokio::test]
async fn filtered_listing_and_release_duration() {
    let library = memory_library().await;
    let a = library
        .ingest(Path::new("/a.flac"), &facts(1), &metadata("Aerodynamic", Some("Daft Punk"), Some("Discovery"), &["House"]))
        .await
        .unwrap();
    library
        .ingest(Path::new("/b.flac"), &facts(2), &metadata("Kelly", Some("Air"), Some("Moon Safari"), &["Downtempo"]))
        .await
        .unwrap();
    library
        .ingest(Path::new("/c.flac"), &facts(3), &metadata("Veridis Quo", Some("Daft Punk"), Some("Discovery"), &["House"]))
        .await
        .unwrap();

    let house = library.genres().get_by_name("House").await.unwrap().unwrap();
    let artists = library.list_artists(&[house.id], 0, 10).await.unwrap();
    assert_eq!(artists.len(), 1);
    assert_eq!(artists[0].id, a.artist_id);

    let releases = library.list_releases(&[a.artist_id], &[house.id], 0, 10).await.unwrap();
    assert_eq!(releases.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["Discovery"]);

    let filter = TrackFilter {
        artist_ids: vec![a.artist_id],
        ..TrackFilter::default()
    };
    let names: Vec<_> = library
        .list_tracks(&filter, 0, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["Aerodynamic", "Veridis Quo"]);

    let duration = library.release_duration(a.release_id).await.unwrap();
    assert_eq!(duration, Duration::from_secs(400));
    assert!(matches!(
        library.release_duration(ReleaseId::new()).await,
        Err(LibraryError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn tracklists_validate_their_entries() {
    let library = memory_library().await;
    let track = library
        .ingest(Path::new("/a.flac"), &facts(1), &metadata("A", None, None, &[]))
        .await
        .unwrap();

    let err = library
        .create_tracklist("Broken", &[TrackId::new()])
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::InvalidArgument(_)));

    let err = library
        .append_to_tracklist(TrackListId::new(), &[track.id])
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::InvalidArgument(_)));

    let list = library.create_tracklist("Mix", &[track.id]).await.unwrap();
    library.append_to_tracklist(list.id, &[track.id]).await.unwrap();
    let tracks = library.tracklist_tracks(list.id).await.unwrap().unwrap();
    assert_eq!(tracks.len(), 2);
    assert!(library.tracklist_tracks(TrackListId::new()).await.unwrap().is_none());
}
