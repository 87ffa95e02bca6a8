//! Drives the resolver through its public API with mocked search and player
//! backends.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use cloudy::commands::music::audio_sources::{SearchResult, SearchSource, Track};
use cloudy::commands::music::resolver::classifier::{QueryKind, classify};
use cloudy::commands::music::resolver::loader::QueueLoader;
use cloudy::commands::music::resolver::scorer::{MATCH_THRESHOLD, score};
use cloudy::commands::music::resolver::{Resolution, Resolver};
use cloudy::commands::music::utils::music_manager::MusicError;
use mockall::Sequence;
use mockall::predicate::{always, eq, function};
use pretty_assertions::assert_eq;
use test_case::test_case;

use crate::common::fixtures::{
    SOUNDCLOUD_TRACK, SPOTIFY_TRACK, YOUTUBE_VIDEO, soundcloud_one_more_time, spotify_one_more_time, track,
};
use crate::common::mocks::{MockQueuePlayer, MockTrackSearcher};
use crate::test_utils;

const REQUESTER: &str = "tester";

fn resolver(search: MockTrackSearcher) -> Resolver {
    Resolver::new(Arc::new(search), 100).with_loader(QueueLoader::new(25, Duration::from_millis(1)))
}

#[test_case(SPOTIFY_TRACK, QueryKind::SpotifyTrack; "spotify track")]
#[test_case(YOUTUBE_VIDEO, QueryKind::YoutubeVideo; "youtube video")]
#[test_case(SOUNDCLOUD_TRACK, QueryKind::SoundCloudTrack; "soundcloud track")]
#[test_case("https://www.youtube.com/watch?v=FGBhQbmPwH8&list=PL123", QueryKind::YoutubePlaylist; "video inside playlist")]
#[test_case("daft punk one more time", QueryKind::Text; "plain text")]
fn fixtures_classify_as_expected(input: &str, expected: QueryKind) {
    assert_eq!(classify(input).kind, expected);
}

#[tokio::test]
async fn spotify_link_is_queued_as_its_soundcloud_upload() {
    test_utils::init();

    let mut search = MockTrackSearcher::new();
    search
        .expect_search()
        .with(eq(SPOTIFY_TRACK), eq(None), always())
        .times(1)
        .returning(|_, _, _| Ok(SearchResult::single(spotify_one_more_time())));
    search
        .expect_search()
        .with(eq("daft punk one more time"), eq(Some(SearchSource::SoundCloud)), always())
        .times(1)
        .returning(|_, _, _| {
            Ok(SearchResult::search(vec![
                track("One More Time (Cover)", "Bedroom Band"),
                soundcloud_one_more_time(),
            ]))
        });

    let resolver = resolver(search);
    let resolution = resolver.resolve(SPOTIFY_TRACK, REQUESTER).await.unwrap();
    assert_eq!(resolution, Resolution::Track(soundcloud_one_more_time()));
    assert!(score(&soundcloud_one_more_time(), "daft punk one more time") >= MATCH_THRESHOLD);

    let expected_title = soundcloud_one_more_time().title;
    let mut player = MockQueuePlayer::new();
    let mut order = Sequence::new();
    player
        .expect_is_playing()
        .times(1)
        .in_sequence(&mut order)
        .returning(|| false);
    player
        .expect_enqueue()
        .with(function(move |track: &Track| track.title == expected_title))
        .times(1)
        .in_sequence(&mut order)
        .returning(|_| Ok(()));
    player
        .expect_play()
        .times(1)
        .in_sequence(&mut order)
        .returning(|| Ok(()));

    assert_eq!(resolver.load(&player, &resolution).await.unwrap(), 1);
}

#[tokio::test]
async fn blank_query_never_searches() {
    let mut search = MockTrackSearcher::new();
    search.expect_search().times(0);

    let resolution = resolver(search).resolve("   ", REQUESTER).await.unwrap();
    assert_eq!(resolution, Resolution::NoMatch);
}

#[tokio::test]
async fn text_without_results_is_no_match() {
    let mut search = MockTrackSearcher::new();
    // One candidate search, then the first-result fallback.
    search
        .expect_search()
        .with(eq("obscure demo tape"), eq(Some(SearchSource::SoundCloud)), always())
        .times(2)
        .returning(|_, _, _| Ok(SearchResult::empty()));

    let resolution = resolver(search).resolve("Obscure Demo Tape", REQUESTER).await.unwrap();
    assert_eq!(resolution, Resolution::NoMatch);
}

#[tokio::test]
async fn failed_search_surfaces_before_any_queueing() {
    let mut search = MockTrackSearcher::new();
    search
        .expect_search()
        .returning(|_, _, _| Err(MusicError::SearchFailed("yt-dlp exited with status 1".to_string())));

    let result = resolver(search).resolve("daft punk", REQUESTER).await;
    assert_matches!(result, Err(MusicError::SearchFailed(message)) if message.contains("status 1"));
}

#[tokio::test]
async fn soundcloud_set_queues_every_track_then_plays_once() {
    let mut search = MockTrackSearcher::new();
    search
        .expect_search()
        .with(eq("https://soundcloud.com/daftpunkofficialmusic/sets/discovery"), eq(None), always())
        .times(1)
        .returning(|_, _, _| {
            Ok(SearchResult::playlist(
                "Discovery",
                vec![
                    track("One More Time", "Daft Punk"),
                    track("Aerodynamic", "Daft Punk"),
                    track("Digital Love", "Daft Punk"),
                ],
            ))
        });

    let resolver = resolver(search);
    let resolution = resolver
        .resolve("https://soundcloud.com/daftpunkofficialmusic/sets/discovery", REQUESTER)
        .await
        .unwrap();
    assert_matches!(&resolution, Resolution::Playlist { name, tracks } if name == "Discovery" && tracks.len() == 3);

    let mut player = MockQueuePlayer::new();
    let mut order = Sequence::new();
    player
        .expect_is_playing()
        .times(1)
        .in_sequence(&mut order)
        .returning(|| false);
    for title in ["One More Time", "Aerodynamic", "Digital Love"] {
        player
            .expect_enqueue()
            .with(function(move |track: &Track| track.title == title))
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Ok(()));
    }
    player
        .expect_play()
        .times(1)
        .in_sequence(&mut order)
        .returning(|| Ok(()));

    assert_eq!(resolver.load(&player, &resolution).await.unwrap(), 3);
}

#[tokio::test]
async fn busy_player_is_not_restarted() {
    let mut player = MockQueuePlayer::new();
    player.expect_is_playing().returning(|| true);
    player.expect_enqueue().times(1).returning(|_| Ok(()));
    player.expect_play().times(0);

    let resolver = resolver(MockTrackSearcher::new());
    let added = resolver
        .load(&player, &Resolution::Track(soundcloud_one_more_time()))
        .await
        .unwrap();
    assert_eq!(added, 1);
}
