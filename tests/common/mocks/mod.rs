//! mockall doubles for the two capabilities the resolver depends on.

use async_trait::async_trait;
use cloudy::commands::music::audio_sources::{
    AudioSourceResult, Player, SearchResult, SearchSource, Track, TrackSearch,
};
use mockall::mock;

mock! {
    pub TrackSearcher {}

    #[async_trait]
    impl TrackSearch for TrackSearcher {
        async fn search(
            &self,
            query: &str,
            source: Option<SearchSource>,
            requester: &str,
        ) -> AudioSourceResult<SearchResult>;
    }
}

mock! {
    pub QueuePlayer {}

    #[async_trait]
    impl Player for QueuePlayer {
        async fn enqueue(&self, track: Track) -> AudioSourceResult<()>;
        async fn play(&self) -> AudioSourceResult<()>;
        async fn is_playing(&self) -> bool;
    }
}
