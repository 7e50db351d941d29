//! The authoritative game state and its transition rules.

use crate::dto::ws::ServerMessage;
use crate::songs::normalize_genre;
use crate::spotify::api::TrackInfo;
use crate::spotify::playback::PlaybackIntent;

/// Inbound events the game reacts to, one per client message kind.
///
/// `ShowAnswer` carries the track metadata fetched before the transition so
/// the broadcast and the state change happen atomically under the state lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// The host picked a different genre.
    GenreChange {
        /// Raw genre value as sent by the client.
        genre: String,
    },
    /// The host starts a fresh game on a genre.
    NewGame {
        /// Raw genre value as sent by the client.
        genre: String,
    },
    /// A player buzzed in.
    PlayerGuess {
        /// Display name of the player.
        player: String,
    },
    /// The host reveals the answer.
    ShowAnswer {
        /// Currently playing track, empty fields when unavailable.
        track: TrackInfo,
    },
    /// The host advances to the next round.
    NextRound,
    /// The host restarts the round for another guess.
    GuessAgain,
}

/// Outcome of one applied event: at most one broadcast and one playback intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Payload to send to every connected client.
    pub broadcast: Option<ServerMessage>,
    /// Playback action to run after the state lock is released.
    pub intent: Option<PlaybackIntent>,
}

impl Transition {
    fn none() -> Self {
        Self {
            broadcast: None,
            intent: None,
        }
    }
}

/// The single shared game state.
///
/// A guesser is recorded between a `PlayerGuess` and the next
/// `ShowAnswer`/`NextRound`/`GuessAgain`; while one is recorded, further
/// guesses are dropped (first claim wins). The selected genre persists
/// across rounds until explicitly changed.
#[derive(Debug, Default)]
pub struct GameState {
    selected_genre: Option<String>,
    current_guesser: Option<String>,
    last_broadcast: Option<ServerMessage>,
}

impl GameState {
    /// Fresh state: no genre, no guesser, nothing broadcast yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected genre (normalized).
    pub fn selected_genre(&self) -> Option<&str> {
        self.selected_genre.as_deref()
    }

    /// Player credited for the current round, if any.
    pub fn current_guesser(&self) -> Option<&str> {
        self.current_guesser.as_deref()
    }

    /// Most recent broadcast, replayed to late joiners.
    pub fn last_broadcast(&self) -> Option<&ServerMessage> {
        self.last_broadcast.as_ref()
    }

    /// Apply one event and compute its broadcast and playback intent.
    /// The caller must hold the state lock across the broadcast.
    pub fn apply(&mut self, event: GameEvent) -> Transition {
        let transition = match event {
            GameEvent::GenreChange { genre } => {
                let genre = normalize_genre(&genre);
                self.selected_genre = Some(genre.clone());
                Transition {
                    broadcast: Some(ServerMessage::GenreChange { genre_name: genre }),
                    intent: None,
                }
            }
            GameEvent::NewGame { genre } => {
                let genre = normalize_genre(&genre);
                self.selected_genre = Some(genre.clone());
                self.current_guesser = None;
                Transition {
                    broadcast: None,
                    intent: Some(PlaybackIntent::StartGenre { genre }),
                }
            }
            GameEvent::PlayerGuess { player } => {
                if self.current_guesser.is_some() {
                    // First claim wins; later guesses are dropped silently.
                    return Transition::none();
                }
                self.current_guesser = Some(player.clone());
                Transition {
                    broadcast: Some(ServerMessage::FirstGuesser {
                        player_name: player,
                    }),
                    intent: Some(PlaybackIntent::PauseForGuess),
                }
            }
            GameEvent::ShowAnswer { track } => {
                self.current_guesser = None;
                Transition {
                    broadcast: Some(ServerMessage::Answer {
                        song_title: track.title,
                        artists_text: track.artists_text,
                        album_image_url: track.album_image_url,
                    }),
                    intent: Some(PlaybackIntent::RevealAndResume),
                }
            }
            GameEvent::NextRound => {
                self.current_guesser = None;
                Transition {
                    broadcast: Some(ServerMessage::NextRound),
                    intent: Some(PlaybackIntent::AdvanceTrack {
                        genre: self.selected_genre.clone(),
                    }),
                }
            }
            GameEvent::GuessAgain => {
                self.current_guesser = None;
                Transition {
                    broadcast: Some(ServerMessage::GuessAgain),
                    intent: Some(PlaybackIntent::Restart),
                }
            }
        };

        if let Some(broadcast) = &transition.broadcast {
            self.last_broadcast = Some(broadcast.clone());
        }
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guess(state: &mut GameState, player: &str) -> Transition {
        state.apply(GameEvent::PlayerGuess {
            player: player.into(),
        })
    }

    #[test]
    fn first_guess_is_credited_and_broadcast() {
        let mut state = GameState::new();
        let transition = guess(&mut state, "Alice");

        assert_eq!(state.current_guesser(), Some("Alice"));
        assert_eq!(
            transition.broadcast,
            Some(ServerMessage::FirstGuesser {
                player_name: "Alice".into()
            })
        );
        assert_eq!(transition.intent, Some(PlaybackIntent::PauseForGuess));
    }

    #[test]
    fn later_guesses_are_dropped_silently() {
        let mut state = GameState::new();
        guess(&mut state, "Alice");
        let transition = guess(&mut state, "Bob");

        assert_eq!(state.current_guesser(), Some("Alice"));
        assert!(transition.broadcast.is_none());
        assert!(transition.intent.is_none());
        // The retained broadcast still names the first guesser.
        assert_eq!(
            state.last_broadcast(),
            Some(&ServerMessage::FirstGuesser {
                player_name: "Alice".into()
            })
        );
    }

    #[test]
    fn round_boundaries_clear_the_guesser() {
        for event in [
            GameEvent::ShowAnswer {
                track: TrackInfo::default(),
            },
            GameEvent::NextRound,
            GameEvent::GuessAgain,
        ] {
            let mut state = GameState::new();
            guess(&mut state, "Alice");
            state.apply(event);
            assert_eq!(state.current_guesser(), None);
        }
    }

    #[test]
    fn genre_change_normalizes_and_broadcasts_once() {
        let mut state = GameState::new();

        let first = state.apply(GameEvent::GenreChange {
            genre: "Rock".into(),
        });
        let second = state.apply(GameEvent::GenreChange {
            genre: " rock ".into(),
        });

        assert_eq!(state.selected_genre(), Some("rock"));
        for transition in [first, second] {
            assert_eq!(
                transition.broadcast,
                Some(ServerMessage::GenreChange {
                    genre_name: "rock".into()
                })
            );
            assert!(transition.intent.is_none());
        }
    }

    #[test]
    fn new_game_sets_genre_clears_guesser_and_starts_playback() {
        let mut state = GameState::new();
        guess(&mut state, "Alice");

        let transition = state.apply(GameEvent::NewGame {
            genre: " Hip  Hop ".into(),
        });

        assert_eq!(state.selected_genre(), Some("hip hop"));
        assert_eq!(state.current_guesser(), None);
        assert!(transition.broadcast.is_none());
        assert_eq!(
            transition.intent,
            Some(PlaybackIntent::StartGenre {
                genre: "hip hop".into()
            })
        );
    }

    #[test]
    fn show_answer_broadcasts_track_fields_even_when_empty() {
        let mut state = GameState::new();
        let transition = state.apply(GameEvent::ShowAnswer {
            track: TrackInfo::default(),
        });

        assert_eq!(
            transition.broadcast,
            Some(ServerMessage::Answer {
                song_title: String::new(),
                artists_text: String::new(),
                album_image_url: String::new(),
            })
        );
        assert_eq!(transition.intent, Some(PlaybackIntent::RevealAndResume));
    }

    #[test]
    fn next_round_carries_the_selected_genre_into_the_intent() {
        let mut state = GameState::new();
        state.apply(GameEvent::GenreChange {
            genre: "Rock".into(),
        });

        let transition = state.apply(GameEvent::NextRound);
        assert_eq!(
            transition.intent,
            Some(PlaybackIntent::AdvanceTrack {
                genre: Some("rock".into())
            })
        );
        assert_eq!(transition.broadcast, Some(ServerMessage::NextRound));
    }

    #[test]
    fn genre_persists_across_round_boundaries() {
        let mut state = GameState::new();
        state.apply(GameEvent::GenreChange {
            genre: "Rock".into(),
        });
        state.apply(GameEvent::NextRound);
        state.apply(GameEvent::GuessAgain);
        assert_eq!(state.selected_genre(), Some("rock"));
    }
}
