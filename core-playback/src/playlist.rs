//! # Playlist Navigation
//!
//! Ordering, shuffle and repeat state for the active playlist.
//!
//! ## Overview
//!
//! The base ordering is the insertion order of the tracks. Enabling shuffle
//! builds a permutation whose first entry is the current track, so the song
//! that is playing stays put and everything after it is random. Disabling
//! shuffle drops the permutation and continues from the current track in the
//! base ordering.
//!
//! Navigation is deliberately asymmetric: `next()` past the end of the active
//! sequence wraps to its first position, `previous()` at the first position
//! returns `None`.
//!
//! ```
//! use core_playback::playlist::PlaylistController;
//! use core_playback::Track;
//!
//! let tracks = vec![Track::new("a", "A"), Track::new("b", "B")];
//! let mut playlist = PlaylistController::with_seed(7);
//! playlist.select_playlist(tracks, 1).unwrap();
//!
//! assert_eq!(playlist.next(), Some(0)); // wraps
//! assert_eq!(playlist.previous(), None); // no wrap backwards
//! ```

use crate::error::{PlaybackError, Result};
use crate::track::Track;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;

/// Snapshot of the playlist ordering.
///
/// Invariants: `current_index` is `None` exactly when `tracks` is empty;
/// `shuffle_order`, when present, is a permutation of `0..tracks.len()`
/// and `shuffle_order[shuffle_index] == current_index`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistState {
    tracks: Vec<Track>,
    current_index: Option<usize>,
    shuffle_order: Option<Vec<usize>>,
    shuffle_index: usize,
    repeat_enabled: bool,
}

impl PlaylistState {
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.tracks.get(i))
    }

    pub fn shuffle_order(&self) -> Option<&[usize]> {
        self.shuffle_order.as_deref()
    }

    pub fn shuffle_index(&self) -> usize {
        self.shuffle_index
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle_order.is_some()
    }

    pub fn is_repeat_enabled(&self) -> bool {
        self.repeat_enabled
    }

    /// Position of the current track within the active sequence.
    fn position(&self) -> Option<usize> {
        match &self.shuffle_order {
            Some(_) => self.current_index.map(|_| self.shuffle_index),
            None => self.current_index,
        }
    }

    /// Track index at `position` of the active sequence.
    fn index_at(&self, position: usize) -> usize {
        match &self.shuffle_order {
            Some(order) => order[position],
            None => position,
        }
    }

    fn move_to(&mut self, position: usize) -> usize {
        let index = self.index_at(position);
        if self.shuffle_order.is_some() {
            self.shuffle_index = position;
        }
        self.current_index = Some(index);
        index
    }
}

/// Outcome of [`PlaylistController::replace_tracks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The current track is still in the playlist, possibly at a new index.
    CurrentKept(usize),
    /// The current track was removed; another track is now current.
    CurrentReplaced(usize),
    /// The playlist is now empty.
    Emptied,
}

/// Owns the [`PlaylistState`] and the RNG used for shuffling.
pub struct PlaylistController {
    state: PlaylistState,
    rng: StdRng,
}

impl fmt::Debug for PlaylistController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaylistController")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Default for PlaylistController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistController {
    pub fn new() -> Self {
        Self {
            state: PlaylistState::default(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic shuffle order, for tests and reproducible sessions.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: PlaylistState::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &PlaylistState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Fails with [`PlaybackError::EmptyPlaylist`] when there is nothing to
    /// navigate. Callers treat the error as a no-op.
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(PlaybackError::EmptyPlaylist);
        }
        Ok(())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.current_index
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.state.current_track()
    }

    pub fn is_shuffled(&self) -> bool {
        self.state.is_shuffled()
    }

    pub fn is_repeat_enabled(&self) -> bool {
        self.state.repeat_enabled
    }

    /// Replaces the playlist and starts at `start_index`.
    ///
    /// Shuffle and repeat are reset. An empty `tracks` yields an empty
    /// playlist; a `start_index` outside a non-empty playlist fails with
    /// [`PlaybackError::InvalidIndex`] and leaves the state untouched.
    pub fn select_playlist(&mut self, tracks: Vec<Track>, start_index: usize) -> Result<()> {
        if !tracks.is_empty() && start_index >= tracks.len() {
            return Err(PlaybackError::InvalidIndex {
                index: start_index,
                len: tracks.len(),
            });
        }

        let current_index = (!tracks.is_empty()).then_some(start_index);
        self.state = PlaylistState {
            tracks,
            current_index,
            shuffle_order: None,
            shuffle_index: 0,
            repeat_enabled: false,
        };
        Ok(())
    }

    /// Flips shuffle and returns the new setting. No-op on an empty playlist.
    pub fn toggle_shuffle(&mut self) -> bool {
        let Some(current) = self.state.current_index else {
            return false;
        };

        if self.state.shuffle_order.take().is_none() {
            self.state.shuffle_order = Some(self.build_shuffle_order(current));
        }
        self.state.shuffle_index = 0;
        self.state.is_shuffled()
    }

    /// Flips repeat and returns the new setting. No-op on an empty playlist.
    pub fn toggle_repeat(&mut self) -> bool {
        if !self.state.is_empty() {
            self.state.repeat_enabled = !self.state.repeat_enabled;
        }
        self.state.repeat_enabled
    }

    /// Moves to the next track, wrapping to the start of the active sequence.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<usize> {
        self.advance(true)
    }

    /// Moves to the next track. Past the end of the active sequence this
    /// wraps when `wrap` is set and returns `None` otherwise.
    pub fn advance(&mut self, wrap: bool) -> Option<usize> {
        let position = self.state.position()?;
        let len = self.state.len();

        let target = if position + 1 < len {
            position + 1
        } else if wrap {
            0
        } else {
            return None;
        };
        Some(self.state.move_to(target))
    }

    /// Moves to the previous track. Returns `None` at the first position of
    /// the active sequence.
    pub fn previous(&mut self) -> Option<usize> {
        let position = self.state.position()?;
        if position == 0 {
            return None;
        }
        Some(self.state.move_to(position - 1))
    }

    /// Swaps in an edited version of the active playlist without restarting
    /// navigation.
    ///
    /// The current track is found again by id. If it was removed, the old
    /// index is clamped into the new playlist. A shuffled playlist gets a new
    /// order built around the current track. Repeat is preserved.
    pub fn replace_tracks(&mut self, tracks: Vec<Track>) -> ReplaceOutcome {
        if tracks.is_empty() {
            let repeat_enabled = self.state.repeat_enabled;
            self.state = PlaylistState {
                repeat_enabled,
                ..PlaylistState::default()
            };
            return ReplaceOutcome::Emptied;
        }

        let previous_id = self.state.current_track().map(|t| t.id.clone());
        let previous_index = self.state.current_index.unwrap_or(0);
        let was_shuffled = self.state.is_shuffled();

        let kept = previous_id
            .as_deref()
            .and_then(|id| tracks.iter().position(|t| t.id == id));
        let index = kept.unwrap_or_else(|| previous_index.min(tracks.len() - 1));

        self.state.tracks = tracks;
        self.state.current_index = Some(index);
        self.state.shuffle_index = 0;
        self.state.shuffle_order = was_shuffled.then(|| self.build_shuffle_order(index));

        match kept {
            Some(index) => ReplaceOutcome::CurrentKept(index),
            None => ReplaceOutcome::CurrentReplaced(index),
        }
    }

    /// Drops every track and resets shuffle and repeat.
    pub fn clear(&mut self) {
        self.state = PlaylistState::default();
    }

    fn build_shuffle_order(&mut self, current: usize) -> Vec<usize> {
        let mut rest: Vec<usize> = (0..self.state.len()).filter(|&i| i != current).collect();
        rest.shuffle(&mut self.rng);

        let mut order = Vec::with_capacity(rest.len() + 1);
        order.push(current);
        order.extend(rest);
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("t{i}"), format!("Track {i}")))
            .collect()
    }

    fn assert_permutation(order: &[usize], len: usize) {
        let mut sorted = order.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..len).collect::<Vec<_>>());
    }

    #[test]
    fn select_playlist_resets_flags() {
        let mut playlist = PlaylistController::with_seed(1);
        playlist.select_playlist(tracks(4), 2).unwrap();
        playlist.toggle_shuffle();
        playlist.toggle_repeat();

        playlist.select_playlist(tracks(3), 1).unwrap();
        assert_eq!(playlist.current_index(), Some(1));
        assert!(!playlist.is_shuffled());
        assert!(!playlist.is_repeat_enabled());
    }

    #[test]
    fn select_playlist_rejects_out_of_range_start() {
        let mut playlist = PlaylistController::with_seed(1);
        playlist.select_playlist(tracks(2), 0).unwrap();

        let err = playlist.select_playlist(tracks(3), 3).unwrap_err();
        assert!(matches!(err, PlaybackError::InvalidIndex { index: 3, len: 3 }));
        assert_eq!(playlist.len(), 2, "state untouched on failure");
    }

    #[test]
    fn empty_playlist_is_inert() {
        let mut playlist = PlaylistController::with_seed(1);
        playlist.select_playlist(Vec::new(), 5).unwrap();

        assert_eq!(playlist.current_index(), None);
        assert_eq!(playlist.next(), None);
        assert_eq!(playlist.previous(), None);
        assert!(!playlist.toggle_shuffle());
        assert!(!playlist.toggle_repeat());
    }

    #[test]
    fn shuffle_starts_with_current_track() {
        for len in 2..12 {
            for start in 0..len {
                let mut playlist = PlaylistController::with_seed(len as u64 * 31 + start as u64);
                playlist.select_playlist(tracks(len), start).unwrap();
                assert!(playlist.toggle_shuffle());

                let order = playlist.state().shuffle_order().unwrap();
                assert_eq!(order[0], start);
                assert_permutation(order, len);
                assert_eq!(playlist.state().shuffle_index(), 0);
                assert_eq!(playlist.current_index(), Some(start));
            }
        }
    }

    #[test]
    fn disabling_shuffle_keeps_current_index() {
        let mut playlist = PlaylistController::with_seed(9);
        playlist.select_playlist(tracks(6), 0).unwrap();
        playlist.toggle_shuffle();
        let after_two = {
            playlist.next();
            playlist.next().unwrap()
        };

        assert!(!playlist.toggle_shuffle());
        assert_eq!(playlist.current_index(), Some(after_two));
        assert!(playlist.state().shuffle_order().is_none());

        // Continues in base order from there.
        let expected = (after_two + 1) % 6;
        assert_eq!(playlist.next(), Some(expected));
    }

    #[test]
    fn linear_next_wraps_previous_does_not() {
        let mut playlist = PlaylistController::with_seed(1);
        playlist.select_playlist(tracks(3), 0).unwrap();

        assert_eq!(playlist.previous(), None);
        assert_eq!(playlist.current_index(), Some(0));
        assert_eq!(playlist.next(), Some(1));
        assert_eq!(playlist.next(), Some(2));
        assert_eq!(playlist.next(), Some(0));
        assert_eq!(playlist.previous(), None);
    }

    #[test]
    fn shuffled_next_wraps_previous_does_not() {
        let mut playlist = PlaylistController::with_seed(42);
        playlist.select_playlist(tracks(4), 2).unwrap();
        playlist.toggle_shuffle();
        let order = playlist.state().shuffle_order().unwrap().to_vec();

        assert_eq!(playlist.previous(), None);
        for expected in order.iter().skip(1) {
            assert_eq!(playlist.next(), Some(*expected));
        }
        assert_eq!(playlist.next(), Some(order[0]));
        assert_eq!(playlist.state().shuffle_index(), 0);
        assert_eq!(playlist.previous(), None);
    }

    #[test]
    fn advance_without_wrap_stops_at_end() {
        let mut playlist = PlaylistController::with_seed(1);
        playlist.select_playlist(tracks(2), 1).unwrap();

        assert_eq!(playlist.advance(false), None);
        assert_eq!(playlist.current_index(), Some(1));
    }

    #[test]
    fn single_track_next_returns_same_track() {
        let mut playlist = PlaylistController::with_seed(1);
        playlist.select_playlist(tracks(1), 0).unwrap();
        assert_eq!(playlist.next(), Some(0));
        assert_eq!(playlist.previous(), None);
    }

    #[test]
    fn replace_tracks_follows_current_by_id() {
        let mut playlist = PlaylistController::with_seed(1);
        playlist.select_playlist(tracks(3), 1).unwrap();

        let mut edited = tracks(3);
        edited.insert(0, Track::new("new", "New"));
        assert_eq!(playlist.replace_tracks(edited), ReplaceOutcome::CurrentKept(2));
        assert_eq!(playlist.current_track().unwrap().id, "t1");
    }

    #[test]
    fn replace_tracks_clamps_when_current_removed() {
        let mut playlist = PlaylistController::with_seed(1);
        playlist.select_playlist(tracks(3), 2).unwrap();
        playlist.toggle_repeat();

        // "t2" is gone, so index 2 clamps to the new last index.
        let outcome = playlist.replace_tracks(tracks(2));
        assert_eq!(outcome, ReplaceOutcome::CurrentReplaced(1));
        assert_eq!(playlist.current_track().unwrap().id, "t1");
        assert!(playlist.is_repeat_enabled());
    }

    #[test]
    fn replace_tracks_rebuilds_shuffle_around_current() {
        let mut playlist = PlaylistController::with_seed(3);
        playlist.select_playlist(tracks(5), 3).unwrap();
        playlist.toggle_shuffle();

        playlist.replace_tracks(tracks(8));
        let order = playlist.state().shuffle_order().unwrap();
        assert_eq!(order[0], 3);
        assert_permutation(order, 8);
    }

    #[test]
    fn replace_with_empty_list_empties() {
        let mut playlist = PlaylistController::with_seed(3);
        playlist.select_playlist(tracks(2), 0).unwrap();
        assert_eq!(playlist.replace_tracks(Vec::new()), ReplaceOutcome::Emptied);
        assert!(playlist.is_empty());
        assert_eq!(playlist.current_index(), None);
    }

    #[test]
    fn ensure_not_empty_reports_empty_playlist() {
        let mut playlist = PlaylistController::with_seed(3);
        assert!(matches!(
            playlist.ensure_not_empty(),
            Err(PlaybackError::EmptyPlaylist)
        ));

        playlist.select_playlist(tracks(1), 0).unwrap();
        assert!(playlist.ensure_not_empty().is_ok());
    }
}
